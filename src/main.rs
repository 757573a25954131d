//! RustTallyLight - Main entry point
//!
//! On the device: bring up the hardware, then either the button setup mode
//! (button held at power-on) or the run-mode tick loop.
//! Anywhere else: the same run-mode tick on stdin/stdout.

#[cfg(target_os = "espidf")]
mod firmware;
#[cfg(target_os = "espidf")]
mod hal;
#[cfg(not(target_os = "espidf"))]
mod host;

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();

    if let Err(e) = firmware::run() {
        rust_tally_light::tally_error!("fatal: {}", e);
        let mut out = String::new();
        rust_tally_light::LOG_STREAM.drain_to(&mut out);
        print!("{}", out);
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(1_000);
        esp_idf_svc::hal::reset::restart();
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    host::run();
}
