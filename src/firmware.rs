//! Device bring-up and the two boot modes.

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::reset;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;

use rust_tally_light::config::ConfigStore;
use rust_tally_light::console::SystemAction;
use rust_tally_light::display::{IndicatorPanel, Rgb};
use rust_tally_light::setup_mode::{GestureDetector, SetupSession, SetupStep, COMMIT_FLASH_MS};
use rust_tally_light::{tally_error, tally_info, TallyNode, LOG_STREAM};

use crate::hal::{self, Button, ConsolePort, GpioLeds, MqttTransport, NvsStorage, RtosDelay, Ws2812Matrix};

/// Main loop period.
const TICK_MS: u32 = 10;

pub fn run() -> Result<(), EspError> {
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let pins = peripherals.pins;

    let mut console = ConsolePort::new(peripherals.uart0, pins.gpio1, pins.gpio3)?;
    let button = Button::new(pins.gpio39)?;
    let matrix = Ws2812Matrix::new(peripherals.rmt.channel0, pins.gpio27)?;
    let leds = GpioLeds::new(pins.gpio21, pins.gpio22, pins.gpio23)?;
    let storage = NvsStorage::new(nvs.clone())?;

    if button.is_pressed() {
        let mut store = ConfigStore::new(storage);
        let config = store.load();
        let mut panel = IndicatorPanel::new(matrix, leds, config.rotation);

        // Entered with the button down; wait so the boot hold is not a long press
        while button.is_pressed() {
            FreeRtos::delay_ms(TICK_MS);
        }

        tally_info!("setup mode");
        let mut session = SetupSession::new(config);
        let mut detector = GestureDetector::new();
        panel.set_rotation(session.rotation());
        panel.show_number(session.device_id());

        loop {
            if let Some(gesture) = detector.tick(hal::now_ms(), button.is_pressed()) {
                match session.handle(gesture) {
                    SetupStep::Redraw => {
                        panel.set_rotation(session.rotation());
                        panel.show_number(session.device_id());
                    }
                    SetupStep::Commit => {
                        if let Err(e) = session.commit(&mut store) {
                            tally_error!("setup: save failed: {}", e);
                        }
                        panel.fill(Rgb::GREEN);
                        LOG_STREAM.drain_to(&mut console);
                        FreeRtos::delay_ms(COMMIT_FLASH_MS);
                        reset::restart();
                    }
                }
            }
            LOG_STREAM.drain_to(&mut console);
            FreeRtos::delay_ms(TICK_MS);
        }
    }

    let mut node = TallyNode::boot(storage);
    let mut panel = IndicatorPanel::new(matrix, leds, node.config().rotation);
    node.print_banner(&mut console);
    LOG_STREAM.drain_to(&mut console);

    let config = node.config().clone();
    let (_wifi, ip) = hal::wifi::connect(peripherals.modem, sysloop, nvs, &config, &mut panel)?;
    node.set_ip(ip);
    LOG_STREAM.drain_to(&mut console);

    let mut transport = MqttTransport::new(&config.broker)?;
    let mut delay = RtosDelay;
    let mut input = [0u8; 64];

    loop {
        let n = console.read_available(&mut input);
        if let Some(SystemAction::Reboot) = node.tick(&input[..n], &mut transport, &mut delay, &mut panel, &mut console) {
            FreeRtos::delay_ms(100);
            reset::restart();
        }
        FreeRtos::delay_ms(TICK_MS);
    }
}
