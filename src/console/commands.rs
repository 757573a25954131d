//! Command handlers

use core::fmt::Write;

use super::console::VERSION;
use super::parser::{split_args, ParsedCommand};
use super::ConsoleError;
use crate::config::{ConfigPersist, DeviceConfig};
use crate::logging::LogLevel;
use crate::tally::{resolve, DisplayState, Override, OverrideCell};
use crate::transport::LinkStatus;
use crate::LOG_STREAM;

/// Work the main tick performs after the console returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    Reboot,
}

/// Everything a command may read or mutate.
pub struct CommandContext<'a> {
    /// In-memory configuration; persisted only by `save`
    pub config: &'a mut DeviceConfig,
    pub store: &'a mut dyn ConfigPersist,
    pub override_cell: &'a OverrideCell,
    pub authoritative: DisplayState,
    pub link: LinkStatus,
    /// Set by `reboot` / `factory-reset`
    pub action: Option<SystemAction>,
}

type Handler = fn(&ParsedCommand<'_>, &mut CommandContext<'_>, &mut dyn Write) -> Result<(), ConsoleError>;

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub brief: &'static str,
    pub handler: Handler,
}

/// All available commands
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { name: "help", alias: Some("?"), brief: "Show this help", handler: cmd_help },
    CommandDescriptor { name: "status", alias: Some("show"), brief: "Show status and configuration", handler: cmd_status },
    CommandDescriptor { name: "set", alias: None, brief: "Change a setting (in memory)", handler: cmd_set },
    CommandDescriptor { name: "save", alias: None, brief: "Persist settings", handler: cmd_save },
    CommandDescriptor { name: "reboot", alias: None, brief: "Restart the device", handler: cmd_reboot },
    CommandDescriptor { name: "force", alias: None, brief: "Manual override", handler: cmd_force },
    CommandDescriptor { name: "debug", alias: None, brief: "Set log level", handler: cmd_debug },
    CommandDescriptor { name: "factory-reset", alias: None, brief: "Restore defaults and reboot", handler: cmd_factory_reset },
];

/// Usage lines printed by `help`.
const USAGE: &[(&str, &str)] = &[
    ("help | ?", "Shows this help message."),
    ("status | show", "Shows current status and configuration."),
    ("set ssid <ssid>", "Set WiFi SSID."),
    ("set pass <pass>", "Set WiFi password."),
    ("set broker <ip>", "Set MQTT broker address."),
    ("set id <1-10>", "Set camera ID."),
    ("set rotation <0-3>", "Set screen rotation."),
    ("set ip mode <dhcp|static>", "Select addressing mode."),
    ("set static ip <ip> <subnet> <gw>", "Set static addressing."),
    ("save", "Save changes to flash."),
    ("reboot", "Reboot the device."),
    ("force pgm", "Manual override to Program (red)."),
    ("force pvw", "Manual override to Preview (green)."),
    ("force clear | auto", "Clear manual override."),
    ("debug <error|warn|info|debug|trace>", "Set log level."),
    ("factory-reset confirm", "Restore defaults and reboot."),
];

/// Look up a command by name or alias
pub fn find(name: &str) -> Option<&'static CommandDescriptor> {
    COMMANDS
        .iter()
        .find(|c| c.name == name || c.alias == Some(name))
}

/// Execute a parsed command. An empty line runs `help`.
pub fn execute(
    cmd: &ParsedCommand<'_>,
    ctx: &mut CommandContext<'_>,
    out: &mut dyn Write,
) -> Result<(), ConsoleError> {
    if cmd.command.is_empty() {
        return cmd_help(cmd, ctx, out);
    }

    let descriptor = find(cmd.command).ok_or(ConsoleError::UnknownCommand)?;
    (descriptor.handler)(cmd, ctx, out)
}

// --- Command Implementations ---

fn cmd_help(_cmd: &ParsedCommand<'_>, _ctx: &mut CommandContext<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let _ = writeln!(out, "--- {} ---", VERSION);
    let _ = writeln!(out, "Commands:");
    for (usage, brief) in USAGE {
        let _ = writeln!(out, "  {:<36} {}", usage, brief);
    }
    Ok(())
}

fn cmd_status(_cmd: &ParsedCommand<'_>, ctx: &mut CommandContext<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let cfg = &*ctx.config;
    let ovr = ctx.override_cell.get();

    let _ = writeln!(out, "--- Tally Status ---");
    let _ = writeln!(out, "Firmware Version: {}", VERSION);
    let _ = writeln!(out, "Camera ID: {}", cfg.device_id);
    let _ = writeln!(out, "Screen Rotation: {}", cfg.rotation);
    let _ = writeln!(out, "Tally: {}", ctx.authoritative);
    let _ = writeln!(out, "Override: {}", ovr);
    let _ = writeln!(out, "Showing: {}", resolve(ovr, ctx.authoritative));
    let _ = writeln!(out, "--- WiFi ---");
    let _ = writeln!(out, "SSID: {}", cfg.ssid);
    let _ = writeln!(out, "IP Mode: {}", if cfg.dhcp { "DHCP" } else { "Static" });
    if !cfg.dhcp {
        let _ = writeln!(out, "  IP: {}", cfg.static_ip);
        let _ = writeln!(out, "  Subnet: {}", cfg.subnet);
        let _ = writeln!(out, "  Gateway: {}", cfg.gateway);
    }
    match ctx.link.ip {
        Some(ip) => {
            let _ = writeln!(out, "Current IP: {}", ip);
        }
        None => {
            let _ = writeln!(out, "Current IP: (none)");
        }
    }
    let _ = writeln!(out, "--- MQTT ---");
    let _ = writeln!(out, "Broker: {}", cfg.broker);
    let _ = writeln!(
        out,
        "Connection: {}",
        if ctx.link.broker_connected { "Connected" } else { "Disconnected" }
    );
    Ok(())
}

fn cmd_set(cmd: &ParsedCommand<'_>, ctx: &mut CommandContext<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let key = cmd.arg(0).ok_or(ConsoleError::MissingArg)?;

    match key {
        "ssid" => {
            let value = cmd.tail(1).ok_or(ConsoleError::MissingArg)?;
            ctx.config.set_ssid(value)?;
            let _ = writeln!(out, "OK. SSID set to: {}", ctx.config.ssid);
        }
        "pass" => {
            let value = cmd.tail(1).ok_or(ConsoleError::MissingArg)?;
            ctx.config.set_password(value)?;
            let _ = writeln!(out, "OK. Password set.");
        }
        "broker" => {
            let value = cmd.tail(1).ok_or(ConsoleError::MissingArg)?;
            ctx.config.set_broker(value)?;
            let _ = writeln!(out, "OK. Broker set to: {}", ctx.config.broker);
        }
        "id" => {
            let id = parse_int(cmd.arg(1))?;
            ctx.config.set_device_id(id)?;
            let _ = writeln!(out, "OK. Camera ID set to: {}", ctx.config.device_id);
        }
        "rotation" => {
            let rotation = parse_int(cmd.arg(1))?;
            ctx.config.set_rotation(rotation)?;
            let _ = writeln!(out, "OK. Rotation set to: {}", ctx.config.rotation);
        }
        "ip" => {
            if cmd.arg(1) != Some("mode") {
                return Err(ConsoleError::UnknownCommand);
            }
            match cmd.arg(2).ok_or(ConsoleError::MissingArg)? {
                "dhcp" => {
                    ctx.config.dhcp = true;
                    let _ = writeln!(out, "OK. IP mode set to DHCP.");
                }
                "static" => {
                    ctx.config.dhcp = false;
                    let _ = writeln!(out, "OK. IP mode set to Static.");
                }
                _ => return Err(ConsoleError::InvalidValue),
            }
        }
        "static" => {
            if cmd.arg(1) != Some("ip") {
                return Err(ConsoleError::UnknownCommand);
            }
            let ip = cmd.arg(2).ok_or(ConsoleError::MissingArg)?;
            // arg 3 holds "<subnet> <gateway...>"; the gateway takes the rest
            let [subnet, gateway] = split_args::<2>(cmd.arg(3).unwrap_or(""));
            let subnet = subnet.ok_or(ConsoleError::MissingArg)?;
            let gateway = gateway.ok_or(ConsoleError::MissingArg)?;

            ctx.config.set_static(ip, subnet, gateway)?;
            let _ = writeln!(out, "OK. Static IP config set.");
            let _ = writeln!(out, "  IP: {}", ctx.config.static_ip);
            let _ = writeln!(out, "  Subnet: {}", ctx.config.subnet);
            let _ = writeln!(out, "  Gateway: {}", ctx.config.gateway);
        }
        _ => return Err(ConsoleError::UnknownCommand),
    }

    Ok(())
}

fn parse_int(arg: Option<&str>) -> Result<i32, ConsoleError> {
    arg.ok_or(ConsoleError::MissingArg)?
        .parse()
        .map_err(|_| ConsoleError::InvalidValue)
}

fn cmd_save(_cmd: &ParsedCommand<'_>, ctx: &mut CommandContext<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let _ = writeln!(out, "Saving configuration...");
    ctx.store.save(ctx.config)?;
    let _ = writeln!(out, "Done.");
    Ok(())
}

fn cmd_reboot(_cmd: &ParsedCommand<'_>, ctx: &mut CommandContext<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let _ = writeln!(out, "Rebooting...");
    ctx.action = Some(SystemAction::Reboot);
    Ok(())
}

fn cmd_force(cmd: &ParsedCommand<'_>, ctx: &mut CommandContext<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    match cmd.arg(0).ok_or(ConsoleError::MissingArg)? {
        "pgm" => {
            ctx.override_cell.set(Override::Active(DisplayState::Program));
            let _ = writeln!(out, "OK. Forcing PGM state.");
        }
        "pvw" => {
            ctx.override_cell.set(Override::Active(DisplayState::Preview));
            let _ = writeln!(out, "OK. Forcing PVW state.");
        }
        "clear" | "auto" => {
            ctx.override_cell.set(Override::Inactive);
            let _ = writeln!(out, "OK. Manual override cleared.");
        }
        _ => return Err(ConsoleError::InvalidValue),
    }
    Ok(())
}

fn cmd_debug(cmd: &ParsedCommand<'_>, _ctx: &mut CommandContext<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    match cmd.arg(0) {
        None => {
            let _ = writeln!(out, "log level: {}", LOG_STREAM.max_level().as_str());
        }
        Some(name) => {
            let level = LogLevel::from_name(name).ok_or(ConsoleError::InvalidValue)?;
            LOG_STREAM.set_max_level(level);
            let _ = writeln!(out, "OK. Log level set to {}.", level.as_str());
        }
    }
    Ok(())
}

fn cmd_factory_reset(cmd: &ParsedCommand<'_>, ctx: &mut CommandContext<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if cmd.arg(0) != Some("confirm") {
        return Err(ConsoleError::RequiresConfirm);
    }

    *ctx.config = ctx.store.reset()?;
    let _ = writeln!(out, "Defaults restored. Rebooting...");
    ctx.action = Some(SystemAction::Reboot);
    Ok(())
}
