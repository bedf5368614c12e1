//! aoa-switch
//!
//! Switches a USB-attached mobile device into accessory mode using the AOA
//! vendor control-transfer protocol, then re-scans the bus to verify the
//! switch. Runs to completion and exits; a single thread drives the whole
//! negotiation.

mod config;
mod logging;
mod usb;
mod verify;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{Context as _, Result};
use aoa::NegotiationOutcome;
use clap::Parser;
use rusb::Context;
use tracing::{info, warn};

use crate::config::SwitchConfig;
use crate::logging::setup_logging;
use crate::usb::{BusSnapshot, negotiate_device};
use crate::verify::{AccessoryReport, VerifyOutcome, wait_for_accessory};

#[derive(Parser, Debug)]
#[command(name = "aoa-switch")]
#[command(
    author,
    version,
    about = "Switch an attached mobile device into USB accessory mode"
)]
#[command(long_about = "
Drives the AOA vendor control-transfer handshake against an allow-listed
device: queries protocol support, sends the identification strings,
optionally enables the audio sub-mode, issues the mode switch, then
re-scans the bus for the re-enumerated accessory device.

EXAMPLES:
    # Run with default config
    aoa-switch

    # Run with custom config
    aoa-switch --config /path/to/switch.toml

    # List attached USB devices without negotiating
    aoa-switch --list-devices

    # Run with debug logging
    aoa-switch --log-level debug

CONFIGURATION:
    The switcher looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/aoa-switch/switch.toml
    3. /etc/aoa-switch/switch.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = SwitchConfig::default();
        let path = SwitchConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    // Load configuration first (to get log level from config if not specified)
    let config = if let Some(ref path) = args.config {
        let path = PathBuf::from(shellexpand::tilde(path).as_ref());
        SwitchConfig::load(Some(path)).context("Failed to load configuration")?
    } else {
        SwitchConfig::load_or_default()
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.switch.log_level);

    setup_logging(log_level).context("Failed to setup logging")?;

    info!("aoa-switch v{}", env!("CARGO_PKG_VERSION"));

    let context = Context::new().context("Failed to initialize USB context")?;

    if args.list_devices {
        return list_devices_mode(&context);
    }

    run_switch(&context, &config)
}

/// List USB devices and exit
fn list_devices_mode(context: &Context) -> Result<()> {
    let snapshot = BusSnapshot::take(context).context("Failed to enumerate USB devices")?;

    println!("Found {} USB device(s):\n", snapshot.devices().len());
    for device in snapshot.devices() {
        println!(
            "  {:04x}:{:04x}  bus {:03} device {:03}  class {:#04x}",
            device.vendor_id(),
            device.product_id(),
            device.bus_number(),
            device.address(),
            device.class_code()
        );
    }

    Ok(())
}

/// Negotiate with the first allow-listed device, then verify the switch
fn run_switch(context: &Context, config: &SwitchConfig) -> Result<()> {
    let allow_list = config.usb.allow_list().context("Invalid allow-list")?;
    let strings = config.identity.strings();
    let options = config.handshake.options();

    let snapshot = BusSnapshot::take(context).context("Failed to enumerate USB devices")?;

    match snapshot.find_allowed(&allow_list) {
        Some(candidate) => {
            info!(
                "Found candidate device {:04x}:{:04x}",
                candidate.vendor_id(),
                candidate.product_id()
            );

            match negotiate_device(candidate, &strings, &options) {
                NegotiationOutcome::SwitchIssued { version } => {
                    info!("Switch request issued (protocol version {})", version.0);
                }
                NegotiationOutcome::NotAccessoryCapable => {
                    warn!("Device does not implement the accessory handshake");
                }
                NegotiationOutcome::OpenFailed { error } => {
                    warn!("Could not open candidate device: {}", error);
                }
                NegotiationOutcome::TransferFailed { stage, error } => {
                    // A partially-completed handshake may still have
                    // triggered the switch; verification below decides.
                    warn!("Handshake transfer failed at {:?}: {}", stage, error);
                }
            }
        }
        None => {
            // A device already in accessory mode will not match the allow
            // list; the verification scan below still finds it.
            warn!("No allow-listed device attached");
        }
    }

    // Descriptors in this snapshot are stale once the device re-enumerates
    drop(snapshot);

    let cancel = AtomicBool::new(false);
    match wait_for_accessory(context, &config.verify, &cancel)
        .context("Post-switch enumeration failed")?
    {
        VerifyOutcome::Confirmed(report) => print_report(&report),
        VerifyOutcome::NotDetected => {
            warn!(
                "No device with the accessory identity was found; the switch may have \
                 failed or the device re-enumerated outside the window"
            );
        }
    }

    Ok(())
}

/// Print the post-switch descriptor report
fn print_report(report: &AccessoryReport) {
    println!(
        "\nAccessory device {:04x}:{:04x}",
        report.vendor_id, report.product_id
    );
    if let Some(mode) = report.mode {
        println!("  Mode: {}", mode);
    }
    println!(
        "  Class: {:#04x}  Subclass: {:#04x}  Protocol: {:#04x}",
        report.class, report.subclass, report.protocol
    );
    println!(
        "  Max packet size (ep0): {}  Configurations: {}",
        report.max_packet_size_0, report.num_configurations
    );

    for config in &report.configurations {
        println!("  Configuration {}:", config.number);
        for interface in &config.interfaces {
            println!(
                "    Interface {} alt {}: {} endpoint(s), class {:#04x}/{:#04x}/{:#04x}",
                interface.number,
                interface.alt_setting,
                interface.num_endpoints,
                interface.class,
                interface.subclass,
                interface.protocol
            );
        }
    }
}
