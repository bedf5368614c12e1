//! Post-switch verification
//!
//! After the switch request the device drops off the bus and re-enumerates
//! under the accessory identity within a device-dependent window. Instead of
//! a single fixed settle delay, enumeration is polled on an interval bounded
//! by a timeout, and callers can abort the wait through the cancellation
//! flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use aoa::AccessoryMode;
use rusb::Context;
use tracing::{debug, warn};

use crate::config::VerifySettings;
use crate::usb::{AttachedDevice, BusError, BusSnapshot};

/// Descriptor report for the re-enumerated accessory device
#[derive(Debug, Clone)]
pub struct AccessoryReport {
    pub vendor_id: u16,
    pub product_id: u16,
    pub mode: Option<AccessoryMode>,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub max_packet_size_0: u8,
    pub num_configurations: u8,
    pub configurations: Vec<ConfigSummary>,
}

#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub number: u8,
    pub interfaces: Vec<InterfaceSummary>,
}

#[derive(Debug, Clone)]
pub struct InterfaceSummary {
    pub number: u8,
    pub alt_setting: u8,
    pub num_endpoints: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
}

/// Result of the post-switch scan
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// A device with the accessory identity appeared
    Confirmed(AccessoryReport),
    /// The window closed without one; the switch may have failed, or the
    /// device re-enumerated outside the window
    NotDetected,
}

/// Poll the bus until an accessory-identity device appears
///
/// Each attempt takes a fresh snapshot; the previous one is dropped before
/// re-enumerating. An empty bus mid-poll is expected while the device is
/// between identities and just means "poll again".
pub fn wait_for_accessory(
    context: &Context,
    settings: &VerifySettings,
    cancel: &AtomicBool,
) -> Result<VerifyOutcome, BusError> {
    let interval = Duration::from_millis(settings.poll_interval_ms);
    let deadline = Instant::now() + Duration::from_millis(settings.timeout_ms);

    while Instant::now() < deadline {
        if cancel.load(Ordering::Relaxed) {
            debug!("Post-switch wait cancelled");
            return Ok(VerifyOutcome::NotDetected);
        }

        thread::sleep(interval);

        let snapshot = match BusSnapshot::take(context) {
            Ok(snapshot) => snapshot,
            Err(BusError::NoDevicesAttached) => {
                debug!("Bus empty while waiting for re-enumeration");
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some(device) = snapshot.find_accessory() {
            debug!(
                "Found accessory device {:04x}:{:04x}",
                device.vendor_id(),
                device.product_id()
            );
            return Ok(VerifyOutcome::Confirmed(report_device(device)));
        }
    }

    warn!(
        "No accessory-mode device appeared within {} ms",
        settings.timeout_ms
    );
    Ok(VerifyOutcome::NotDetected)
}

/// Read the descriptor report for a found accessory device
fn report_device(device: &AttachedDevice) -> AccessoryReport {
    let mut configurations = Vec::new();

    for index in 0..device.num_configurations() {
        match device.config_descriptor(index) {
            Ok(config) => {
                let mut interfaces = Vec::new();
                for interface in config.interfaces() {
                    for desc in interface.descriptors() {
                        interfaces.push(InterfaceSummary {
                            number: desc.interface_number(),
                            alt_setting: desc.setting_number(),
                            num_endpoints: desc.num_endpoints(),
                            class: desc.class_code(),
                            subclass: desc.sub_class_code(),
                            protocol: desc.protocol_code(),
                        });
                    }
                }
                configurations.push(ConfigSummary {
                    number: config.number(),
                    interfaces,
                });
            }
            Err(e) => warn!("Failed to read config descriptor {}: {}", index, e),
        }
    }

    AccessoryReport {
        vendor_id: device.vendor_id(),
        product_id: device.product_id(),
        mode: AccessoryMode::from_product_id(device.product_id()),
        class: device.class_code(),
        subclass: device.sub_class_code(),
        protocol: device.protocol_code(),
        max_packet_size_0: device.max_packet_size_0(),
        num_configurations: device.num_configurations(),
        configurations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_wait_returns_not_detected() {
        let Ok(context) = Context::new() else {
            eprintln!("USB context unavailable (expected without permissions)");
            return;
        };

        let settings = VerifySettings {
            poll_interval_ms: 10,
            timeout_ms: 1_000,
        };
        let cancel = AtomicBool::new(true);

        let outcome = wait_for_accessory(&context, &settings, &cancel).unwrap();
        assert!(matches!(outcome, VerifyOutcome::NotDetected));
    }
}
