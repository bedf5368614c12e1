//! Accessory-mode negotiation
//!
//! Drives the AOA handshake over one open device session: query the protocol
//! version, transmit the six identification strings, optionally enable the
//! audio sub-mode, then issue the mode switch. On a successful switch the
//! device physically disconnects and re-enumerates under the accessory
//! identity, so the session must not be used afterwards; the caller owns the
//! session and releases it on every exit path.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::types::{
    AccessoryStrings, IdentField, NegotiationOutcome, ProtocolVersion, TransferStage, UsbError,
};

/// Query the 16-bit protocol version (device to host)
pub const REQ_GET_PROTOCOL: u8 = 51;
/// Send one identification string, addressed by its wire index
pub const REQ_SEND_STRING: u8 = 52;
/// Switch the device into accessory mode
pub const REQ_START_ACCESSORY: u8 = 53;
/// Register a HID device (AOA 2.0; not driven by the negotiation)
pub const REQ_REGISTER_HID: u8 = 54;
/// Unregister a HID device (AOA 2.0; not driven by the negotiation)
pub const REQ_UNREGISTER_HID: u8 = 55;
/// Upload a HID report descriptor (AOA 2.0; not driven by the negotiation)
pub const REQ_SET_HID_REPORT_DESC: u8 = 56;
/// Send a HID event (AOA 2.0; not driven by the negotiation)
pub const REQ_SEND_HID_EVENT: u8 = 57;
/// Enable or disable the audio sub-mode
pub const REQ_SET_AUDIO_MODE: u8 = 58;

/// Audio sub-mode selector: 2-channel 16-bit PCM over the standard USB
/// audio class
pub const AUDIO_MODE_PCM_16BIT_2CH: u16 = 1;

/// Per-request timeout used at every AOA call site
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);

/// Synchronous vendor control transfers against one open device session
///
/// Both operations address the device as a whole (recipient "device"), block
/// for at most `timeout`, and perform no internal retry; callers decide
/// retry policy. Implemented by the rusb-backed session in the `aoa-switch`
/// binary and by scripted mocks in tests.
pub trait VendorControl {
    /// Device-to-host vendor transfer; returns the number of bytes read
    fn vendor_read(
        &self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, UsbError>;

    /// Host-to-device vendor transfer; returns the number of bytes written
    fn vendor_write(
        &self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, UsbError>;
}

/// Policy knobs for one handshake run
#[derive(Debug, Clone)]
pub struct HandshakeOptions {
    /// Ask the device to enable the audio sub-mode (only honoured when the
    /// reported protocol version supports it)
    pub request_audio: bool,
    /// Abort on the first failed intermediate transfer instead of
    /// continuing best-effort to the switch request
    pub strict: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            request_audio: true,
            strict: false,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Query the protocol version the device implements
///
/// A short response is reported as an error: the version is unusable unless
/// both bytes arrived.
pub fn query_protocol_version(
    ctl: &impl VendorControl,
    timeout: Duration,
) -> Result<ProtocolVersion, UsbError> {
    let mut buf = [0u8; 2];
    let len = ctl.vendor_read(REQ_GET_PROTOCOL, 0, 0, &mut buf, timeout)?;

    if len != buf.len() {
        return Err(UsbError::Other {
            message: format!("short protocol version response ({} bytes)", len),
        });
    }

    Ok(ProtocolVersion(u16::from_le_bytes(buf)))
}

/// Send one identification string, NUL-terminated, at its fixed index
pub fn send_ident_string(
    ctl: &impl VendorControl,
    field: IdentField,
    value: &str,
    timeout: Duration,
) -> Result<(), UsbError> {
    let mut data = Vec::with_capacity(value.len() + 1);
    data.extend_from_slice(value.as_bytes());
    data.push(0);

    ctl.vendor_write(REQ_SEND_STRING, 0, field.index(), &data, timeout)?;
    Ok(())
}

/// Enable or disable the audio sub-mode
pub fn set_audio_mode(
    ctl: &impl VendorControl,
    enable: bool,
    timeout: Duration,
) -> Result<(), UsbError> {
    let value = if enable { AUDIO_MODE_PCM_16BIT_2CH } else { 0 };
    ctl.vendor_write(REQ_SET_AUDIO_MODE, value, 0, &[], timeout)?;
    Ok(())
}

/// Issue the accessory-mode switch request (no payload)
pub fn start_accessory(ctl: &impl VendorControl, timeout: Duration) -> Result<(), UsbError> {
    ctl.vendor_write(REQ_START_ACCESSORY, 0, 0, &[], timeout)?;
    Ok(())
}

/// Drive the full handshake against one open session
///
/// A failed or zero version query means the device does not speak the
/// protocol; no further transfers are attempted. String and audio transfer
/// failures follow the configured policy: best-effort keeps going (the
/// transfers are not transactional and there is nothing to roll back),
/// strict aborts at the first failure. The switch request is always the last
/// transfer; after it succeeds the session is dead.
pub fn run_handshake(
    ctl: &impl VendorControl,
    strings: &AccessoryStrings,
    options: &HandshakeOptions,
) -> NegotiationOutcome {
    let version = match query_protocol_version(ctl, options.timeout) {
        Ok(v) if v.supports_handshake() => v,
        Ok(_) => {
            info!("Device reported protocol version 0");
            return NegotiationOutcome::NotAccessoryCapable;
        }
        Err(error) => {
            info!("Protocol version query failed: {}", error);
            return NegotiationOutcome::NotAccessoryCapable;
        }
    };
    info!("Accessory protocol version: {}", version.0);

    for (field, value) in strings.fields() {
        match send_ident_string(ctl, field, value, options.timeout) {
            Ok(()) => debug!("Sent ident string {:?} (index {})", field, field.index()),
            Err(error) => {
                warn!("Ident string {:?} transfer failed: {}", field, error);
                if options.strict {
                    return NegotiationOutcome::TransferFailed {
                        stage: TransferStage::IdentString(field),
                        error,
                    };
                }
            }
        }
    }

    if options.request_audio && version.supports_audio() {
        match set_audio_mode(ctl, true, options.timeout) {
            Ok(()) => debug!("Audio sub-mode enabled"),
            Err(error) => {
                warn!("Audio enable transfer failed: {}", error);
                if options.strict {
                    return NegotiationOutcome::TransferFailed {
                        stage: TransferStage::AudioEnable,
                        error,
                    };
                }
            }
        }
    }

    match start_accessory(ctl, options.timeout) {
        Ok(()) => {
            info!("Switch request delivered; device will disconnect and re-enumerate");
            NegotiationOutcome::SwitchIssued { version }
        }
        Err(error) => {
            warn!("Switch request transfer failed: {}", error);
            NegotiationOutcome::TransferFailed {
                stage: TransferStage::SwitchRequest,
                error,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_codes() {
        // Wire-level request codes are fixed by the protocol
        assert_eq!(REQ_GET_PROTOCOL, 51);
        assert_eq!(REQ_SEND_STRING, 52);
        assert_eq!(REQ_START_ACCESSORY, 53);
        assert_eq!(REQ_SET_AUDIO_MODE, 58);
    }

    #[test]
    fn test_default_options() {
        let options = HandshakeOptions::default();
        assert!(options.request_audio);
        assert!(!options.strict);
        assert_eq!(options.timeout, Duration::from_millis(500));
    }
}
