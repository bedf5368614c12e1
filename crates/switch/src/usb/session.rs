//! Device sessions and the vendor control-transfer client
//!
//! A [`DeviceSession`] is an opened, exclusively-held channel to one device,
//! required for control transfers. It is released when dropped, which covers
//! every negotiation exit path; after a successful switch request the device
//! disconnects from the bus, so the session is consumed and never reused.

use std::time::Duration;

use aoa::{
    AccessoryStrings, HandshakeOptions, NegotiationOutcome, UsbError, VendorControl, run_handshake,
};
use rusb::{Context, DeviceHandle, Direction, Recipient, RequestType, request_type};
use tracing::{debug, warn};

use crate::usb::bus::AttachedDevice;

/// Opened communication channel to one device
pub struct DeviceSession {
    handle: DeviceHandle<Context>,
    vendor_id: u16,
    product_id: u16,
}

impl DeviceSession {
    /// Open a session on the given device
    ///
    /// No interface is claimed: all negotiation traffic is endpoint-0
    /// control transfers addressed to the device as a whole.
    pub fn open(device: &AttachedDevice) -> Result<Self, UsbError> {
        let handle = device.open().map_err(map_rusb_error)?;
        debug!(
            "Opened session on {:04x}:{:04x}",
            device.vendor_id(),
            device.product_id()
        );

        Ok(Self {
            handle,
            vendor_id: device.vendor_id(),
            product_id: device.product_id(),
        })
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        debug!(
            "Released session on {:04x}:{:04x}",
            self.vendor_id, self.product_id
        );
    }
}

impl VendorControl for DeviceSession {
    fn vendor_read(
        &self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, UsbError> {
        self.handle
            .read_control(
                request_type(Direction::In, RequestType::Vendor, Recipient::Device),
                request,
                value,
                index,
                buf,
                timeout,
            )
            .map_err(map_rusb_error)
    }

    fn vendor_write(
        &self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, UsbError> {
        self.handle
            .write_control(
                request_type(Direction::Out, RequestType::Vendor, Recipient::Device),
                request,
                value,
                index,
                data,
                timeout,
            )
            .map_err(map_rusb_error)
    }
}

/// Map rusb::Error to the protocol-level error type
pub fn map_rusb_error(err: rusb::Error) -> UsbError {
    match err {
        rusb::Error::Timeout => UsbError::Timeout,
        rusb::Error::Pipe => UsbError::Pipe,
        rusb::Error::NoDevice => UsbError::NoDevice,
        rusb::Error::NotFound => UsbError::NotFound,
        rusb::Error::Busy => UsbError::Busy,
        rusb::Error::Overflow => UsbError::Overflow,
        rusb::Error::Io => UsbError::Io,
        rusb::Error::InvalidParam => UsbError::InvalidParam,
        rusb::Error::Access => UsbError::Access,
        _ => UsbError::Other {
            message: err.to_string(),
        },
    }
}

/// Run the accessory handshake against one matched device
///
/// Opens the session, drives the handshake, and releases the session on
/// every exit path. The session is consumed here so it cannot outlive a
/// successful switch request.
pub fn negotiate_device(
    device: &AttachedDevice,
    strings: &AccessoryStrings,
    options: &HandshakeOptions,
) -> NegotiationOutcome {
    let session = match DeviceSession::open(device) {
        Ok(session) => session,
        Err(error) => {
            warn!(
                "Failed to open device {:04x}:{:04x}: {}",
                device.vendor_id(),
                device.product_id(),
                error
            );
            return NegotiationOutcome::OpenFailed { error };
        }
    };

    run_handshake(&session, strings, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_rusb_error() {
        assert_eq!(map_rusb_error(rusb::Error::Timeout), UsbError::Timeout);
        assert_eq!(map_rusb_error(rusb::Error::Pipe), UsbError::Pipe);
        assert_eq!(map_rusb_error(rusb::Error::NoDevice), UsbError::NoDevice);
        assert_eq!(map_rusb_error(rusb::Error::NotFound), UsbError::NotFound);
        assert_eq!(map_rusb_error(rusb::Error::Access), UsbError::Access);
    }
}
