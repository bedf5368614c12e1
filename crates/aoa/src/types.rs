//! AOA protocol type definitions
//!
//! This module defines the protocol-level types used by the negotiation state
//! machine and its callers: protocol versions, identification strings,
//! allow-list entries, accessory-mode variants, and error conditions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::ACCESSORY_PRODUCT_ID_BASE;

/// Protocol version reported by a device in response to the version query.
///
/// A value of 0 (or a failed query) means the device does not implement the
/// accessory handshake at all; 2 and above unlocks the audio sub-mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolVersion(pub u16);

impl ProtocolVersion {
    /// Whether the device implements the handshake at all
    pub fn supports_handshake(self) -> bool {
        self.0 != 0
    }

    /// Whether the device can be asked to enable the audio sub-mode
    pub fn supports_audio(self) -> bool {
        self.0 >= 2
    }
}

/// Identification string slots, ordered by their fixed wire index
///
/// The device accumulates the strings by index; all six must be sent before
/// the switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentField {
    Manufacturer,
    Model,
    Description,
    Version,
    Uri,
    Serial,
}

impl IdentField {
    /// All six fields in wire-index order
    pub const ALL: [IdentField; 6] = [
        IdentField::Manufacturer,
        IdentField::Model,
        IdentField::Description,
        IdentField::Version,
        IdentField::Uri,
        IdentField::Serial,
    ];

    /// Fixed wire index of this field (the `wIndex` of the string transfer)
    pub fn index(self) -> u16 {
        match self {
            IdentField::Manufacturer => 0,
            IdentField::Model => 1,
            IdentField::Description => 2,
            IdentField::Version => 3,
            IdentField::Uri => 4,
            IdentField::Serial => 5,
        }
    }
}

/// The six identification strings transmitted during the handshake
///
/// Each is sent as a separate host-to-device transfer addressed by its
/// [`IdentField`] index, carrying the string bytes plus a terminating NUL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryStrings {
    pub manufacturer: String,
    pub model: String,
    pub description: String,
    pub version: String,
    pub uri: String,
    pub serial: String,
}

impl AccessoryStrings {
    /// Get the string for one field
    pub fn field(&self, field: IdentField) -> &str {
        match field {
            IdentField::Manufacturer => &self.manufacturer,
            IdentField::Model => &self.model,
            IdentField::Description => &self.description,
            IdentField::Version => &self.version,
            IdentField::Uri => &self.uri,
            IdentField::Serial => &self.serial,
        }
    }

    /// All six strings paired with their fields, in wire-index order
    pub fn fields(&self) -> impl Iterator<Item = (IdentField, &str)> {
        IdentField::ALL.into_iter().map(move |f| (f, self.field(f)))
    }
}

impl Default for AccessoryStrings {
    /// The canonical demo identity (the ADK2012 accessory board set)
    fn default() -> Self {
        Self {
            manufacturer: "Google, Inc.".to_string(),
            model: "DemoKit".to_string(),
            description: "DemoKit Arduino Board".to_string(),
            version: "2.0".to_string(),
            uri: "http://www.android.com".to_string(),
            serial: "0000000012345678".to_string(),
        }
    }
}

/// One (vendor id, product id) pair known to support the accessory handshake
///
/// Allow-lists are terminated by the [`AllowListEntry::SENTINEL`] zero/zero
/// pair; entries after a sentinel are never consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowListEntry {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl AllowListEntry {
    /// The list-terminating zero/zero pair
    pub const SENTINEL: AllowListEntry = AllowListEntry {
        vendor_id: 0,
        product_id: 0,
    };

    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }
}

/// Accessory-mode variant encoded in the post-switch product id
///
/// A switched device re-enumerates under the accessory vendor id with one of
/// six consecutive product ids, one per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessoryMode {
    Accessory,
    AccessoryAdb,
    AudioOnly,
    AudioOnlyAdb,
    AccessoryAudio,
    AccessoryAudioAdb,
}

impl AccessoryMode {
    /// Decode the variant from a post-switch product id
    pub fn from_product_id(product_id: u16) -> Option<Self> {
        match product_id.checked_sub(ACCESSORY_PRODUCT_ID_BASE)? {
            0 => Some(AccessoryMode::Accessory),
            1 => Some(AccessoryMode::AccessoryAdb),
            2 => Some(AccessoryMode::AudioOnly),
            3 => Some(AccessoryMode::AudioOnlyAdb),
            4 => Some(AccessoryMode::AccessoryAudio),
            5 => Some(AccessoryMode::AccessoryAudioAdb),
            _ => None,
        }
    }

    /// The product id a device in this mode enumerates under
    pub fn product_id(self) -> u16 {
        let offset = match self {
            AccessoryMode::Accessory => 0,
            AccessoryMode::AccessoryAdb => 1,
            AccessoryMode::AudioOnly => 2,
            AccessoryMode::AudioOnlyAdb => 3,
            AccessoryMode::AccessoryAudio => 4,
            AccessoryMode::AccessoryAudioAdb => 5,
        };
        ACCESSORY_PRODUCT_ID_BASE + offset
    }
}

impl std::fmt::Display for AccessoryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AccessoryMode::Accessory => "accessory",
            AccessoryMode::AccessoryAdb => "accessory + adb",
            AccessoryMode::AudioOnly => "audio only",
            AccessoryMode::AudioOnlyAdb => "audio only + adb",
            AccessoryMode::AccessoryAudio => "accessory + audio",
            AccessoryMode::AccessoryAudioAdb => "accessory + audio + adb",
        };
        f.write_str(label)
    }
}

/// USB transfer error conditions
///
/// Maps to libusb error codes. See rusb::Error for details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum UsbError {
    /// Transfer timed out
    #[error("transfer timed out")]
    Timeout,
    /// Endpoint stalled (protocol error)
    #[error("endpoint stalled")]
    Pipe,
    /// Device was disconnected
    #[error("device was disconnected")]
    NoDevice,
    /// Device or endpoint not found
    #[error("device or endpoint not found")]
    NotFound,
    /// Device is busy
    #[error("device is busy")]
    Busy,
    /// Buffer overflow
    #[error("buffer overflow")]
    Overflow,
    /// I/O error
    #[error("I/O error")]
    Io,
    /// Invalid parameter
    #[error("invalid parameter")]
    InvalidParam,
    /// Access denied (permissions)
    #[error("access denied")]
    Access,
    /// Other error with message
    #[error("{message}")]
    Other { message: String },
}

/// Handshake step at which a transfer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStage {
    /// One of the six identification-string transfers
    IdentString(IdentField),
    /// The audio sub-mode enable transfer
    AudioEnable,
    /// The accessory-mode switch transfer
    SwitchRequest,
}

/// Terminal result of one negotiation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationOutcome {
    /// A session could not be established on the candidate device
    OpenFailed { error: UsbError },
    /// The device does not implement the accessory handshake
    NotAccessoryCapable,
    /// The switch request was delivered; the device will disconnect and
    /// re-enumerate under the accessory identity
    SwitchIssued { version: ProtocolVersion },
    /// An individual transfer failed and the policy aborted the handshake
    TransferFailed {
        stage: TransferStage,
        error: UsbError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version_predicates() {
        assert!(!ProtocolVersion(0).supports_handshake());
        assert!(ProtocolVersion(1).supports_handshake());
        assert!(!ProtocolVersion(1).supports_audio());
        assert!(ProtocolVersion(2).supports_audio());
        assert!(ProtocolVersion(3).supports_audio());
    }

    #[test]
    fn test_ident_field_indices() {
        for (expected, field) in IdentField::ALL.into_iter().enumerate() {
            assert_eq!(field.index(), expected as u16);
        }
    }

    #[test]
    fn test_strings_field_order() {
        let strings = AccessoryStrings::default();
        let fields: Vec<_> = strings.fields().collect();

        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], (IdentField::Manufacturer, "Google, Inc."));
        assert_eq!(fields[5], (IdentField::Serial, "0000000012345678"));
    }

    #[test]
    fn test_sentinel() {
        assert!(AllowListEntry::new(0, 0).is_sentinel());
        assert!(!AllowListEntry::new(0x04e8, 0x6866).is_sentinel());
        assert!(!AllowListEntry::new(0, 1).is_sentinel());
    }

    #[test]
    fn test_accessory_mode_product_ids() {
        for pid in 0x2d00..=0x2d05u16 {
            let mode = AccessoryMode::from_product_id(pid).unwrap();
            assert_eq!(mode.product_id(), pid);
        }
        assert_eq!(AccessoryMode::from_product_id(0x2cff), None);
        assert_eq!(AccessoryMode::from_product_id(0x2d06), None);
    }
}
