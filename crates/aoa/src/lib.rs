//! AOA protocol library for rust-aoa-switch
//!
//! This crate defines the vendor control-transfer protocol used to switch an
//! attached mobile device into accessory mode: the wire-level request codes,
//! type-safe protocol values, the pure device-matching predicates, and the
//! negotiation state machine.
//!
//! Bus access lives in the `aoa-switch` binary. Everything here is driveable
//! against a mocked transfer layer through the [`VendorControl`] trait.
//!
//! # Example
//!
//! ```
//! use aoa::{AllowListEntry, is_accessory_identity, matches_allow_list};
//!
//! let allow = [AllowListEntry::new(0x04e8, 0x6866), AllowListEntry::SENTINEL];
//!
//! // Candidate selection before the switch
//! assert!(matches_allow_list(0x04e8, 0x6866, &allow));
//!
//! // Identity check after the switch
//! assert!(is_accessory_identity(0x18d1, 0x2d00));
//! ```

pub mod handshake;
pub mod matcher;
pub mod types;

pub use handshake::{
    AUDIO_MODE_PCM_16BIT_2CH, HandshakeOptions, REQ_GET_PROTOCOL, REQ_REGISTER_HID,
    REQ_SEND_HID_EVENT, REQ_SEND_STRING, REQ_SET_AUDIO_MODE, REQ_SET_HID_REPORT_DESC,
    REQ_START_ACCESSORY, REQ_UNREGISTER_HID, REQUEST_TIMEOUT, VendorControl, run_handshake,
};
pub use matcher::{
    ACCESSORY_PRODUCT_ID_BASE, ACCESSORY_PRODUCT_ID_LAST, ACCESSORY_VENDOR_ID,
    is_accessory_identity, matches_allow_list,
};
pub use types::{
    AccessoryMode, AccessoryStrings, AllowListEntry, IdentField, NegotiationOutcome,
    ProtocolVersion, TransferStage, UsbError,
};
