//! Device-matching predicates
//!
//! Pure, stateless predicates over descriptor identity: whether a device is
//! in the configured allow-list, and whether a device has already switched
//! into one of the accessory-mode variants. Both are total over all 16-bit
//! inputs and perform no device access.

use crate::types::AllowListEntry;

/// Vendor id under which a switched device re-enumerates
pub const ACCESSORY_VENDOR_ID: u16 = 0x18d1;

/// First product id of the six accessory-mode variants
pub const ACCESSORY_PRODUCT_ID_BASE: u16 = 0x2d00;

/// Last product id of the six accessory-mode variants
pub const ACCESSORY_PRODUCT_ID_LAST: u16 = 0x2d05;

/// Check whether a (vendor id, product id) pair is in the allow-list
///
/// Linear scan that stops at the first sentinel entry; true iff an exact
/// pair match is found before it.
pub fn matches_allow_list(
    vendor_id: u16,
    product_id: u16,
    allow_list: &[AllowListEntry],
) -> bool {
    for entry in allow_list {
        if entry.is_sentinel() {
            break;
        }
        if entry.vendor_id == vendor_id && entry.product_id == product_id {
            return true;
        }
    }
    false
}

/// Check whether a (vendor id, product id) pair is an accessory-mode identity
///
/// True iff the vendor id is the reserved accessory-framework id and the
/// product id lies in the inclusive six-value accessory range.
pub fn is_accessory_identity(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == ACCESSORY_VENDOR_ID
        && (ACCESSORY_PRODUCT_ID_BASE..=ACCESSORY_PRODUCT_ID_LAST).contains(&product_id)
}
