//! Integration tests for the device-matching predicates
//!
//! Covers allow-list candidate selection (including the sentinel cut-off),
//! the accessory identity range bounds, and totality/idempotence of both
//! predicates over arbitrary 16-bit inputs.

use aoa::{
    ACCESSORY_VENDOR_ID, AccessoryMode, AllowListEntry, is_accessory_identity, matches_allow_list,
};
use proptest::prelude::*;

mod allow_list {
    use super::*;

    fn demo_allow_list() -> Vec<AllowListEntry> {
        vec![
            AllowListEntry::new(0x04e8, 0x6866),
            AllowListEntry::SENTINEL,
        ]
    }

    #[test]
    fn test_candidate_selection() {
        // Allow-listed phone is matched, an unrelated device is not
        let allow = demo_allow_list();

        assert!(matches_allow_list(0x04e8, 0x6866, &allow));
        assert!(!matches_allow_list(0x0000, 0x0000, &allow));
        assert!(!matches_allow_list(0x2717, 0x1220, &allow));
    }

    #[test]
    fn test_every_entry_matches() {
        let allow = vec![
            AllowListEntry::new(0x04e8, 0x6866),
            AllowListEntry::new(0x18d1, 0x4ee2),
            AllowListEntry::new(0x0fce, 0x0dde),
        ];

        for entry in &allow {
            assert!(matches_allow_list(entry.vendor_id, entry.product_id, &allow));
        }
    }

    #[test]
    fn test_entries_after_sentinel_are_dead() {
        let allow = vec![
            AllowListEntry::SENTINEL,
            AllowListEntry::new(0x04e8, 0x6866),
        ];

        assert!(!matches_allow_list(0x04e8, 0x6866, &allow));
    }

    #[test]
    fn test_pair_must_match_exactly() {
        let allow = demo_allow_list();

        // Vendor and product from different entries never combine
        assert!(!matches_allow_list(0x04e8, 0x0000, &allow));
        assert!(!matches_allow_list(0x0000, 0x6866, &allow));
    }
}

mod accessory_identity {
    use super::*;

    #[test]
    fn test_post_switch_identity() {
        // Switched device (accessory + audio variant)
        assert!(is_accessory_identity(0x18d1, 0x2d04));
        // One past the end of the accessory range
        assert!(!is_accessory_identity(0x18d1, 0x2d06));
    }

    #[test]
    fn test_range_is_inclusive() {
        assert!(is_accessory_identity(ACCESSORY_VENDOR_ID, 0x2d00));
        assert!(is_accessory_identity(ACCESSORY_VENDOR_ID, 0x2d05));
        assert!(!is_accessory_identity(ACCESSORY_VENDOR_ID, 0x2cff));
        assert!(!is_accessory_identity(ACCESSORY_VENDOR_ID, 0x2d06));
    }

    #[test]
    fn test_mode_variants_cover_the_range() {
        for pid in 0x2d00..=0x2d05u16 {
            assert!(AccessoryMode::from_product_id(pid).is_some());
            assert!(is_accessory_identity(ACCESSORY_VENDOR_ID, pid));
        }
    }
}

proptest! {
    /// Property: both predicates are total over all 16-bit inputs
    #[test]
    fn prop_predicates_are_total(vendor_id: u16, product_id: u16) {
        let allow = [
            AllowListEntry::new(0x04e8, 0x6866),
            AllowListEntry::SENTINEL,
        ];

        let _ = matches_allow_list(vendor_id, product_id, &allow);
        let _ = is_accessory_identity(vendor_id, product_id);
    }

    /// Property: matching is idempotent - the same descriptor always yields
    /// the same answer
    #[test]
    fn prop_matching_is_idempotent(vendor_id: u16, product_id: u16) {
        let allow = [
            AllowListEntry::new(0x04e8, 0x6866),
            AllowListEntry::new(0x2717, 0x1220),
        ];

        prop_assert_eq!(
            matches_allow_list(vendor_id, product_id, &allow),
            matches_allow_list(vendor_id, product_id, &allow)
        );
        prop_assert_eq!(
            is_accessory_identity(vendor_id, product_id),
            is_accessory_identity(vendor_id, product_id)
        );
    }

    /// Property: the accessory predicate agrees with the mode decoder
    #[test]
    fn prop_identity_agrees_with_mode_decoder(product_id: u16) {
        prop_assert_eq!(
            is_accessory_identity(ACCESSORY_VENDOR_ID, product_id),
            AccessoryMode::from_product_id(product_id).is_some()
        );
    }

    /// Property: pairs not present in the list never match
    #[test]
    fn prop_absent_pairs_never_match(vendor_id: u16, product_id: u16) {
        let allow = [
            AllowListEntry::new(0x04e8, 0x6866),
            AllowListEntry::new(0x2717, 0x1220),
        ];

        let present = allow
            .iter()
            .any(|e| e.vendor_id == vendor_id && e.product_id == product_id);
        prop_assert_eq!(matches_allow_list(vendor_id, product_id, &allow), present);
    }
}
