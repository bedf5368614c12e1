//! Integration tests for configuration parsing
//!
//! Parses switcher configuration fixtures and checks section contents.
//! Note: these tests read the TOML through `toml::Value` since the switch
//! crate is a binary-only crate; the typed load/validate paths are covered
//! by the unit tests next to the config code.

use std::fs;
use tempfile::tempdir;

const MINIMAL_CONFIG: &str = r#"
[switch]
log_level = "info"

[usb]
allow = ["0x04e8:0x6866"]
"#;

const FULL_CONFIG: &str = r#"
[switch]
log_level = "debug"

[usb]
allow = ["0x04e8:0x6866", "0x18d1:0x4ee2"]

[identity]
manufacturer = "Google, Inc."
model = "DemoKit"
description = "DemoKit Arduino Board"
version = "2.0"
uri = "http://www.android.com"
serial = "0000000012345678"

[handshake]
request_audio = true
strict = false
timeout_ms = 500

[verify]
poll_interval_ms = 500
timeout_ms = 10000
"#;

mod parsing {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: toml::Value = toml::from_str(MINIMAL_CONFIG).unwrap();

        let switch = config.get("switch").unwrap();
        assert_eq!(switch.get("log_level").unwrap().as_str().unwrap(), "info");

        let usb = config.get("usb").unwrap();
        let allow = usb.get("allow").unwrap().as_array().unwrap();
        assert_eq!(allow.len(), 1);
        assert_eq!(allow[0].as_str().unwrap(), "0x04e8:0x6866");
    }

    #[test]
    fn test_parse_full_config() {
        let config: toml::Value = toml::from_str(FULL_CONFIG).unwrap();

        let usb = config.get("usb").unwrap();
        let allow = usb.get("allow").unwrap().as_array().unwrap();
        assert_eq!(allow.len(), 2);

        let identity = config.get("identity").unwrap();
        assert_eq!(
            identity.get("manufacturer").unwrap().as_str().unwrap(),
            "Google, Inc."
        );
        assert_eq!(
            identity.get("serial").unwrap().as_str().unwrap(),
            "0000000012345678"
        );

        let handshake = config.get("handshake").unwrap();
        assert!(handshake.get("request_audio").unwrap().as_bool().unwrap());
        assert!(!handshake.get("strict").unwrap().as_bool().unwrap());
        assert_eq!(handshake.get("timeout_ms").unwrap().as_integer().unwrap(), 500);

        let verify = config.get("verify").unwrap();
        assert_eq!(
            verify.get("poll_interval_ms").unwrap().as_integer().unwrap(),
            500
        );
        assert_eq!(verify.get("timeout_ms").unwrap().as_integer().unwrap(), 10000);
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result: Result<toml::Value, _> = toml::from_str("[usb\nallow = [");
        assert!(result.is_err());
    }
}

mod files {
    use super::*;

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("switch.toml");

        fs::write(&path, FULL_CONFIG).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let config: toml::Value = toml::from_str(&content).unwrap();

        assert_eq!(
            config
                .get("switch")
                .unwrap()
                .get("log_level")
                .unwrap()
                .as_str()
                .unwrap(),
            "debug"
        );
    }

    #[test]
    fn test_missing_sections_are_optional() {
        // An empty file is a valid config: every section has defaults
        let config: toml::Value = toml::from_str("").unwrap();
        assert!(config.get("usb").is_none());
    }
}
