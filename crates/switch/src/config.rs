//! Switcher configuration management

use anyhow::{Context, Result, anyhow};
use aoa::{AccessoryStrings, AllowListEntry, HandshakeOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchConfig {
    #[serde(default)]
    pub switch: SwitchSettings,
    #[serde(default)]
    pub usb: UsbSettings,
    /// Identification strings sent during the handshake
    #[serde(default)]
    pub identity: IdentitySettings,
    #[serde(default)]
    pub handshake: HandshakeSettings,
    #[serde(default)]
    pub verify: VerifySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchSettings {
    #[serde(default = "SwitchSettings::default_log_level")]
    pub log_level: String,
}

impl Default for SwitchSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl SwitchSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Devices known to support the accessory handshake, as exact
    /// "0xVID:0xPID" pairs
    #[serde(default = "UsbSettings::default_allow")]
    pub allow: Vec<String>,
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            allow: Self::default_allow(),
        }
    }
}

impl UsbSettings {
    fn default_allow() -> Vec<String> {
        // Samsung N7100, the canonical demo target
        vec!["0x04e8:0x6866".to_string()]
    }

    /// Parse the configured entries into the allow-list
    pub fn allow_list(&self) -> Result<Vec<AllowListEntry>> {
        self.allow.iter().map(|s| parse_allow_entry(s)).collect()
    }
}

/// Identification strings, defaulting to the canonical demo identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySettings {
    #[serde(default = "IdentitySettings::default_manufacturer")]
    pub manufacturer: String,
    #[serde(default = "IdentitySettings::default_model")]
    pub model: String,
    #[serde(default = "IdentitySettings::default_description")]
    pub description: String,
    #[serde(default = "IdentitySettings::default_version")]
    pub version: String,
    #[serde(default = "IdentitySettings::default_uri")]
    pub uri: String,
    #[serde(default = "IdentitySettings::default_serial")]
    pub serial: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            manufacturer: Self::default_manufacturer(),
            model: Self::default_model(),
            description: Self::default_description(),
            version: Self::default_version(),
            uri: Self::default_uri(),
            serial: Self::default_serial(),
        }
    }
}

impl IdentitySettings {
    fn default_manufacturer() -> String {
        AccessoryStrings::default().manufacturer
    }

    fn default_model() -> String {
        AccessoryStrings::default().model
    }

    fn default_description() -> String {
        AccessoryStrings::default().description
    }

    fn default_version() -> String {
        AccessoryStrings::default().version
    }

    fn default_uri() -> String {
        AccessoryStrings::default().uri
    }

    fn default_serial() -> String {
        AccessoryStrings::default().serial
    }

    /// Build the protocol-level string set
    pub fn strings(&self) -> AccessoryStrings {
        AccessoryStrings {
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            uri: self.uri.clone(),
            serial: self.serial.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeSettings {
    /// Ask the device to enable the audio sub-mode when it supports it
    #[serde(default = "HandshakeSettings::default_request_audio")]
    pub request_audio: bool,
    /// Abort the handshake on the first failed intermediate transfer
    /// instead of continuing best-effort
    #[serde(default)]
    pub strict: bool,
    /// Per-request timeout in milliseconds
    #[serde(default = "HandshakeSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            request_audio: Self::default_request_audio(),
            strict: false,
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

impl HandshakeSettings {
    fn default_request_audio() -> bool {
        true
    }

    fn default_timeout_ms() -> u64 {
        500
    }

    /// Build the negotiation policy
    pub fn options(&self) -> HandshakeOptions {
        HandshakeOptions {
            request_audio: self.request_audio,
            strict: self.strict,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySettings {
    /// Interval between post-switch enumeration attempts in milliseconds
    #[serde(default = "VerifySettings::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Total window to wait for the device to re-enumerate in milliseconds
    #[serde(default = "VerifySettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for VerifySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: Self::default_poll_interval_ms(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

impl VerifySettings {
    fn default_poll_interval_ms() -> u64 {
        500
    }

    fn default_timeout_ms() -> u64 {
        10_000
    }
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            switch: SwitchSettings::default(),
            usb: UsbSettings::default(),
            identity: IdentitySettings::default(),
            handshake: HandshakeSettings::default(),
            verify: VerifySettings::default(),
        }
    }
}

impl SwitchConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/aoa-switch/switch.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: SwitchConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("aoa-switch").join("switch.toml")
        } else {
            PathBuf::from(".config/aoa-switch/switch.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.switch.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.switch.log_level,
                valid_levels.join(", ")
            ));
        }

        // Validate allow-list entries
        for entry in &self.usb.allow {
            parse_allow_entry(entry)?;
        }

        if self.handshake.timeout_ms == 0 {
            return Err(anyhow!("Handshake timeout must be greater than 0"));
        }

        if self.verify.poll_interval_ms == 0 {
            return Err(anyhow!("Verify poll interval must be greater than 0"));
        }

        if self.verify.timeout_ms < self.verify.poll_interval_ms {
            return Err(anyhow!(
                "Verify timeout ({} ms) is shorter than the poll interval ({} ms)",
                self.verify.timeout_ms,
                self.verify.poll_interval_ms
            ));
        }

        Ok(())
    }
}

/// Parse an exact "0xVID:0xPID" allow-list entry
///
/// Unlike device-sharing filters there are no wildcards here: the allow-list
/// identifies specific devices known to speak the handshake.
fn parse_allow_entry(entry: &str) -> Result<AllowListEntry> {
    let parts: Vec<&str> = entry.split(':').collect();
    if parts.len() != 2 {
        return Err(anyhow!(
            "Invalid allow entry '{}', expected VID:PID (e.g., '0x04e8:0x6866')",
            entry
        ));
    }

    let vendor_id = parse_hex_id(parts[0], "VID")?;
    let product_id = parse_hex_id(parts[1], "PID")?;

    Ok(AllowListEntry::new(vendor_id, product_id))
}

/// Parse a hex ID (VID or PID)
fn parse_hex_id(id: &str, name: &str) -> Result<u16> {
    if !id.starts_with("0x") && !id.starts_with("0X") {
        return Err(anyhow!(
            "Invalid {} '{}', must start with '0x' (e.g., '0x04e8')",
            name,
            id
        ));
    }

    let hex_part = &id[2..];
    if hex_part.is_empty() || hex_part.len() > 4 {
        return Err(anyhow!(
            "Invalid {} '{}', hex part must be 1-4 digits",
            name,
            id
        ));
    }

    u16::from_str_radix(hex_part, 16)
        .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))
}
