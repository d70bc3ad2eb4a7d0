//! Node configuration (spec §6), grounded in the teacher's
//! `apps/server/src/config.rs` `ServerConfig` pattern: a `Deserialize`
//! struct with a literal `Default` impl, a `load` free function performing
//! file-then-env layering, and validation that reports errors without
//! disturbing a previously-loaded good config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// `setupMode` config key (spec §6): only `""`/`"0"` (ASL-compatibility) is
/// currently implemented; any other value is a config error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupMode {
    Asl,
}

/// Node configuration (spec §6 table), deserialized from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: String,
    pub iax_port: u16,
    pub setup_mode: SetupMode,
    pub asl_audio_device: String,
    pub asl_cos_from: String,
    pub asl_cos_invert: bool,
    pub asl_tx_mix_a_set: u16,
    pub asl_tx_mix_b_set: u16,
    pub asl_rx_mixer_set: u16,
    pub http_port: u16,
    pub trace: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node: String::new(),
            iax_port: 4569,
            setup_mode: SetupMode::Asl,
            asl_audio_device: String::new(),
            asl_cos_from: String::new(),
            asl_cos_invert: false,
            asl_tx_mix_a_set: 500,
            asl_tx_mix_b_set: 500,
            asl_rx_mixer_set: 500,
            http_port: 8080,
            trace: false,
        }
    }
}

/// Raw on-disk shape: every value is carried as a JSON string, matching the
/// original `config-handler.cpp`'s "numeric string" keys (spec §6) so a
/// missing/non-numeric field is a named validation error rather than a
/// silent JSON-type coercion.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawNodeConfig {
    node: String,
    #[serde(rename = "iaxPort")]
    iax_port: Option<String>,
    #[serde(rename = "setupMode")]
    setup_mode: String,
    #[serde(rename = "aslAudioDevice")]
    asl_audio_device: String,
    #[serde(rename = "aslCosFrom")]
    asl_cos_from: String,
    #[serde(rename = "aslCosInvert")]
    asl_cos_invert: bool,
    #[serde(rename = "aslTxMixASet")]
    asl_tx_mix_a_set: Option<String>,
    #[serde(rename = "aslTxMixBSet")]
    asl_tx_mix_b_set: Option<String>,
    #[serde(rename = "aslRxMixerSet")]
    asl_rx_mixer_set: Option<String>,
}

impl Default for RawNodeConfig {
    fn default() -> Self {
        Self {
            node: String::new(),
            iax_port: None,
            setup_mode: String::new(),
            asl_audio_device: String::new(),
            asl_cos_from: String::new(),
            asl_cos_invert: false,
            asl_tx_mix_a_set: None,
            asl_tx_mix_b_set: None,
            asl_rx_mixer_set: None,
        }
    }
}

fn parse_numeric_field(value: &Option<String>, field: &str) -> Result<u16, NodeError> {
    value
        .as_deref()
        .ok_or_else(|| NodeError::ConfigInvalid(format!("{field} is missing/invalid")))?
        .parse::<u16>()
        .map_err(|_| NodeError::ConfigInvalid(format!("{field} is missing/invalid")))
}

impl NodeConfig {
    /// Parses `contents` (JSON text) into a validated [`NodeConfig`].
    ///
    /// # Errors
    /// Returns [`NodeError::ConfigInvalid`] on malformed JSON, an
    /// unrecognized `setupMode`, or a missing/non-numeric mixer-set key -
    /// mirroring `original_source/src/config-handler.cpp`'s
    /// `invalid_argument` throws.
    pub fn parse(contents: &str) -> Result<Self, NodeError> {
        let raw: RawNodeConfig = serde_json::from_str(contents)
            .map_err(|e| NodeError::ConfigInvalid(e.to_string()))?;

        if !(raw.setup_mode.is_empty() || raw.setup_mode == "0") {
            return Err(NodeError::ConfigInvalid(format!(
                "Setup mode invalid: {}",
                raw.setup_mode
            )));
        }

        let iax_port = parse_numeric_field(&raw.iax_port, "iaxPort")?;

        let mut config = NodeConfig {
            node: raw.node,
            iax_port,
            setup_mode: SetupMode::Asl,
            asl_audio_device: raw.asl_audio_device,
            asl_cos_from: raw.asl_cos_from,
            asl_cos_invert: raw.asl_cos_invert,
            ..NodeConfig::default()
        };

        if config.asl_audio_device.starts_with("usb ") {
            config.asl_tx_mix_a_set = parse_numeric_field(&raw.asl_tx_mix_a_set, "aslTxMixASet")?;
            config.asl_tx_mix_b_set = parse_numeric_field(&raw.asl_tx_mix_b_set, "aslTxMixBSet")?;
            config.asl_rx_mixer_set = parse_numeric_field(&raw.asl_rx_mixer_set, "aslRxMixerSet")?;
        }

        Ok(config)
    }

    /// Loads configuration from `path`, falling back to defaults (with a
    /// logged warning) if the file does not exist. Environment variables
    /// from spec §6 override the loaded/default values when `port_override`
    /// is not already set by the CLI.
    pub fn load(path: Option<&Path>) -> Result<Self, NodeError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| NodeError::ConfigInvalid(e.to_string()))?;
                Self::parse(&contents)?
            }
            _ => {
                log::warn!("no config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("AMP_IAX_PORT") {
            if let Ok(port) = port.parse() {
                self.iax_port = port;
            }
        }
        if let Ok(device) = std::env::var("AMP_NODE0_USBSOUND") {
            self.asl_audio_device = device;
        }
        if let Ok(port) = std::env::var("AMP_NODE0_MGR_PORT") {
            if let Ok(port) = port.parse() {
                self.http_port = port;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_JSON: &str = r#"{
        "node": "1999",
        "iaxPort": "4569",
        "setupMode": "",
        "aslAudioDevice": "usb card-a",
        "aslCosFrom": "usb",
        "aslCosInvert": true,
        "aslTxMixASet": "500",
        "aslTxMixBSet": "500",
        "aslRxMixerSet": "500"
    }"#;

    #[test]
    fn parses_valid_config() {
        let config = NodeConfig::parse(VALID_JSON).unwrap();
        assert_eq!(config.node, "1999");
        assert_eq!(config.iax_port, 4569);
        assert!(config.asl_cos_invert);
    }

    #[test]
    fn rejects_invalid_setup_mode() {
        let bad = VALID_JSON.replace("\"setupMode\": \"\"", "\"setupMode\": \"7\"");
        assert!(matches!(
            NodeConfig::parse(&bad),
            Err(NodeError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn rejects_missing_iax_port() {
        let bad = VALID_JSON.replace("\"iaxPort\": \"4569\",", "");
        assert!(matches!(
            NodeConfig::parse(&bad),
            Err(NodeError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_mixer_set_when_usb_audio() {
        let bad = VALID_JSON.replace("\"aslTxMixASet\": \"500\"", "\"aslTxMixASet\": \"not-a-number\"");
        assert!(matches!(
            NodeConfig::parse(&bad),
            Err(NodeError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn default_config_is_sensible() {
        let config = NodeConfig::default();
        assert_eq!(config.iax_port, 4569);
        assert_eq!(config.http_port, 8080);
    }
}
