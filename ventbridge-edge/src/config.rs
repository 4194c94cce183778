//! Bridge configuration: broker address, credentials and the Sparkplug
//! identifiers. Loaded once at startup from `bridge.yaml` (path overridable
//! via `VENTBRIDGE_CONFIG`), immutable afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub mqtt: MqttConf,
    pub sparkplug: SparkplugConf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Plaintext credential pair handed to the broker at connect time.
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparkplugConf {
    pub group_id: String,
    pub node_id: String,
    pub device_id: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConf {
                host: "localhost".into(),
                port: 1883,
                client_id: "ventbridge-edge".into(),
                username: None,
                password: None,
                keep_alive_secs: 15,
            },
            sparkplug: SparkplugConf {
                group_id: "Ignition".into(),
                node_id: "Master".into(),
                device_id: "Ventilation".into(),
            },
        }
    }
}

pub async fn load_config() -> BridgeConfig {
    let path = std::env::var("VENTBRIDGE_CONFIG").unwrap_or_else(|_| "bridge.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return BridgeConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            warn!("invalid config {path}: {e}, using defaults");
            BridgeConfig::default()
        })
    } else {
        warn!("no {path}, using default config");
        BridgeConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_field_deployment() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.mqtt.port, 1883);
        assert_eq!(cfg.mqtt.client_id, "ventbridge-edge");
        assert!(cfg.mqtt.username.is_none());
        assert_eq!(cfg.sparkplug.group_id, "Ignition");
        assert_eq!(cfg.sparkplug.node_id, "Master");
        assert_eq!(cfg.sparkplug.device_id, "Ventilation");
    }

    #[test]
    fn yaml_round_trip_preserves_credentials() {
        let mut cfg = BridgeConfig::default();
        cfg.mqtt.username = Some("operator".into());
        cfg.mqtt.password = Some("secret".into());

        let txt = serde_yaml::to_string(&cfg).unwrap();
        let back: BridgeConfig = serde_yaml::from_str(&txt).unwrap();
        assert_eq!(back.mqtt.username.as_deref(), Some("operator"));
        assert_eq!(back.mqtt.password.as_deref(), Some("secret"));
    }
}
