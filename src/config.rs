// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Daemon configuration.
//!
//! Configuration is a single YAML file with three sections:
//!
//! ```yaml
//! Default:
//!   logging: info
//! MQTT:
//!   MQTTQOS: 2
//!   MQTTBroker: localhost
//!   MQTTPort: 1883
//! Devices:
//!   porch_light: 17
//!   porch_light_default: true
//! ```
//!
//! All sections and keys are optional and fall back to the defaults
//! shown above. The `Devices` section maps device names to BCM pin
//! numbers; a companion `<name>_default` key sets that device's initial
//! state (off when absent).
//!
//! [`Config::load`] checks a fixed list of paths and uses the first file
//! that exists; a host with no configuration file at all runs with the
//! defaults and an empty device set.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rumqttc::QoS;
use serde::Deserialize;

use crate::error::ConfigError;

/// Paths probed for a configuration file, in order. The first file that
/// exists is the whole configuration.
pub const SEARCH_PATHS: [&str; 3] = [
    "/etc/pinbridge.yaml",
    "pinbridge.yaml",
    "/opt/pinbridge/pinbridge.yaml",
];

/// Parsed daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// The `Default` section.
    #[serde(rename = "Default", default)]
    pub defaults: DefaultSection,

    /// The `MQTT` section.
    #[serde(rename = "MQTT", default)]
    pub mqtt: MqttSection,

    /// The raw `Devices` section; parsed into device entries by the
    /// registry.
    #[serde(rename = "Devices", default)]
    pub devices: BTreeMap<String, serde_yaml::Value>,

    /// The file this configuration was loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultSection {
    /// Log level name: `info`, `debug`, `warning` or `error`.
    #[serde(default = "default_logging")]
    pub logging: String,
}

/// Broker connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttSection {
    /// QoS for all publications, 0 through 2.
    #[serde(rename = "MQTTQOS", default = "default_qos")]
    pub qos: u8,

    /// Broker hostname or address.
    #[serde(rename = "MQTTBroker", default = "default_broker")]
    pub broker: String,

    /// Broker port.
    #[serde(rename = "MQTTPort", default = "default_port")]
    pub port: u16,
}

fn default_logging() -> String {
    "info".to_string()
}

fn default_qos() -> u8 {
    2
}

fn default_broker() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

impl Default for DefaultSection {
    fn default() -> Self {
        Self {
            logging: default_logging(),
        }
    }
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            qos: default_qos(),
            broker: default_broker(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Loads the configuration from the first file in [`SEARCH_PATHS`]
    /// that exists, or returns the defaults when none does.
    ///
    /// Does not log: the log level itself comes from this configuration,
    /// so callers initialize logging afterwards and report
    /// [`Config::source`] themselves.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when a file is found but is not
    /// valid YAML.
    pub fn load() -> Result<Self, ConfigError> {
        for candidate in SEARCH_PATHS {
            let path = Path::new(candidate);
            match fs::read_to_string(path) {
                Ok(text) => {
                    let mut config: Config =
                        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                            path: path.to_path_buf(),
                            source,
                        })?;
                    config.source = Some(path.to_path_buf());
                    return Ok(config);
                }
                // Missing or unreadable candidates are skipped, same as
                // an absent file.
                Err(_) => {}
            }
        }
        Ok(Config::default())
    }

    /// The configured publication QoS as a transport-level value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidQos`] for values outside 0 through 2.
    pub fn publish_qos(&self) -> Result<QoS, ConfigError> {
        match self.mqtt.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other)),
        }
    }

    /// The configured log level, or `None` when the `logging` value is
    /// not recognized (callers fall back to debug so the problem stays
    /// visible).
    #[must_use]
    pub fn log_level(&self) -> Option<tracing::Level> {
        match self.defaults.logging.as_str() {
            "info" => Some(tracing::Level::INFO),
            "debug" => Some(tracing::Level::DEBUG),
            "warning" => Some(tracing::Level::WARN),
            "error" => Some(tracing::Level::ERROR),
            _ => None,
        }
    }

    /// The file this configuration came from, if one was found.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.defaults.logging, "info");
        assert_eq!(config.mqtt.qos, 2);
        assert_eq!(config.mqtt.broker, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert!(config.devices.is_empty());
        assert!(config.source.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let text = "\
Default:
  logging: debug
MQTT:
  MQTTQOS: 1
  MQTTBroker: broker.lan
  MQTTPort: 1884
Devices:
  porch_light: 17
  porch_light_default: true
";
        let config: Config = serde_yaml::from_str(text).unwrap();
        assert_eq!(config.defaults.logging, "debug");
        assert_eq!(config.mqtt.qos, 1);
        assert_eq!(config.mqtt.broker, "broker.lan");
        assert_eq!(config.mqtt.port, 1884);
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn partial_mqtt_section_keeps_other_defaults() {
        let config: Config = serde_yaml::from_str("MQTT:\n  MQTTBroker: broker.lan\n").unwrap();
        assert_eq!(config.mqtt.broker, "broker.lan");
        assert_eq!(config.mqtt.qos, 2);
        assert_eq!(config.mqtt.port, 1883);
    }

    #[test]
    fn publish_qos_levels() {
        let mut config = Config::default();
        config.mqtt.qos = 0;
        assert_eq!(config.publish_qos().unwrap(), QoS::AtMostOnce);
        config.mqtt.qos = 1;
        assert_eq!(config.publish_qos().unwrap(), QoS::AtLeastOnce);
        config.mqtt.qos = 2;
        assert_eq!(config.publish_qos().unwrap(), QoS::ExactlyOnce);
    }

    #[test]
    fn publish_qos_rejects_out_of_range() {
        let mut config = Config::default();
        config.mqtt.qos = 3;
        assert!(matches!(
            config.publish_qos(),
            Err(ConfigError::InvalidQos(3))
        ));
    }

    #[test]
    fn log_level_mapping() {
        let mut config = Config::default();
        for (name, level) in [
            ("info", tracing::Level::INFO),
            ("debug", tracing::Level::DEBUG),
            ("warning", tracing::Level::WARN),
            ("error", tracing::Level::ERROR),
        ] {
            config.defaults.logging = name.to_string();
            assert_eq!(config.log_level(), Some(level));
        }
    }

    #[test]
    fn unrecognized_log_level_is_none() {
        let mut config = Config::default();
        config.defaults.logging = "verbose".to_string();
        assert_eq!(config.log_level(), None);
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let result = serde_yaml::from_str::<Config>("MQTT: [not, a, map]");
        assert!(result.is_err());
    }
}
