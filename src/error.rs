// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the pinbridge daemon.
//!
//! Failures fall into three categories: configuration problems (always
//! fatal, raised before the run loop starts), GPIO pin acquisition, and
//! broker protocol errors. Transient broker failures are handled inside
//! the run loop and never surface through these types; what does surface
//! here is either a startup abort or a rejected connection
//! acknowledgement that the run loop logs and retries.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The startup configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A GPIO pin could not be acquired.
    #[error("pin error: {0}")]
    Pin(#[from] PinError),

    /// Broker communication failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors raised while loading and validating the configuration.
///
/// Every variant aborts startup: a broken device table means the
/// physical wiring assumptions no longer hold, and running with a
/// guessed pin assignment could actuate the wrong hardware.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but is not valid YAML.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path of the file that failed to parse.
        path: PathBuf,
        /// The underlying YAML error.
        source: serde_yaml::Error,
    },

    /// A device entry's pin value is not an integer pin number.
    #[error("device {device:?} has invalid pin number {value:?}")]
    InvalidPin {
        /// The device the entry belongs to.
        device: String,
        /// The value that failed to parse.
        value: String,
    },

    /// A device's `_default` entry is not a recognizable boolean.
    #[error("device {device:?} has invalid default state {value:?}")]
    InvalidDefault {
        /// The device the entry belongs to.
        device: String,
        /// The value that failed to parse.
        value: String,
    },

    /// A device name is empty or contains MQTT topic syntax.
    ///
    /// Names become topic path segments, so `/`, `+` and `#` would
    /// silently corrupt the derived topics.
    #[error("device name {0:?} is not usable as a topic segment")]
    InvalidName(String),

    /// The configured QoS is outside the valid range.
    #[error("QoS {0} is out of range [0, 2]")]
    InvalidQos(u8),
}

/// Errors raised while reserving GPIO lines as outputs.
#[derive(Debug, Error)]
pub enum PinError {
    /// The GPIO peripheral itself could not be opened.
    #[error("GPIO peripheral unavailable: {0}")]
    Peripheral(#[source] rppal::gpio::Error),

    /// A specific pin could not be reserved as an output.
    #[error("failed to acquire pin {pin}: {source}")]
    Acquire {
        /// BCM number of the pin.
        pin: u8,
        /// The underlying GPIO error.
        source: rppal::gpio::Error,
    },
}

/// Errors raised by the MQTT transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A client request could not be handed to the event loop.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The broker acknowledged the connection with a failure reason.
    ///
    /// Distinct from a network-level refusal: the broker was reachable
    /// and answered, but turned the session down (bad credentials,
    /// unacceptable protocol version, ...).
    #[error("broker rejected connection: {0:?}")]
    ConnectionRejected(rumqttc::ConnectReturnCode),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidPin {
            device: "porch".to_string(),
            value: "four".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "device \"porch\" has invalid pin number \"four\""
        );
    }

    #[test]
    fn qos_error_display() {
        let err = ConfigError::InvalidQos(3);
        assert_eq!(err.to_string(), "QoS 3 is out of range [0, 2]");
    }

    #[test]
    fn error_from_config_error() {
        let config_err = ConfigError::InvalidName("a/b".to_string());
        let err: Error = config_err.into();
        assert!(matches!(err, Error::Config(ConfigError::InvalidName(_))));
    }

    #[test]
    fn pin_error_display() {
        let err = PinError::Acquire {
            pin: 4,
            source: rppal::gpio::Error::PinNotAvailable(4),
        };
        assert!(err.to_string().starts_with("failed to acquire pin 4"));
    }

    #[test]
    fn rejected_connection_display() {
        let err = ProtocolError::ConnectionRejected(rumqttc::ConnectReturnCode::NotAuthorized);
        assert_eq!(err.to_string(), "broker rejected connection: NotAuthorized");
    }
}
