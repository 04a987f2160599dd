// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device registry: turns the raw `Devices` configuration section into
//! validated `(name, pin, default state)` entries.
//!
//! Keys ending in `_default` are initial-state overrides for the base
//! key, not devices of their own. Names are unique by construction
//! because the section is a key-value mapping.

use std::collections::BTreeMap;

use serde_yaml::Value;

use crate::error::ConfigError;

/// Key suffix marking an entry as a device's initial-state override.
const DEFAULT_STATE_SUFFIX: &str = "_default";

/// One configured device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Device name; doubles as the topic path segment.
    pub name: String,
    /// BCM pin number.
    pub pin: u8,
    /// State to drive and announce at startup.
    pub default_state: bool,
}

/// Parses the `Devices` section into registry entries.
///
/// # Errors
///
/// Returns an error when a pin value is not an integer, a `_default`
/// value is not a boolean, or a name cannot be used as a topic segment.
/// All of these abort startup: a misread device table means the wiring
/// assumptions are broken.
pub fn parse_devices(devices: &BTreeMap<String, Value>) -> Result<Vec<DeviceEntry>, ConfigError> {
    let mut entries = Vec::new();
    for (name, value) in devices {
        if name.ends_with(DEFAULT_STATE_SUFFIX) {
            continue;
        }
        if name.is_empty() || name.contains(['/', '+', '#']) {
            return Err(ConfigError::InvalidName(name.clone()));
        }
        let pin = parse_pin(name, value)?;
        let default_state = match devices.get(&format!("{name}{DEFAULT_STATE_SUFFIX}")) {
            Some(override_value) => parse_default(name, override_value)?,
            None => false,
        };
        entries.push(DeviceEntry {
            name: name.clone(),
            pin,
            default_state,
        });
    }
    Ok(entries)
}

fn parse_pin(name: &str, value: &Value) -> Result<u8, ConfigError> {
    let pin = match value {
        Value::Number(number) => number.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(text) => text.trim().parse::<u8>().ok(),
        _ => None,
    };
    pin.ok_or_else(|| ConfigError::InvalidPin {
        device: name.to_string(),
        value: describe(value),
    })
}

fn parse_default(name: &str, value: &Value) -> Result<bool, ConfigError> {
    let state = match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Some(true),
            "0" | "no" | "false" | "off" => Some(false),
            _ => None,
        },
        Value::Number(number) => match number.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    };
    state.ok_or_else(|| ConfigError::InvalidDefault {
        device: name.to_string(),
        value: describe(value),
    })
}

/// Renders a YAML scalar for error messages.
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        _ => "non-scalar value".to_string(),
    }
}
