// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The switch entity: one GPIO line exposed as a Home Assistant MQTT
//! switch.
//!
//! Every switch derives three topics from its name:
//!
//! - `homeassistant/switch/<name>/config` - discovery announcement
//! - `<name>/state` - state announcements, `{"POWER": "ON"|"OFF"}`
//! - `<name>/cmnd` - inbound commands, raw `ON` or `OFF`
//!
//! Binding a switch is not inert: it immediately publishes the discovery
//! config, drives the line to the initial state and publishes that state.
//! From then on the switch changes state only through
//! [`Switch::handle_command`]; the announce operations are read-only and
//! safe to fire on any schedule.
//!
//! # Examples
//!
//! ```ignore
//! use pinbridge::gpio::PinBackend;
//! use pinbridge::switch::Switch;
//!
//! let output = PinBackend::detect().open(17)?;
//! let switch = Switch::bind("porch_light", output, publisher, qos, false);
//! switch.handle_command(b"ON");
//! assert!(switch.state());
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use rumqttc::QoS;
use serde::Serialize;

use crate::gpio::DigitalOutput;
use crate::transport::Publisher;

/// Home Assistant discovery prefix for switch entities.
const DISCOVERY_PREFIX: &str = "homeassistant/switch";

/// Template telling the platform how to read the power field out of the
/// state payload.
const VALUE_TEMPLATE: &str = "{{value_json.POWER}}";

/// Discovery announcement published on the config topic.
#[derive(Debug, Serialize)]
struct DiscoveryPayload<'a> {
    name: &'a str,
    state_topic: String,
    command_topic: String,
    val_tpl: &'a str,
}

/// State announcement published on the state topic.
#[derive(Debug, Serialize)]
struct StatePayload<'a> {
    #[serde(rename = "POWER")]
    power: &'a str,
}

/// One pin exposed as a switch entity.
pub struct Switch {
    name: String,
    qos: QoS,
    publisher: Arc<dyn Publisher>,
    inner: Mutex<Inner>,
}

/// Pin handle and state, locked together so a state change and its
/// announcement cannot interleave with a concurrent announce.
struct Inner {
    output: Box<dyn DigitalOutput>,
    state: bool,
}

impl Switch {
    /// Binds a switch to its output line and announces it.
    ///
    /// Publishes the discovery config, then drives the line to
    /// `initial_state` and publishes the matching state announcement, in
    /// that order. The line must already be acquired; acquisition
    /// failures belong to [`crate::gpio::PinBackend::open`].
    pub fn bind(
        name: impl Into<String>,
        output: Box<dyn DigitalOutput>,
        publisher: Arc<dyn Publisher>,
        qos: QoS,
        initial_state: bool,
    ) -> Arc<Self> {
        let name = name.into();
        tracing::info!(device = %name, pin = output.pin(), initial = initial_state, "binding switch");
        let switch = Arc::new(Self {
            name,
            qos,
            publisher,
            inner: Mutex::new(Inner {
                output,
                state: initial_state,
            }),
        });
        switch.announce_config();
        switch.set_state(initial_state);
        switch
    }

    /// Device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current in-memory state; `true` is ON.
    #[must_use]
    pub fn state(&self) -> bool {
        self.inner.lock().state
    }

    /// Topic for discovery announcements.
    #[must_use]
    pub fn config_topic(&self) -> String {
        format!("{DISCOVERY_PREFIX}/{}/config", self.name)
    }

    /// Topic for state announcements.
    #[must_use]
    pub fn state_topic(&self) -> String {
        format!("{}/state", self.name)
    }

    /// Topic this switch accepts commands on.
    #[must_use]
    pub fn command_topic(&self) -> String {
        format!("{}/cmnd", self.name)
    }

    /// Publishes the discovery announcement.
    ///
    /// Idempotent; fired at bind time and then periodically so a platform
    /// that restarted and lost its discovery state picks the switch up
    /// again.
    pub fn announce_config(&self) {
        let payload = DiscoveryPayload {
            name: &self.name,
            state_topic: self.state_topic(),
            command_topic: self.command_topic(),
            val_tpl: VALUE_TEMPLATE,
        };
        self.publish_json(&self.config_topic(), &payload);
    }

    /// Publishes the current state.
    ///
    /// Idempotent; fired after every state change and then periodically
    /// so a platform that missed an update converges again.
    pub fn announce_state(&self) {
        let inner = self.inner.lock();
        self.publish_state(inner.state);
    }

    /// Applies an inbound command payload.
    ///
    /// Only the exact byte sequences `ON` and `OFF` act on the switch;
    /// anything else is logged and dropped without touching the pin or
    /// publishing.
    pub fn handle_command(&self, payload: &[u8]) {
        match payload {
            b"ON" => self.set_state(true),
            b"OFF" => self.set_state(false),
            other => {
                tracing::warn!(
                    device = %self.name,
                    payload = %String::from_utf8_lossy(other),
                    "ignoring command, payload must be ON or OFF"
                );
            }
        }
    }

    /// Drives the pin, records the new state, and announces it, holding
    /// the lock across all three so announcements never carry a torn
    /// state.
    fn set_state(&self, on: bool) {
        let mut inner = self.inner.lock();
        if on {
            inner.output.drive_on();
        } else {
            inner.output.drive_off();
        }
        inner.state = on;
        self.publish_state(inner.state);
    }

    /// Publishes a state payload for `on`. Callers hold the inner lock.
    fn publish_state(&self, on: bool) {
        let payload = StatePayload {
            power: power_label(on),
        };
        self.publish_json(&self.state_topic(), &payload);
    }

    /// Serializes and enqueues one payload. Encoding and delivery
    /// failures are logged, never propagated: the pin has already moved
    /// by the time a publish can fail, and rolling it back would lie to
    /// the operator.
    fn publish_json<T: Serialize>(&self, topic: &str, payload: &T) {
        match serde_json::to_vec(payload) {
            Ok(bytes) => self.publisher.publish(topic, bytes, self.qos),
            Err(err) => {
                tracing::error!(device = %self.name, topic = %topic, error = %err, "failed to encode payload");
            }
        }
    }
}

/// Wire label for a state; exact inverse of the `POWER` field parse.
fn power_label(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}
