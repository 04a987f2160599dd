// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routes inbound command messages to the owning switch.

use std::sync::Arc;

use crate::switch::Switch;

/// Topic prefix of broker-internal diagnostics; subscribed for
/// observability but never routed to a switch.
const SYS_TOPIC_PREFIX: &str = "$SYS";

/// Demultiplexes inbound `(topic, payload)` pairs onto the switch set.
///
/// Built once at startup with every registered switch. Matching is an
/// exact comparison against each switch's command topic; names are
/// unique, so at most one switch matches, but the scan does not rely on
/// that.
pub struct CommandRouter {
    switches: Vec<Arc<Switch>>,
}

impl CommandRouter {
    /// Creates a router over the full switch set.
    #[must_use]
    pub fn new(switches: Vec<Arc<Switch>>) -> Self {
        Self { switches }
    }

    /// Topic filters the transport subscribes to for command delivery,
    /// one per switch.
    #[must_use]
    pub fn command_topics(&self) -> Vec<String> {
        self.switches
            .iter()
            .map(|switch| switch.command_topic())
            .collect()
    }

    /// Delivers `payload` to the switch whose command topic equals
    /// `topic`.
    ///
    /// Messages matching no switch are logged and dropped, except the
    /// broker's own `$SYS` tree, which is expected traffic.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) {
        let mut matched = false;
        for switch in &self.switches {
            if switch.command_topic() == topic {
                tracing::info!(
                    device = %switch.name(),
                    payload = %String::from_utf8_lossy(payload),
                    "command received"
                );
                switch.handle_command(payload);
                matched = true;
            }
        }
        if !matched && !topic.starts_with(SYS_TOPIC_PREFIX) {
            tracing::info!(
                topic = %topic,
                payload = %String::from_utf8_lossy(payload),
                "command for unknown device"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::SimulatedOutput;
    use crate::transport::Publisher;
    use rumqttc::QoS;

    /// Publisher that drops everything; these tests observe switch state.
    struct NullPublisher;

    impl Publisher for NullPublisher {
        fn publish(&self, _topic: &str, _payload: Vec<u8>, _qos: QoS) {}
    }

    fn switch_on_pin(name: &str, pin: u8) -> Arc<Switch> {
        Switch::bind(
            name,
            Box::new(SimulatedOutput::new(pin)),
            Arc::new(NullPublisher),
            QoS::AtMostOnce,
            false,
        )
    }

    #[test]
    fn dispatch_reaches_only_the_matching_switch() {
        let a = switch_on_pin("a", 4);
        let b = switch_on_pin("b", 17);
        let router = CommandRouter::new(vec![Arc::clone(&a), Arc::clone(&b)]);

        router.dispatch("a/cmnd", b"ON");

        assert!(a.state());
        assert!(!b.state());
    }

    #[test]
    fn unknown_topic_changes_nothing() {
        let a = switch_on_pin("a", 4);
        let b = switch_on_pin("b", 17);
        let router = CommandRouter::new(vec![Arc::clone(&a), Arc::clone(&b)]);

        router.dispatch("unknown/cmnd", b"ON");

        assert!(!a.state());
        assert!(!b.state());
    }

    #[test]
    fn sys_topics_are_ignored() {
        let a = switch_on_pin("a", 4);
        let router = CommandRouter::new(vec![Arc::clone(&a)]);

        router.dispatch("$SYS/broker/uptime", b"12345 seconds");

        assert!(!a.state());
    }

    #[test]
    fn match_is_exact_not_prefix() {
        let a = switch_on_pin("a", 4);
        let router = CommandRouter::new(vec![Arc::clone(&a)]);

        router.dispatch("a/cmnd/extra", b"ON");
        router.dispatch("a/state", b"ON");

        assert!(!a.state());
    }

    #[test]
    fn command_topics_cover_every_switch() {
        let router = CommandRouter::new(vec![switch_on_pin("a", 4), switch_on_pin("b", 17)]);
        assert_eq!(router.command_topics(), vec!["a/cmnd", "b/cmnd"]);
    }

    #[test]
    fn empty_router_drops_everything() {
        let router = CommandRouter::new(Vec::new());
        router.dispatch("anything/cmnd", b"ON");
        assert!(router.command_topics().is_empty());
    }
}
