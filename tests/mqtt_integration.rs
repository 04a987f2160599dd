// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the daemon against a mockforge-mqtt broker.

use std::time::Duration;

use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use pinbridge::daemon;
use pinbridge::{Config, ConfigError, Error, PinBackend};
use tokio::time::sleep;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18900);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to start, bind to port, and be ready to accept connections
    sleep(Duration::from_millis(500)).await;
}

/// Builds a configuration pointing at the local test broker.
fn test_config(port: u16, devices: &str) -> Config {
    let text = format!(
        "\
MQTT:
  MQTTQOS: 1
  MQTTBroker: 127.0.0.1
  MQTTPort: {port}
{devices}"
    );
    serde_yaml::from_str(&text).expect("test configuration parses")
}

// ============================================================================
// Daemon Startup Tests
// ============================================================================

mod daemon_startup {
    use super::*;

    #[tokio::test]
    async fn announces_devices_and_stays_connected() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let config = test_config(
            port,
            "\
Devices:
  porch: 4
  porch_default: true
  shed: 17
",
        );

        let handle =
            tokio::spawn(async move { daemon::run(&config, PinBackend::Simulated).await });
        sleep(Duration::from_secs(1)).await;

        if handle.is_finished() {
            let result = handle.await.expect("daemon task panicked");
            panic!("daemon exited during startup: {result:?}");
        }
        handle.abort();
    }

    #[tokio::test]
    async fn keeps_retrying_when_no_broker_listens() {
        // Deliberately no broker on this port. The first connection
        // attempt is refused and the daemon waits out its retry delay
        // instead of exiting.
        let port = get_test_port();
        let config = test_config(port, "Devices:\n  porch: 4\n");

        let handle =
            tokio::spawn(async move { daemon::run(&config, PinBackend::Simulated).await });
        sleep(Duration::from_millis(500)).await;

        if handle.is_finished() {
            let result = handle.await.expect("daemon task panicked");
            panic!("daemon exited instead of retrying: {result:?}");
        }
        handle.abort();
    }
}

// ============================================================================
// Configuration Rejection Tests
// ============================================================================

mod configuration_rejection {
    use super::*;

    #[tokio::test]
    async fn non_integer_pin_aborts_startup() {
        let config = test_config(1883, "Devices:\n  porch: kitchen\n");

        let result = daemon::run(&config, PinBackend::Simulated).await;

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidPin { .. }))
        ));
    }

    #[tokio::test]
    async fn out_of_range_qos_aborts_startup() {
        let config: Config = serde_yaml::from_str("MQTT:\n  MQTTQOS: 7\nDevices:\n  porch: 4\n")
            .expect("test configuration parses");

        let result = daemon::run(&config, PinBackend::Simulated).await;

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidQos(7)))
        ));
    }

    #[tokio::test]
    async fn topic_syntax_in_device_name_aborts_startup() {
        let config = test_config(1883, "Devices:\n  bad/name: 4\n");

        let result = daemon::run(&config, PinBackend::Simulated).await;

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidName(_)))
        ));
    }
}

// ============================================================================
// Command Round-Trip Tests
// ============================================================================
//
// NOTE: The mockforge-mqtt broker does not forward publications between
// clients, so ON/OFF commands cannot be exercised end to end against it.
// The command path is covered by unit tests instead:
//   - src/router.rs (command topic matching)
//   - src/switch.rs (payload handling, pin drive, state announcements)
//   - src/transport.rs (connection retry and re-subscription)
//
// For a full round trip, point the configuration this file builds at a
// real broker such as Mosquitto.
