// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process orchestration: connect, announce, run.
//!
//! The process moves through a fixed sequence. It connects (retrying
//! forever), binds every configured device to a switch (which announces
//! it), then services inbound commands and periodic announcements side
//! by side. Errors after startup are logged and absorbed with a pause;
//! only startup problems and pin acquisition abort.

use std::sync::Arc;

use tokio::time::Instant;

use crate::config::Config;
use crate::error::Result;
use crate::gpio::PinBackend;
use crate::registry;
use crate::router::CommandRouter;
use crate::scheduler::{CONFIG_ANNOUNCE_INTERVAL, STATE_ANNOUNCE_INTERVAL, Scheduler};
use crate::switch::Switch;
use crate::transport::{self, MqttTransport, Publisher, RETRY_DELAY};

/// Runs the bridge until the caller drops the future (normally on an
/// interrupt signal).
///
/// # Errors
///
/// Returns an error only for startup problems: an invalid device table
/// or QoS, or a pin that cannot be acquired. Everything after that is
/// retried in place, forever.
pub async fn run(config: &Config, backend: PinBackend) -> Result<()> {
    let entries = registry::parse_devices(&config.devices)?;
    let qos = config.publish_qos()?;

    let (transport, mut connection) = MqttTransport::new(&config.mqtt.broker, config.mqtt.port);
    let transport = Arc::new(transport);

    tracing::info!(
        broker = %config.mqtt.broker,
        port = config.mqtt.port,
        devices = entries.len(),
        "connecting to broker"
    );
    loop {
        match transport::connect_with_retry(&mut connection).await {
            Ok(()) => break,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    retry_secs = RETRY_DELAY.as_secs(),
                    "connection rejected, will retry"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }

    let publisher: Arc<dyn Publisher> = Arc::clone(&transport) as Arc<dyn Publisher>;
    let mut switches = Vec::with_capacity(entries.len());
    for entry in &entries {
        let output = backend.open(entry.pin)?;
        switches.push(Switch::bind(
            entry.name.clone(),
            output,
            Arc::clone(&publisher),
            qos,
            entry.default_state,
        ));
    }

    let router = CommandRouter::new(switches.clone());

    let mut scheduler = Scheduler::new();
    let registered_at = Instant::now();
    for switch in &switches {
        let for_config = Arc::clone(switch);
        scheduler.every(CONFIG_ANNOUNCE_INTERVAL, registered_at, move || {
            for_config.announce_config();
        });
        let for_state = Arc::clone(switch);
        scheduler.every(STATE_ANNOUNCE_INTERVAL, registered_at, move || {
            for_state.announce_state();
        });
    }
    tokio::spawn(scheduler.run());

    loop {
        if let Err(err) = transport.run(&mut connection, &router).await {
            tracing::error!(
                error = %err,
                retry_secs = RETRY_DELAY.as_secs(),
                "run loop failed, pausing before resuming"
            );
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
}
