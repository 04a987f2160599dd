// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport: connection with retry, subscriptions, fire-and-forget
//! publish, and inbound dispatch.
//!
//! The daemon holds one client for its whole life. Connection failures
//! never bubble into process exit: refused and unresolvable brokers are
//! retried forever on a fixed delay, which is the right trade for an
//! unattended box wired to real hardware. The one distinguished failure
//! is a broker that answers and then rejects the session; that is
//! escalated to the supervising loop instead of being retried blindly
//! here, because it usually means credentials or protocol configuration
//! need an operator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};

use crate::error::{Error, ProtocolError};
use crate::router::CommandRouter;

/// Delay between connection attempts, and after run-loop failures.
pub const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Broker keepalive interval.
const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Request-queue capacity, sized to absorb the announcement burst of a
/// full device set before the event loop is polled again.
const REQUEST_QUEUE_CAPACITY: usize = 256;

/// QoS for subscriptions. Publications use the configured QoS; inbound
/// commands are idempotent per payload, so redelivery adds nothing.
const SUBSCRIBE_QOS: QoS = QoS::AtMostOnce;

/// Broker diagnostic tree, subscribed for observability only.
const SYS_TOPIC_FILTER: &str = "$SYS/#";

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fire-and-forget message publication at a chosen QoS.
///
/// Delivery failures are logged by the implementation and never surface
/// to the caller; by the time a publish can fail, the pin it describes
/// has already moved.
pub trait Publisher: Send + Sync {
    /// Enqueues one message for publication.
    fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS);
}

/// Source of broker connection events.
///
/// Seam over the rumqttc event loop so the retry policy can be exercised
/// against scripted connections.
#[allow(async_fn_in_trait)]
pub(crate) trait Connection {
    /// Next event from the broker connection.
    async fn poll(&mut self) -> Result<Event, ConnectionError>;
}

impl Connection for EventLoop {
    async fn poll(&mut self) -> Result<Event, ConnectionError> {
        EventLoop::poll(self).await
    }
}

/// The daemon's MQTT client.
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    /// Creates the client and its event loop.
    ///
    /// Nothing connects yet; the connection is established by polling
    /// the returned event loop, normally through [`connect_with_retry`]
    /// and then [`MqttTransport::run`].
    #[must_use]
    pub fn new(broker: &str, port: u16) -> (Self, EventLoop) {
        let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("pinbridge_{}_{}", std::process::id(), counter);

        let mut options = MqttOptions::new(client_id, broker, port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);

        let (client, event_loop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        (Self { client }, event_loop)
    }

    /// Subscribes to the diagnostic tree and every command topic.
    ///
    /// Sessions are clean, so this runs once at startup and again on
    /// every reconnect.
    ///
    /// # Errors
    ///
    /// Returns an error when a subscription cannot be handed to the
    /// event loop.
    pub async fn subscribe_all(&self, router: &CommandRouter) -> Result<(), Error> {
        self.client
            .subscribe(SYS_TOPIC_FILTER, SUBSCRIBE_QOS)
            .await
            .map_err(ProtocolError::Mqtt)?;
        for topic in router.command_topics() {
            tracing::debug!(topic = %topic, "subscribing to command topic");
            self.client
                .subscribe(topic, SUBSCRIBE_QOS)
                .await
                .map_err(ProtocolError::Mqtt)?;
        }
        Ok(())
    }

    /// Drives the event loop: renews subscriptions whenever a session is
    /// established and routes inbound publishes to `router`.
    ///
    /// Network-level failures are logged and retried in place after
    /// [`RETRY_DELAY`]. Returns only when the broker rejects the session
    /// outright, so the supervising loop can apply its own pause.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ConnectionRejected`] on a rejected
    /// acknowledgement, or a subscription error after reconnect.
    pub async fn run(
        &self,
        connection: &mut EventLoop,
        router: &CommandRouter,
    ) -> Result<(), Error> {
        self.subscribe_all(router).await?;
        loop {
            match connection.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::info!(
                        session_present = ack.session_present,
                        "session established, renewing subscriptions"
                    );
                    self.subscribe_all(router).await?;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    router.dispatch(&publish.topic, &publish.payload);
                }
                Ok(_) => {}
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(ProtocolError::ConnectionRejected(code).into());
                }
                Err(err) => {
                    log_connection_failure(&err);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
}

impl Publisher for MqttTransport {
    fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) {
        if let Err(err) = self.client.try_publish(topic, qos, false, payload) {
            tracing::warn!(topic = %topic, error = %err, "failed to enqueue publish");
        }
    }
}

/// Polls `connection` until the broker accepts a session.
///
/// Refused and unresolvable brokers are retried forever at
/// [`RETRY_DELAY`]; a rejected acknowledgement is returned to the caller
/// instead.
///
/// # Errors
///
/// Returns [`ProtocolError::ConnectionRejected`] when the broker answers
/// the handshake with a failure reason.
pub(crate) async fn connect_with_retry<C: Connection>(connection: &mut C) -> Result<(), Error> {
    loop {
        match connection.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!(
                    session_present = ack.session_present,
                    "connected to broker"
                );
                return Ok(());
            }
            Ok(event) => {
                tracing::debug!(?event, "event before session establishment");
            }
            Err(ConnectionError::ConnectionRefused(code)) => {
                return Err(ProtocolError::ConnectionRejected(code).into());
            }
            Err(err) => {
                log_connection_failure(&err);
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

/// Logs one failed connection attempt. Plain refusal is routine on a
/// box that boots faster than its broker, so it stays at info; anything
/// else (resolution failures included) is an error worth noticing.
fn log_connection_failure(err: &ConnectionError) {
    match err {
        ConnectionError::Io(io_err) if io_err.kind() == std::io::ErrorKind::ConnectionRefused => {
            tracing::info!(
                error = %io_err,
                retry_secs = RETRY_DELAY.as_secs(),
                "broker refused connection, will retry"
            );
        }
        other => {
            tracing::error!(
                error = %other,
                retry_secs = RETRY_DELAY.as_secs(),
                "connection attempt failed, will retry"
            );
        }
    }
}
