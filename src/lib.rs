// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! pinbridge - expose GPIO pins as Home Assistant MQTT switches.
//!
//! Each configured pin becomes a `switch` entity through Home Assistant's
//! MQTT discovery protocol. The daemon announces every switch at startup,
//! reacts to commands, and keeps re-announcing on a fixed schedule so a
//! platform or broker restart heals on its own.
//!
//! # Topics
//!
//! Per device `name`:
//!
//! - `homeassistant/switch/<name>/config` - published discovery payload
//! - `<name>/state` - published `{"POWER": "ON"|"OFF"}`
//! - `<name>/cmnd` - subscribed, expects raw `ON` or `OFF`
//! - `$SYS/#` - subscribed for broker diagnostics
//!
//! # Configuration
//!
//! ```yaml
//! MQTT:
//!   MQTTBroker: broker.lan
//! Devices:
//!   porch_light: 17
//!   porch_light_default: true
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use pinbridge::config::Config;
//! use pinbridge::gpio::PinBackend;
//!
//! #[tokio::main]
//! async fn main() -> pinbridge::Result<()> {
//!     let config = Config::load()?;
//!     pinbridge::daemon::run(&config, PinBackend::detect()).await
//! }
//! ```
//!
//! On hosts that are not a Raspberry Pi the pins are simulated, so the
//! whole bridge can be exercised against a broker on any machine.

pub mod config;
pub mod daemon;
pub mod error;
pub mod gpio;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod switch;
mod transport;

pub use config::Config;
pub use error::{ConfigError, Error, PinError, ProtocolError, Result};
pub use gpio::{DigitalOutput, PinBackend};
pub use registry::DeviceEntry;
pub use router::CommandRouter;
pub use scheduler::Scheduler;
pub use switch::Switch;
pub use transport::{MqttTransport, Publisher};
