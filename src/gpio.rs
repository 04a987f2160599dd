// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GPIO output backends.
//!
//! A switch drives its pin through the [`DigitalOutput`] trait and never
//! sees the concrete driver. Two drivers exist: the Raspberry Pi GPIO
//! peripheral for real hardware, and an in-memory simulation for every
//! other host. [`PinBackend::detect`] picks one at startup so the same
//! binary runs on a Pi and on a development machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rppal::gpio::{Gpio, OutputPin};
use rppal::system::DeviceInfo;

use crate::error::PinError;

/// A binary output line owned by exactly one switch.
///
/// Level writes are infallible: acquiring the line is the only operation
/// that can fail, and that happens in [`PinBackend::open`] before a
/// switch ever holds the output.
pub trait DigitalOutput: Send {
    /// Drives the line to its active level.
    fn drive_on(&mut self);

    /// Drives the line to its inactive level.
    fn drive_off(&mut self);

    /// BCM number of the line.
    fn pin(&self) -> u8;
}

/// Pin driver selection, made once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinBackend {
    /// Drive physical lines through the Raspberry Pi GPIO peripheral.
    Hardware,
    /// Keep line levels in memory only.
    Simulated,
}

impl PinBackend {
    /// Picks the driver for the current host.
    ///
    /// Hosts that are not a recognizable Raspberry Pi get the simulated
    /// driver, so the daemon can run (and be tested) anywhere.
    #[must_use]
    pub fn detect() -> Self {
        match DeviceInfo::new() {
            Ok(device) => {
                tracing::info!(model = %device.model(), "detected Raspberry Pi, driving physical pins");
                PinBackend::Hardware
            }
            Err(_) => {
                tracing::info!("not running on a Raspberry Pi, using simulated pins");
                PinBackend::Simulated
            }
        }
    }

    /// Reserves `pin` as an output line.
    ///
    /// # Errors
    ///
    /// Returns an error when the GPIO peripheral cannot be opened or the
    /// pin cannot be reserved. Both abort startup: a switch without its
    /// pin must never come up half-initialized.
    pub fn open(self, pin: u8) -> Result<Box<dyn DigitalOutput>, PinError> {
        match self {
            PinBackend::Hardware => Ok(Box::new(HardwareOutput::acquire(pin)?)),
            PinBackend::Simulated => Ok(Box::new(SimulatedOutput::new(pin))),
        }
    }
}

/// Output line on the Raspberry Pi GPIO peripheral.
///
/// The line starts low and reverts to an input when dropped.
struct HardwareOutput {
    number: u8,
    line: OutputPin,
}

impl HardwareOutput {
    fn acquire(number: u8) -> Result<Self, PinError> {
        let gpio = Gpio::new().map_err(PinError::Peripheral)?;
        let line = gpio
            .get(number)
            .map_err(|source| PinError::Acquire {
                pin: number,
                source,
            })?
            .into_output_low();
        Ok(Self { number, line })
    }
}

impl DigitalOutput for HardwareOutput {
    fn drive_on(&mut self) {
        self.line.set_high();
    }

    fn drive_off(&mut self) {
        self.line.set_low();
    }

    fn pin(&self) -> u8 {
        self.number
    }
}

/// In-memory output line for hosts without GPIO hardware.
///
/// Simulated lines are active-low, like the relay boards this daemon
/// usually drives: `drive_on` pulls the level low. The inversion stays
/// inside the driver; callers observe the same on/off behavior as on
/// real hardware.
pub struct SimulatedOutput {
    number: u8,
    level: Arc<AtomicBool>,
}

impl SimulatedOutput {
    /// Creates a line with the level high (inactive).
    #[must_use]
    pub fn new(number: u8) -> Self {
        Self {
            number,
            level: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shared view of the simulated level; `true` is high (inactive).
    #[must_use]
    pub fn level_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.level)
    }
}

impl DigitalOutput for SimulatedOutput {
    fn drive_on(&mut self) {
        self.level.store(false, Ordering::Relaxed);
        tracing::debug!(pin = self.number, "simulated pin driven low (active)");
    }

    fn drive_off(&mut self) {
        self.level.store(true, Ordering::Relaxed);
        tracing::debug!(pin = self.number, "simulated pin driven high (inactive)");
    }

    fn pin(&self) -> u8 {
        self.number
    }
}
