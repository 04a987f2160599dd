// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic announcement scheduling.
//!
//! Each registered action carries its own interval and due time, and
//! [`Scheduler::run_pending`] evaluates them against a caller-supplied
//! instant. The run loop just feeds it the current time once per second;
//! tests feed it whatever clock they like.

use std::time::Duration;

use tokio::time::Instant;

/// Cadence for discovery re-announcements, recovering platforms that
/// restarted and lost their discovery state.
pub const CONFIG_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Cadence for state re-announcements, recovering platforms that missed
/// a state update.
pub const STATE_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(30);

/// Granularity of the due-task check.
const TICK: Duration = Duration::from_secs(1);

/// One periodic action with its own cadence.
struct Task {
    interval: Duration,
    next_due: Instant,
    action: Box<dyn FnMut() + Send>,
}

/// Runs registered actions on independent fixed cadences.
///
/// Tasks are evaluated one by one against the same instant, so a late or
/// slow task never shifts another task's schedule.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<Task>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Registers `action` to run every `interval`, first at
    /// `now + interval`.
    pub fn every<F>(&mut self, interval: Duration, now: Instant, action: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.tasks.push(Task {
            interval,
            next_due: now + interval,
            action: Box::new(action),
        });
    }

    /// Runs every task whose due time has been reached, rescheduling
    /// each relative to `now`.
    pub fn run_pending(&mut self, now: Instant) {
        for task in &mut self.tasks {
            if now >= task.next_due {
                (task.action)();
                task.next_due = now + task.interval;
            }
        }
    }

    /// Evaluates due tasks once per second, forever.
    pub async fn run(mut self) {
        loop {
            self.run_pending(Instant::now());
            tokio::time::sleep(TICK).await;
        }
    }
}
