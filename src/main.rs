// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! pinbridge daemon entry point.

use std::process::ExitCode;

use pinbridge::config::Config;
use pinbridge::daemon;
use pinbridge::gpio::PinBackend;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("pinbridge: {err}");
            return ExitCode::FAILURE;
        }
    };

    let level = config.log_level().unwrap_or(tracing::Level::DEBUG);
    tracing_subscriber::fmt().with_max_level(level).init();
    if config.log_level().is_none() {
        tracing::debug!(
            value = %config.defaults.logging,
            "unrecognized logging level, using debug"
        );
    }
    match config.source() {
        Some(path) => tracing::info!(path = %path.display(), "loaded configuration"),
        None => tracing::info!("no configuration file found, using defaults"),
    }

    let backend = PinBackend::detect();

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("exiting on interrupt");
            Ok(())
        }
        result = daemon::run(&config, backend) => result,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "startup failed");
            ExitCode::FAILURE
        }
    }
}
