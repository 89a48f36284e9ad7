// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod cli;
mod listener;
mod notifications;

use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use scrobbler_core::{run_player_event_listener, PlayerManager, SharedScrobblePoint};
use tokio::io::BufReader;
use tokio::select;
use tokio::sync::mpsc;

use crate::cli::Cli;
use crate::listener::LoggingEventListener;
use crate::notifications::forward_notifications;

const NOTIFICATION_QUEUE_SIZE: usize = 64;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level.to_level_filter())
        .parse_default_env()
        .init();

    info!("Starting scrobbler service, log level {}, scrobble point {}%", cli.log_level, cli.scrobble_point);

    let settings = Arc::new(SharedScrobblePoint::new(cli.scrobble_point));
    let manager = PlayerManager::new(settings.clone());
    let listener_handle = run_player_event_listener(manager.subscribe(), LoggingEventListener::new());

    let (notification_tx, notification_rx) = mpsc::channel(NOTIFICATION_QUEUE_SIZE);
    let manager_handle = manager.run(notification_rx);

    let input = BufReader::new(tokio::io::stdin());
    select! {
        result = forward_notifications(input, notification_tx, settings) => {
            match result {
                Ok(forwarded) => info!("Input closed after {} notifications", forwarded),
                Err(e) => error!("Failed to read notifications: {}", e),
            }
            manager_handle.await_join().await?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            manager_handle.shutdown().await?;
        }
    }

    // the listener drains the remaining events and stops once the manager is gone
    listener_handle.await_join().await?;
    info!("Scrobbler service stopped");
    Ok(())
}
