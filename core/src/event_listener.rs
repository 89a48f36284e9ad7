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

use async_trait::async_trait;
use log::{info, warn};
use tokio::select;
use tokio::sync::broadcast;

use crate::player_events::PlayerEvent;
use crate::service::{spawn_service, ServiceHandle};

/// Consumer of the lifecycle events, e.g. scrobble submission.
#[async_trait]
pub trait PlayerEventListener: Send + Sync + 'static {
    async fn on_event(&self, event: PlayerEvent);
}

pub struct NoopPlayerEventListener;

#[async_trait]
impl PlayerEventListener for NoopPlayerEventListener {
    async fn on_event(&self, _event: PlayerEvent) {}
}

impl NoopPlayerEventListener {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NoopPlayerEventListener {
    fn default() -> Self {
        Self::new()
    }
}

/// Feeds events from the PlayerManager to a listener, one at a time, until shutdown or until the
/// manager goes away.
pub fn run_player_event_listener(mut events: broadcast::Receiver<PlayerEvent>,
                                 listener: impl PlayerEventListener) -> ServiceHandle
{
    spawn_service(move |mut stop| async move {
        loop {
            select! {
                biased;
                _ = stop.signaled() => {
                    info!("Player event listener shutdown requested");
                    break;
                }
                recv_res = events.recv() => {
                    match recv_res {
                        Ok(event) => listener.on_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("PlayerEvent lagged by {} messages; catching up", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("PlayerEvent channel closed; stopping listener");
                            break;
                        }
                    }
                }
            }
        }
    })
}
