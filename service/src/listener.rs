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
use log::info;
use scrobbler_core::{PlayerEvent, PlayerEventListener};

/// Writes every lifecycle event to the log.
pub struct LoggingEventListener;

impl LoggingEventListener {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LoggingEventListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayerEventListener for LoggingEventListener {
    async fn on_event(&self, event: PlayerEvent) {
        info!("{}", describe(&event));
    }
}

fn describe(event: &PlayerEvent) -> String {
    match event {
        PlayerEvent::SessionStarted(id) => format!("Session started by {}", id),
        PlayerEvent::PreparingTrack(track) => format!("Preparing {}", track),
        PlayerEvent::TrackStarted(track) => format!("Now playing {} ({}s)", track, track.duration.as_secs()),
        PlayerEvent::TrackEnded(track) => format!("Finished {} [{:?}]", track, track.rating),
        PlayerEvent::SessionEnded => "Session ended".to_string(),
        PlayerEvent::Paused(track) => format!("Paused {}", track),
        PlayerEvent::Stalled(track) => format!("Stalled on {}", track),
        PlayerEvent::Resumed(track) => format!("Resumed {}", track),
        PlayerEvent::PlayerConnected(id) => format!("Player {} connected", id),
        PlayerEvent::PlayerDisconnected(id) => format!("Player {} disconnected", id),
        PlayerEvent::ScrobblePointReached(track) => format!("Scrobble point reached for {}", track),
    }
}
