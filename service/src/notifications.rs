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

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use scrobbler_core::{PlayerNotification, ScrobblePoint, SettingsError, SharedScrobblePoint, Track};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use url::Url;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Malformed notification: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid track url \"{url}\": {source}")]
    InvalidUrl { url: String, source: url::ParseError },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Track as sent by players. Missing metadata makes a null track.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireTrack {
    pub player_id: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl TryFrom<WireTrack> for Track {
    type Error = NotificationError;

    fn try_from(wire: WireTrack) -> Result<Self, Self::Error> {
        let mut track = Track::new(wire.player_id, wire.artist, wire.title)
            .with_duration(Duration::from_secs(wire.duration_secs));
        if let Some(album) = wire.album {
            track = track.with_album(album);
        }
        if let Some(url) = wire.url {
            let parsed = Url::parse(&url).map_err(|source| NotificationError::InvalidUrl { url, source })?;
            track = track.with_url(parsed);
        }
        Ok(track)
    }
}

/// One line of input, tagged by `"event"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WireNotification {
    PlayerConnected { player_id: String },
    PlayerDisconnected { player_id: String },
    PreparingTrack { track: WireTrack },
    TrackStarted { track: WireTrack },
    PlaybackEnded { player_id: String },
    PlaybackPaused { player_id: String },
    PlaybackStalled { player_id: String },
    PlaybackResumed { player_id: String },
    /// Changes the scrobble point for tracks started from now on.
    ScrobblePoint { percentage: u32 },
}

/// Decoded input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceInput {
    Player(PlayerNotification),
    ScrobblePoint(ScrobblePoint),
}

pub fn parse_notification(line: &str) -> Result<ServiceInput, NotificationError> {
    let wire: WireNotification = serde_json::from_str(line)?;
    let notification = match wire {
        WireNotification::PlayerConnected { player_id } => PlayerNotification::PlayerConnected(player_id),
        WireNotification::PlayerDisconnected { player_id } => PlayerNotification::PlayerDisconnected(player_id),
        WireNotification::PreparingTrack { track } => PlayerNotification::PreparingTrack(track.try_into()?),
        WireNotification::TrackStarted { track } => PlayerNotification::TrackStarted(track.try_into()?),
        WireNotification::PlaybackEnded { player_id } => PlayerNotification::PlaybackEnded(player_id),
        WireNotification::PlaybackPaused { player_id } => PlayerNotification::PlaybackPaused(player_id),
        WireNotification::PlaybackStalled { player_id } => PlayerNotification::PlaybackStalled(player_id),
        WireNotification::PlaybackResumed { player_id } => PlayerNotification::PlaybackResumed(player_id),
        WireNotification::ScrobblePoint { percentage } => {
            return Ok(ServiceInput::ScrobblePoint(ScrobblePoint::new(percentage)?));
        }
    };
    Ok(ServiceInput::Player(notification))
}

/// Reads notifications line by line and forwards them to the player manager.
///
/// Malformed lines are logged and skipped. Returns the number of forwarded notifications once the
/// input ends or the manager stops listening.
pub async fn forward_notifications<R>(reader: R,
                                      notifications: mpsc::Sender<PlayerNotification>,
                                      settings: Arc<SharedScrobblePoint>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_notification(line) {
            Ok(ServiceInput::Player(notification)) => {
                debug!("Received {:?}", notification);
                if notifications.send(notification).await.is_err() {
                    info!("Player manager is gone, no longer reading notifications");
                    break;
                }
                forwarded += 1;
            }
            Ok(ServiceInput::ScrobblePoint(point)) => {
                info!("Scrobble point set to {}%", point);
                settings.set(point);
            }
            Err(e) => warn!("Skipping input line: {}", e),
        }
    }
    Ok(forwarded)
}
