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

use crate::track::{PlayerId, Track};

/// Raw notifications sent by a connected player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerNotification {
    /// The player connected to the scrobbler.
    PlayerConnected(PlayerId),
    /// The player went away, possibly without ending its session.
    PlayerDisconnected(PlayerId),
    /// The player is loading a track, its metadata may still be unknown.
    PreparingTrack(Track),
    /// A track started playing.
    TrackStarted(Track),
    /// Playback ended, the session is over.
    PlaybackEnded(PlayerId),
    PlaybackPaused(PlayerId),
    /// Playback got stuck without progress.
    PlaybackStalled(PlayerId),
    PlaybackResumed(PlayerId),
}

/// Normalized lifecycle events emitted by the PlayerManager.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A playback session started for the given player.
    SessionStarted(PlayerId),

    /// A track is being prepared. The track may be null if the player has no metadata yet.
    PreparingTrack(Track),

    /// A track started playing and its scrobble stopwatch is running.
    TrackStarted(Track),

    /// The observed track is no longer played.
    TrackEnded(Track),

    /// The playback session is over.
    SessionEnded,

    Paused(Track),

    Stalled(Track),

    Resumed(Track),

    PlayerConnected(PlayerId),

    PlayerDisconnected(PlayerId),

    /// The track has been played long enough to be scrobbled.
    ScrobblePointReached(Track),
}
