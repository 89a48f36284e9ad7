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

use std::fmt;

/// Represents the playback state of the player session tracked by the scrobbler.
///
/// Exactly one state is active at a time. `Stopped` means there is no session and therefore no
/// observed track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// No session is active.
    #[default]
    Stopped,
    /// The player is preparing a track, its info may not be available yet.
    Loading,
    /// A track is playing and its scrobble stopwatch is running.
    Playing,
    /// Playback is halted by the user and can be resumed.
    Paused,
    /// Playback is stuck without progress, distinct from loading or buffering.
    Stalled,
}

/// How an incoming track start affects the session in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrackStartRule {
    /// No session yet, one has to be started first.
    StartSession,
    /// The session exists but is not playing, it becomes playing again.
    Resume,
    /// The session is already playing.
    Continue,
}

impl PlaybackState {
    pub(crate) fn track_start_rule(self) -> TrackStartRule {
        match self {
            PlaybackState::Stopped => TrackStartRule::StartSession,
            PlaybackState::Loading | PlaybackState::Paused | PlaybackState::Stalled => TrackStartRule::Resume,
            PlaybackState::Playing => TrackStartRule::Continue,
        }
    }

    /// States a resume notification can leave.
    pub fn is_resumable(self) -> bool {
        matches!(self, PlaybackState::Paused | PlaybackState::Stalled)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Loading => "Loading",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Stalled => "Stalled",
        };
        f.write_str(name)
    }
}

/// Rating of a track, ordered by precedence.
///
/// A rating can only be upgraded: a loved track that reaches its scrobble point stays loved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackRating {
    #[default]
    Unrated,
    Scrobbled,
    Skipped,
    Loved,
    Banned,
}
