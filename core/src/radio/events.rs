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

use crate::radio::tuner::RadioStation;
use crate::track::Track;

/// Lifecycle events emitted by the RadioController.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    TuningIn(RadioStation),

    /// The station reported its name.
    Tuned(String),

    /// Buffer fill level in percent.
    Buffering(u8),

    /// A track is loading. Null when the current source is not a pending radio track.
    Preparing(Track),

    /// A track started playing, stamped with the time it started.
    TrackStarted(Track),

    PlaybackEnded,

    PlaybackPaused,

    PlaybackResumed,
}
