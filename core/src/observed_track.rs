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

use crate::stopwatch::Stopwatch;
use crate::track::Track;

/// Track currently followed by the player manager, together with its scrobble stopwatch.
///
/// The default value holds a null track and stands for "nothing observed". The stopwatch is owned
/// exclusively: replacing or dropping the observed track cancels it.
#[derive(Debug, Default)]
pub struct ObservedTrack {
    track: Track,
    watch: Option<Stopwatch>,
}

impl ObservedTrack {
    /// Observes a track that is not timed yet, e.g. while it is being prepared.
    pub fn new(track: Track) -> Self {
        Self { track, watch: None }
    }

    pub fn with_watch(track: Track, watch: Stopwatch) -> Self {
        Self { track, watch: Some(watch) }
    }

    pub fn is_null(&self) -> bool {
        self.track.is_null()
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn track_mut(&mut self) -> &mut Track {
        &mut self.track
    }

    pub fn watch(&self) -> Option<&Stopwatch> {
        self.watch.as_ref()
    }

    /// Stopwatch of a non-null track, the only one pause and resume may act on.
    pub fn active_watch_mut(&mut self) -> Option<&mut Stopwatch> {
        if self.track.is_null() {
            return None;
        }
        self.watch.as_mut()
    }

    /// Releases the stopwatch and hands back the track.
    pub fn into_track(self) -> Track {
        self.track
    }
}
