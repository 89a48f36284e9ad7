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
use std::time::{Duration, SystemTime};

use url::Url;

use crate::definitions::TrackRating;

/// Identifier a player reports itself with.
pub type PlayerId = String;

/// Track as reported by a player or delivered by a radio tuner.
///
/// A track without artist, title and location is a "null" track, used by players to announce
/// that something is being prepared before its metadata is known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub player_id: PlayerId,
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub duration: Duration,
    pub url: Option<Url>,
    pub rating: TrackRating,
    /// When playback of the track started.
    pub timestamp: Option<SystemTime>,
}

impl Track {
    pub fn new(player_id: impl Into<PlayerId>, artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            artist: artist.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Null track announced by `player_id`.
    pub fn null(player_id: impl Into<PlayerId>) -> Self {
        Self {
            player_id: player_id.into(),
            ..Default::default()
        }
    }

    pub fn is_null(&self) -> bool {
        self.artist.is_empty() && self.title.is_empty() && self.url.is_none()
    }

    /// Raises the rating, lower ratings never replace a higher one.
    pub fn upgrade_rating(&mut self, rating: TrackRating) {
        if rating > self.rating {
            self.rating = rating;
        }
    }

    /// Marks the track as started now.
    pub fn stamp(&mut self) {
        self.timestamp = Some(SystemTime::now());
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("<null track>");
        }
        match (&self.url, self.artist.is_empty() && self.title.is_empty()) {
            (Some(url), true) => write!(f, "{}", url),
            _ => write!(f, "{} - {}", self.artist, self.title),
        }
    }
}
