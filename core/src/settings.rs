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
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use thiserror::Error;

/// Error type for scrobbler settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Scrobble point must be a percentage of the track duration
    #[error("Scrobble point {0}% is out of range 0-100")]
    ScrobblePointOutOfRange(u32),

    /// Scrobble point is not a number
    #[error("Invalid scrobble point \"{0}\"")]
    InvalidScrobblePoint(String),
}

/// Source of the settings read by the player manager.
///
/// The value is read every time a track starts, so implementations may change it at runtime.
pub trait ScrobbleSettings: Send + Sync {
    /// Percentage of the track duration after which the track counts as scrobbled.
    fn scrobble_percentage(&self) -> u8;
}

/// Validated scrobble point percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScrobblePoint(u8);

impl ScrobblePoint {
    pub const DEFAULT_PERCENTAGE: u8 = 50;

    pub fn new(percentage: u32) -> Result<Self, SettingsError> {
        u8::try_from(percentage)
            .ok()
            .filter(|p| *p <= 100)
            .map(Self)
            .ok_or(SettingsError::ScrobblePointOutOfRange(percentage))
    }

    /// Builds a scrobble point from an unchecked value, saturating at 100%.
    pub fn saturating(percentage: u8) -> Self {
        Self(percentage.min(100))
    }

    pub fn percentage(self) -> u8 {
        self.0
    }

    /// Elapsed playing time after which a track of `duration` is scrobbled.
    ///
    /// Saturates instead of overflowing for absurdly long durations.
    pub fn of(self, duration: Duration) -> Duration {
        let percentage = u32::from(self.0);
        duration
            .checked_mul(percentage)
            .map(|scaled| scaled / 100)
            .unwrap_or_else(|| (duration / 100).saturating_mul(percentage))
    }
}

impl Default for ScrobblePoint {
    fn default() -> Self {
        Self(Self::DEFAULT_PERCENTAGE)
    }
}

impl ScrobbleSettings for ScrobblePoint {
    fn scrobble_percentage(&self) -> u8 {
        self.0
    }
}

impl FromStr for ScrobblePoint {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('%');
        let percentage = trimmed
            .parse::<u32>()
            .map_err(|_| SettingsError::InvalidScrobblePoint(s.to_string()))?;
        Self::new(percentage)
    }
}

impl fmt::Display for ScrobblePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scrobble point that can be changed while the player manager runs.
#[derive(Debug)]
pub struct SharedScrobblePoint {
    percentage: AtomicU8,
}

impl SharedScrobblePoint {
    pub fn new(point: ScrobblePoint) -> Self {
        Self { percentage: AtomicU8::new(point.percentage()) }
    }

    pub fn get(&self) -> ScrobblePoint {
        ScrobblePoint(self.percentage.load(Ordering::Relaxed))
    }

    /// Takes effect from the next started track.
    pub fn set(&self, point: ScrobblePoint) {
        self.percentage.store(point.percentage(), Ordering::Relaxed);
    }
}

impl Default for SharedScrobblePoint {
    fn default() -> Self {
        Self::new(ScrobblePoint::default())
    }
}

impl ScrobbleSettings for SharedScrobblePoint {
    fn scrobble_percentage(&self) -> u8 {
        self.percentage.load(Ordering::Relaxed)
    }
}
