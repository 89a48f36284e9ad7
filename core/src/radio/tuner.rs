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

use log::debug;
use tokio::sync::mpsc;

use crate::track::Track;

/// Radio station to tune in to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioStation {
    pub url: String,
    pub title: Option<String>,
}

impl RadioStation {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), title: None }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl fmt::Display for RadioStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{}", title),
            None => write!(f, "{}", self.url),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TunerNotification {
    /// The station resolved its display name.
    StationName(String),
    /// A batch of playable tracks.
    Tracks(Vec<Track>),
}

/// Tuner notification tagged with the generation of the tuner that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerMessage {
    pub generation: u64,
    pub notification: TunerNotification,
}

/// Channel through which a tuner reports back to the radio controller that created it.
///
/// Messages of a tuner replaced in the meantime are discarded by the controller.
#[derive(Debug, Clone)]
pub struct TunerLink {
    generation: u64,
    tx: mpsc::UnboundedSender<TunerMessage>,
}

impl TunerLink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<TunerMessage>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn station_name(&self, name: impl Into<String>) {
        self.send(TunerNotification::StationName(name.into()));
    }

    pub fn tracks(&self, tracks: Vec<Track>) {
        self.send(TunerNotification::Tracks(tracks));
    }

    fn send(&self, notification: TunerNotification) {
        let message = TunerMessage { generation: self.generation, notification };
        if self.tx.send(message).is_err() {
            debug!("Radio controller is gone, dropping tuner notification");
        }
    }
}

/// Source of radio tracks for one station.
pub trait Tuner: Send {
    /// Asks for another batch of tracks, delivered later through the [`TunerLink`].
    fn fetch_more_tracks(&mut self);
}

pub trait TunerFactory: Send {
    fn create_tuner(&mut self, station: &RadioStation, link: TunerLink) -> Box<dyn Tuner>;
}
