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

use thiserror::Error;
use url::Url;

/// State of the media transport, as reported in state change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// The current source is being opened.
    Loading,
    Stopped,
    Playing,
    /// Playback waits for more data.
    Buffering,
    Paused,
    /// The transport failed, see [`MediaTransport::error_string`].
    Error,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Loading => write!(f, "LoadingState"),
            TransportState::Stopped => write!(f, "StoppedState"),
            TransportState::Playing => write!(f, "PlayingState"),
            TransportState::Buffering => write!(f, "BufferingState"),
            TransportState::Paused => write!(f, "PausedState"),
            TransportState::Error => write!(f, "ErrorState"),
        }
    }
}

/// Notifications pushed by the transport to the radio controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportNotification {
    StateChanged { new_state: TransportState, old_state: TransportState },
    /// Buffer fill level in percent.
    BufferStatus(u8),
    /// The current source is about to end.
    AboutToFinish,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Feature not supported")]
    FeatureNotSupported,

    #[error("Invalid source {0}")]
    InvalidSource(Url),

    #[error("Transport failure: {0}")]
    Failure(String),
}

/// Audio output driven by the radio controller.
///
/// The transport owns a queue of sources played one after another, and a current source.
pub trait MediaTransport: Send {
    /// Appends sources to the end of the queue.
    fn enqueue(&mut self, sources: Vec<Url>) -> Result<(), TransportError>;

    fn queue(&self) -> Vec<Url>;

    fn set_queue(&mut self, queue: Vec<Url>) -> Result<(), TransportError>;

    fn clear_queue(&mut self) -> Result<(), TransportError>;

    fn current_source(&self) -> Option<Url>;

    /// `None` unloads the current source.
    fn set_current_source(&mut self, source: Option<Url>) -> Result<(), TransportError>;

    fn play(&mut self) -> Result<(), TransportError>;

    fn pause(&mut self) -> Result<(), TransportError> {
        Err(TransportError::FeatureNotSupported)
    }

    fn stop(&mut self) -> Result<(), TransportError>;

    /// Human readable description of the last error.
    fn error_string(&self) -> Option<String> {
        None
    }
}
