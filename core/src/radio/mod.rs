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

mod commands;
mod events;
mod media_transport;
mod radio_controller;
mod tuner;

pub use commands::RadioCommand;
pub use events::RadioEvent;
pub use media_transport::{MediaTransport, TransportError, TransportNotification, TransportState};
pub use radio_controller::RadioController;
pub use tuner::{RadioStation, Tuner, TunerFactory, TunerLink, TunerMessage, TunerNotification};

/// Player id carried by tracks played by the internal radio.
pub const RADIO_PLAYER_ID: &str = "radio";
