pub mod definitions;
pub mod track;
pub mod settings;
pub mod stopwatch;
pub mod player_events;
pub mod radio;

mod observed_track;
mod player_manager;
mod event_listener;
mod service;

pub use definitions::{PlaybackState, TrackRating};
pub use track::{PlayerId, Track};
pub use settings::{ScrobblePoint, ScrobbleSettings, SettingsError, SharedScrobblePoint};
pub use observed_track::ObservedTrack;
pub use player_events::{PlayerEvent, PlayerNotification};
pub use player_manager::PlayerManager;
pub use event_listener::{run_player_event_listener, NoopPlayerEventListener, PlayerEventListener};
pub use service::{spawn_service, ServiceHandle, StopHandle};
pub use radio::RadioController;
