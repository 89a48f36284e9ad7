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

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::select;
use tokio::sync::{broadcast, mpsc};

use crate::definitions::{PlaybackState, TrackRating, TrackStartRule};
use crate::observed_track::ObservedTrack;
use crate::player_events::{PlayerEvent, PlayerNotification};
use crate::service::{spawn_service, ServiceHandle};
use crate::settings::{ScrobblePoint, ScrobbleSettings};
use crate::stopwatch::{Stopwatch, StopwatchTimeout, StopwatchTimeoutReceiver, StopwatchTimeoutSender};
use crate::track::{PlayerId, Track};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Reconciles notifications of a connected player into a consistent playback state and a
/// well-ordered stream of [`PlayerEvent`]s.
///
/// Only one player is followed at a time: the first one to connect is bound and notifications
/// from any other player are dropped until it disconnects. Invalid transitions are logged and
/// ignored, they never fail.
pub struct PlayerManager {
    state: PlaybackState,
    observed: ObservedTrack,
    bound_player_id: Option<PlayerId>,
    settings: Arc<dyn ScrobbleSettings>,
    event_sender: broadcast::Sender<PlayerEvent>,
    timeout_tx: StopwatchTimeoutSender,
    timeout_rx: StopwatchTimeoutReceiver,
}

impl PlayerManager {
    pub fn new(settings: Arc<dyn ScrobbleSettings>) -> Self {
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (timeout_tx, timeout_rx) = mpsc::unbounded_channel();
        Self {
            state: PlaybackState::Stopped,
            observed: ObservedTrack::default(),
            bound_player_id: None,
            settings,
            event_sender,
            timeout_tx,
            timeout_rx,
        }
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_sender.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn observed_track(&self) -> &ObservedTrack {
        &self.observed
    }

    pub fn bound_player_id(&self) -> Option<&str> {
        self.bound_player_id.as_deref()
    }

    /// Spawn the manager event loop in background and return a handle.
    ///
    /// Notifications and stopwatch timeouts are processed one at a time on the spawned task. The
    /// loop ends on shutdown request or when the notification channel is closed.
    pub fn run(mut self, mut notifications: mpsc::Receiver<PlayerNotification>) -> ServiceHandle {
        spawn_service(move |mut stop| async move {
            loop {
                select! {
                    biased;
                    _ = stop.signaled() => {
                        info!("Player manager shutdown requested");
                        break;
                    }
                    Some(timeout) = self.timeout_rx.recv() => {
                        self.on_stopwatch_timeout(timeout);
                    }
                    notification = notifications.recv() => {
                        match notification {
                            Some(notification) => self.handle_notification(notification),
                            None => {
                                info!("Player notification channel closed; stopping player manager");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    /// Awaits the next timeout of a stopwatch created by this manager.
    ///
    /// Only needed when driving the manager by hand instead of through [`PlayerManager::run`].
    pub async fn next_stopwatch_timeout(&mut self) -> Option<StopwatchTimeout> {
        self.timeout_rx.recv().await
    }

    pub fn handle_notification(&mut self, notification: PlayerNotification) {
        match notification {
            PlayerNotification::PlayerConnected(id) => self.player_connected(id),
            PlayerNotification::PlayerDisconnected(id) => self.player_disconnected(&id),
            PlayerNotification::PreparingTrack(track) => self.preparing_track(track),
            PlayerNotification::TrackStarted(track) => self.track_started(track),
            PlayerNotification::PlaybackEnded(id) => self.session_ended(&id),
            PlayerNotification::PlaybackPaused(id) => self.playback_paused(&id),
            PlayerNotification::PlaybackStalled(id) => self.playback_stalled(&id),
            PlayerNotification::PlaybackResumed(id) => self.playback_resumed(&id),
        }
    }

    pub fn session_started(&mut self, player_id: &str) {
        if !self.accepts(player_id) {
            return;
        }
        self.start_session(player_id);
    }

    pub fn preparing_track(&mut self, track: Track) {
        if !self.accepts(&track.player_id) {
            return;
        }

        // a null track is fine here, the player just doesn't know the metadata yet
        if self.state == PlaybackState::Stopped {
            self.start_session(&track.player_id);
        } else {
            self.close_observed_track();
        }

        self.state = PlaybackState::Loading;
        debug!("Preparing track: {}", track);
        self.observed = ObservedTrack::new(track.clone());
        self.emit(PlayerEvent::PreparingTrack(track));
    }

    pub fn track_started(&mut self, track: Track) {
        if !self.accepts(&track.player_id) {
            return;
        }

        if track.is_null() && matches!(self.state, PlaybackState::Stopped | PlaybackState::Playing) {
            warn!("Empty track presented for TrackStarted notification by player {}, ending session", track.player_id);
            self.emit(PlayerEvent::SessionEnded);
            return;
        }

        match self.state.track_start_rule() {
            TrackStartRule::StartSession => self.start_session(&track.player_id),
            TrackStartRule::Resume => {
                self.state = PlaybackState::Playing;
                self.close_observed_track();
            }
            TrackStartRule::Continue => self.close_observed_track(),
        }

        self.observed = if track.is_null() {
            ObservedTrack::new(track.clone())
        } else {
            let scrobble_point = ScrobblePoint::saturating(self.settings.scrobble_percentage());
            let watch = Stopwatch::start(scrobble_point.of(track.duration), self.timeout_tx.clone());
            debug!("Track started: {}, scrobble point at {:?}", track, watch.duration());
            ObservedTrack::with_watch(track.clone(), watch)
        };
        self.emit(PlayerEvent::TrackStarted(track));
    }

    pub fn track_ended(&mut self, player_id: &str) {
        if !self.accepts(player_id) {
            return;
        }
        self.end_track();
    }

    pub fn session_ended(&mut self, player_id: &str) {
        if !self.accepts(player_id) {
            return;
        }
        self.end_session();
    }

    pub fn playback_paused(&mut self, player_id: &str) {
        if !self.accepts(player_id) {
            return;
        }

        match self.state {
            PlaybackState::Paused => {
                warn!("Ignoring request by player {} to set Paused state again", player_id);
                return;
            }
            PlaybackState::Stopped => {
                warn!("Ignoring request by player {} to pause when in stopped state", player_id);
                return;
            }
            PlaybackState::Loading | PlaybackState::Playing | PlaybackState::Stalled => {}
        }

        let Some(watch) = self.observed.active_watch_mut() else {
            error!("Programmer error: pause requested in {} state without a timed track", self.state);
            return;
        };
        watch.pause();

        self.state = PlaybackState::Paused;
        self.emit(PlayerEvent::Paused(self.observed.track().clone()));
    }

    pub fn playback_stalled(&mut self, player_id: &str) {
        if !self.accepts(player_id) {
            return;
        }

        if self.state != PlaybackState::Playing {
            warn!("Ignoring request by player {} to stall when in {} state", player_id, self.state);
            return;
        }

        let Some(watch) = self.observed.active_watch_mut() else {
            error!("Programmer error: playing state without a timed track");
            return;
        };
        watch.pause();

        self.state = PlaybackState::Stalled;
        self.emit(PlayerEvent::Stalled(self.observed.track().clone()));
    }

    pub fn playback_resumed(&mut self, player_id: &str) {
        if !self.accepts(player_id) {
            return;
        }

        if !self.state.is_resumable() {
            match self.state {
                PlaybackState::Stopped => warn!("Ignoring request by player {} to resume null track", player_id),
                _ => warn!("Ignoring request by player {} to resume playing track", player_id),
            }
            return;
        }

        let Some(watch) = self.observed.active_watch_mut() else {
            error!("Programmer error: resume requested in {} state without a timed track", self.state);
            return;
        };
        watch.resume();

        self.state = PlaybackState::Playing;
        self.emit(PlayerEvent::Resumed(self.observed.track().clone()));
    }

    pub fn player_connected(&mut self, player_id: PlayerId) {
        if let Some(bound) = &self.bound_player_id {
            debug!("Player {} connected while following player {}, ignoring", player_id, bound);
            return;
        }

        info!("Player {} connected", player_id);
        self.bound_player_id = Some(player_id.clone());
        self.emit(PlayerEvent::PlayerConnected(player_id));
    }

    pub fn player_disconnected(&mut self, player_id: &str) {
        if !self.accepts(player_id) {
            return;
        }

        info!("Player {} disconnected", player_id);
        self.emit(PlayerEvent::PlayerDisconnected(player_id.to_string()));

        // a crashed or buggy player must not leave the session playing
        self.end_session();
        self.bound_player_id = None;
    }

    /// Handles the expiry of the scrobble stopwatch of the observed track.
    ///
    /// Timeouts of stopwatches released in the meantime are discarded.
    pub fn on_stopwatch_timeout(&mut self, timeout: StopwatchTimeout) {
        let current = self.observed.watch().map(Stopwatch::id);
        if current != Some(timeout.id) {
            debug!("Discarding timeout of released stopwatch {}", timeout.id);
            return;
        }

        let track = self.observed.track_mut();
        track.upgrade_rating(TrackRating::Scrobbled);
        let track = track.clone();
        info!("Scrobble point reached: {}", track);
        self.emit(PlayerEvent::ScrobblePointReached(track));
    }

    fn accepts(&self, player_id: &str) -> bool {
        match &self.bound_player_id {
            Some(bound) => bound == player_id,
            None => true,
        }
    }

    fn start_session(&mut self, player_id: &str) {
        if self.state != PlaybackState::Stopped {
            warn!("Ignoring request by player {} to start already started session", player_id);
            return;
        }

        self.state = PlaybackState::Playing;
        self.emit(PlayerEvent::SessionStarted(player_id.to_string()));
    }

    fn close_observed_track(&mut self) {
        if !self.observed.is_null() {
            self.end_track();
        }
    }

    fn end_track(&mut self) {
        if self.observed.is_null() {
            warn!("Ignoring request to end null track");
            return;
        }
        if self.state == PlaybackState::Stopped {
            error!("Programmer error: track end requested for non-null track but state is stopped");
        }

        // the session goes on, only the track is over
        let ended = std::mem::take(&mut self.observed).into_track();
        self.emit(PlayerEvent::TrackEnded(ended));
    }

    fn end_session(&mut self) {
        self.end_track();

        if self.state == PlaybackState::Stopped {
            warn!("Ignoring request to set Stopped state again");
            return;
        }

        self.state = PlaybackState::Stopped;
        self.observed = ObservedTrack::default();
        self.emit(PlayerEvent::SessionEnded);
    }

    fn emit(&self, event: PlayerEvent) {
        debug!("Emitting {:?}", event);
        // no subscribers is fine
        let _ = self.event_sender.send(event);
    }
}
