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

use std::collections::HashMap;

use log::{debug, error, info, warn};
use tokio::select;
use tokio::sync::{broadcast, mpsc};
use url::Url;

use crate::radio::commands::RadioCommand;
use crate::radio::events::RadioEvent;
use crate::radio::media_transport::{MediaTransport, TransportError, TransportNotification, TransportState};
use crate::radio::tuner::{RadioStation, Tuner, TunerFactory, TunerLink, TunerMessage, TunerNotification};
use crate::radio::RADIO_PLAYER_ID;
use crate::service::{spawn_service, ServiceHandle};
use crate::track::Track;

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Plays radio stations through a media transport.
///
/// The controller owns the tuner of the current station, feeds the tracks it delivers into the
/// transport queue and translates transport state changes into [`RadioEvent`]s. When the last
/// pending track starts playing the tuner is asked for more.
pub struct RadioController<T, F> {
    transport: T,
    tuner_factory: F,
    tuner: Option<Box<dyn Tuner>>,
    tuner_generation: u64,
    // enqueued into the transport and not started yet
    pending: HashMap<Url, Track>,
    event_sender: broadcast::Sender<RadioEvent>,
    tuner_tx: mpsc::UnboundedSender<TunerMessage>,
    tuner_rx: mpsc::UnboundedReceiver<TunerMessage>,
}

impl<T, F> RadioController<T, F>
where
    T: MediaTransport,
    F: TunerFactory,
{
    pub fn new(transport: T, tuner_factory: F) -> Self {
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (tuner_tx, tuner_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            tuner_factory,
            tuner: None,
            tuner_generation: 0,
            pending: HashMap::new(),
            event_sender,
            tuner_tx,
            tuner_rx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RadioEvent> {
        self.event_sender.subscribe()
    }

    pub fn has_tuner(&self) -> bool {
        self.tuner.is_some()
    }

    pub fn pending_queue(&self) -> &HashMap<Url, Track> {
        &self.pending
    }

    /// Stops the current playback and tunes in to `station`.
    pub fn play(&mut self, station: RadioStation) {
        info!("Tuning to: {}", station);

        self.stop();
        self.tuner = None;
        self.tuner_generation += 1;

        self.emit(RadioEvent::TuningIn(station.clone()));
        let link = TunerLink::new(self.tuner_generation, self.tuner_tx.clone());
        self.tuner = Some(self.tuner_factory.create_tuner(&station, link));
    }

    /// Queues tracks for playback and makes sure the transport is playing.
    pub fn enqueue(&mut self, tracks: Vec<Track>) {
        let mut urls = Vec::with_capacity(tracks.len());
        let mut replaced = Vec::with_capacity(tracks.len());
        for track in tracks {
            let Some(url) = track.url.clone() else {
                warn!("Skipping radio track without locator: {}", track);
                continue;
            };
            urls.push(url.clone());
            let previous = self.pending.insert(url.clone(), track);
            replaced.push((url, previous));
        }
        if urls.is_empty() {
            return;
        }

        debug!("Enqueueing {} radio tracks", urls.len());
        if let Err(e) = self.transport.enqueue(urls) {
            error!("Failed to enqueue radio tracks: {}", e);
            // entries of earlier batches are still queued in the transport
            for (url, previous) in replaced.into_iter().rev() {
                match previous {
                    Some(track) => self.pending.insert(url, track),
                    None => self.pending.remove(&url),
                };
            }
            return;
        }
        log_failure("play", self.transport.play());
    }

    /// Jumps to the next queued track. Does nothing until the tuner delivered more tracks.
    pub fn skip(&mut self) {
        let mut queue = self.transport.queue();
        if queue.is_empty() {
            debug!("Nothing to skip to, waiting for more tracks");
            return;
        }

        let source = queue.remove(0);
        log_failure("set queue", self.transport.set_queue(queue));
        log_failure("set current source", self.transport.set_current_source(Some(source)));
        log_failure("play", self.transport.play());
    }

    pub fn stop(&mut self) {
        log_failure("stop", self.transport.stop());
        log_failure("clear queue", self.transport.clear_queue());
        log_failure("set current source", self.transport.set_current_source(None));
        self.pending.clear();
    }

    pub fn pause(&mut self) {
        log_failure("pause", self.transport.pause());
    }

    pub fn unpause(&mut self) {
        log_failure("play", self.transport.play());
    }

    pub fn handle_command(&mut self, command: RadioCommand) {
        match command {
            RadioCommand::Play(station) => self.play(station),
            RadioCommand::Skip => self.skip(),
            RadioCommand::Stop => self.stop(),
            RadioCommand::Pause => self.pause(),
            RadioCommand::Unpause => self.unpause(),
        }
    }

    pub fn on_transport_notification(&mut self, notification: TransportNotification) {
        match notification {
            TransportNotification::StateChanged { new_state, old_state } => {
                self.on_transport_state_changed(new_state, old_state)
            }
            TransportNotification::BufferStatus(percent) => self.emit(RadioEvent::Buffering(percent)),
            TransportNotification::AboutToFinish => debug!("Transport is about to finish the current source"),
        }
    }

    pub fn on_transport_state_changed(&mut self, new_state: TransportState, old_state: TransportState) {
        debug!("Now is {} but was {}", new_state, old_state);

        let url = self.transport.current_source();
        match new_state {
            TransportState::Error => {
                let reason = self.transport.error_string().unwrap_or_else(|| "unknown error".to_string());
                error!("Transport error: {}", reason);
            }
            TransportState::Stopped => self.emit(RadioEvent::PlaybackEnded),
            TransportState::Buffering => self.emit(RadioEvent::Buffering(0)),
            TransportState::Paused => self.emit(RadioEvent::PlaybackPaused),
            TransportState::Loading => {
                let track = url
                    .and_then(|url| self.pending.get(&url).cloned())
                    .unwrap_or_else(|| Track::null(RADIO_PLAYER_ID));
                self.emit(RadioEvent::Preparing(track));
            }
            TransportState::Playing => match old_state {
                TransportState::Paused | TransportState::Buffering => self.emit(RadioEvent::PlaybackResumed),
                _ => self.on_playback_started(url),
            },
        }
    }

    pub fn on_tuner_message(&mut self, message: TunerMessage) {
        if self.tuner.is_none() || message.generation != self.tuner_generation {
            debug!("Discarding notification of replaced tuner {}", message.generation);
            return;
        }

        match message.notification {
            TunerNotification::StationName(name) => {
                info!("Tuned in to {}", name);
                self.emit(RadioEvent::Tuned(name));
            }
            TunerNotification::Tracks(tracks) => self.enqueue(tracks),
        }
    }

    /// Awaits the next message of any tuner created by this controller.
    pub async fn next_tuner_message(&mut self) -> Option<TunerMessage> {
        self.tuner_rx.recv().await
    }

    fn on_playback_started(&mut self, url: Option<Url>) {
        debug!("Playback started: {:?}", url.as_ref().map(Url::as_str));

        let Some(mut track) = url.and_then(|url| self.pending.remove(&url)) else {
            return;
        };
        if track.is_null() {
            return;
        }

        track.stamp();
        self.emit(RadioEvent::TrackStarted(track));

        if self.pending.is_empty() {
            if let Some(tuner) = self.tuner.as_mut() {
                tuner.fetch_more_tracks();
            }
        }
    }

    fn emit(&self, event: RadioEvent) {
        debug!("Emitting {:?}", event);
        let _ = self.event_sender.send(event);
    }
}

impl<T, F> RadioController<T, F>
where
    T: MediaTransport + 'static,
    F: TunerFactory + 'static,
{
    /// Spawn the controller loop in background and return a handle.
    ///
    /// Commands, transport notifications and tuner messages are applied one at a time. The loop
    /// ends on shutdown request or when the command or transport channel is closed; playback is
    /// stopped when nobody can send commands anymore.
    pub fn run(mut self,
               mut commands: mpsc::Receiver<RadioCommand>,
               mut transport_notifications: mpsc::Receiver<TransportNotification>) -> ServiceHandle
    {
        spawn_service(move |mut stop| async move {
            loop {
                select! {
                    biased;
                    _ = stop.signaled() => {
                        info!("Radio controller shutdown requested");
                        break;
                    }
                    Some(message) = self.tuner_rx.recv() => {
                        self.on_tuner_message(message);
                    }
                    notification = transport_notifications.recv() => {
                        match notification {
                            Some(notification) => self.on_transport_notification(notification),
                            None => {
                                info!("Transport notification channel closed; stopping radio controller");
                                break;
                            }
                        }
                    }
                    command = commands.recv() => {
                        match command {
                            Some(command) => self.handle_command(command),
                            None => {
                                info!("Radio command channel closed; stopping playback");
                                self.stop();
                                break;
                            }
                        }
                    }
                }
            }
        })
    }
}

fn log_failure(operation: &str, result: Result<(), TransportError>) {
    if let Err(e) = result {
        error!("Transport {} failed: {}", operation, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct TransportLog {
        calls: Vec<String>,
        queue: Vec<Url>,
        current: Option<Url>,
        fail_enqueue: bool,
        error: Option<String>,
    }

    #[derive(Clone, Default)]
    struct MockTransport {
        log: Arc<Mutex<TransportLog>>,
    }

    impl MockTransport {
        fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().calls.clone()
        }

        fn clear_calls(&self) {
            self.log.lock().unwrap().calls.clear();
        }

        fn set_current(&self, url: &Url) {
            self.log.lock().unwrap().current = Some(url.clone());
        }

        fn record(&self, call: &str) {
            self.log.lock().unwrap().calls.push(call.to_string());
        }
    }

    impl MediaTransport for MockTransport {
        fn enqueue(&mut self, sources: Vec<Url>) -> Result<(), TransportError> {
            self.record("enqueue");
            let mut log = self.log.lock().unwrap();
            if log.fail_enqueue {
                return Err(TransportError::Failure("queue is full".into()));
            }
            log.queue.extend(sources);
            Ok(())
        }

        fn queue(&self) -> Vec<Url> {
            self.log.lock().unwrap().queue.clone()
        }

        fn set_queue(&mut self, queue: Vec<Url>) -> Result<(), TransportError> {
            self.record("set_queue");
            self.log.lock().unwrap().queue = queue;
            Ok(())
        }

        fn clear_queue(&mut self) -> Result<(), TransportError> {
            self.record("clear_queue");
            self.log.lock().unwrap().queue.clear();
            Ok(())
        }

        fn current_source(&self) -> Option<Url> {
            self.log.lock().unwrap().current.clone()
        }

        fn set_current_source(&mut self, source: Option<Url>) -> Result<(), TransportError> {
            self.record("set_current_source");
            self.log.lock().unwrap().current = source;
            Ok(())
        }

        fn play(&mut self) -> Result<(), TransportError> {
            self.record("play");
            Ok(())
        }

        fn pause(&mut self) -> Result<(), TransportError> {
            self.record("pause");
            Ok(())
        }

        fn stop(&mut self) -> Result<(), TransportError> {
            self.record("stop");
            Ok(())
        }

        fn error_string(&self) -> Option<String> {
            self.log.lock().unwrap().error.clone()
        }
    }

    #[derive(Default)]
    struct TunerLog {
        links: Vec<TunerLink>,
        stations: Vec<RadioStation>,
        fetches: usize,
        dropped: usize,
    }

    #[derive(Clone, Default)]
    struct MockTunerFactory {
        log: Arc<Mutex<TunerLog>>,
    }

    impl MockTunerFactory {
        fn last_link(&self) -> TunerLink {
            self.log.lock().unwrap().links.last().cloned().unwrap()
        }
    }

    struct MockTuner {
        log: Arc<Mutex<TunerLog>>,
    }

    impl Tuner for MockTuner {
        fn fetch_more_tracks(&mut self) {
            self.log.lock().unwrap().fetches += 1;
        }
    }

    impl Drop for MockTuner {
        fn drop(&mut self) {
            self.log.lock().unwrap().dropped += 1;
        }
    }

    impl TunerFactory for MockTunerFactory {
        fn create_tuner(&mut self, station: &RadioStation, link: TunerLink) -> Box<dyn Tuner> {
            let mut log = self.log.lock().unwrap();
            log.links.push(link);
            log.stations.push(station.clone());
            Box::new(MockTuner { log: self.log.clone() })
        }
    }

    type Controller = RadioController<MockTransport, MockTunerFactory>;

    fn controller() -> (Controller, MockTransport, MockTunerFactory, broadcast::Receiver<RadioEvent>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let transport = MockTransport::default();
        let factory = MockTunerFactory::default();
        let controller = RadioController::new(transport.clone(), factory.clone());
        let events = controller.subscribe();
        (controller, transport, factory, events)
    }

    fn url(n: u32) -> Url {
        Url::parse(&format!("http://radio.example.com/track/{}.mp3", n)).unwrap()
    }

    fn radio_track(n: u32) -> Track {
        Track::new(RADIO_PLAYER_ID, "Artist", format!("Track {}", n))
            .with_duration(Duration::from_secs(200))
            .with_url(url(n))
    }

    fn station() -> RadioStation {
        RadioStation::new("lastfm://artist/Cher/similarartists").with_title("Cher Radio")
    }

    fn take(events: &mut broadcast::Receiver<RadioEvent>) -> Vec<RadioEvent> {
        let mut taken = Vec::new();
        while let Ok(event) = events.try_recv() {
            taken.push(event);
        }
        taken
    }

    async fn tuned(controller: &mut Controller, factory: &MockTunerFactory, tracks: Vec<Track>) {
        controller.play(station());
        factory.last_link().tracks(tracks);
        let message = controller.next_tuner_message().await.unwrap();
        controller.on_tuner_message(message);
    }

    #[tokio::test]
    async fn play_stops_and_creates_tuner() {
        let (mut controller, transport, factory, mut events) = controller();

        controller.play(station());

        assert_eq!(take(&mut events), vec![RadioEvent::TuningIn(station())]);
        assert_eq!(transport.calls(), vec!["stop", "clear_queue", "set_current_source"]);
        assert!(controller.has_tuner());
        assert_eq!(factory.log.lock().unwrap().stations, vec![station()]);
    }

    #[tokio::test]
    async fn play_again_replaces_tuner() {
        let (mut controller, _transport, factory, _events) = controller();

        controller.play(station());
        let first = factory.last_link();
        controller.play(RadioStation::new("lastfm://user/rj/personal"));
        let second = factory.last_link();

        assert_eq!(factory.log.lock().unwrap().dropped, 1);
        assert_ne!(first.generation(), second.generation());
    }

    #[tokio::test]
    async fn station_name_is_propagated() {
        let (mut controller, _transport, factory, mut events) = controller();
        controller.play(station());
        take(&mut events);

        factory.last_link().station_name("Cher Similar Artists");
        let message = controller.next_tuner_message().await.unwrap();
        controller.on_tuner_message(message);

        assert_eq!(take(&mut events), vec![RadioEvent::Tuned("Cher Similar Artists".into())]);
    }

    #[tokio::test]
    async fn tuner_tracks_are_enqueued_and_played() {
        let (mut controller, transport, factory, _events) = controller();
        controller.play(station());
        transport.clear_calls();

        let no_locator = Track::new(RADIO_PLAYER_ID, "Artist", "Nowhere");
        factory.last_link().tracks(vec![radio_track(1), no_locator, radio_track(2)]);
        let message = controller.next_tuner_message().await.unwrap();
        controller.on_tuner_message(message);

        assert_eq!(transport.calls(), vec!["enqueue", "play"]);
        assert_eq!(transport.queue(), vec![url(1), url(2)]);
        assert_eq!(controller.pending_queue().len(), 2);
        assert_eq!(controller.pending_queue().get(&url(1)), Some(&radio_track(1)));
    }

    #[tokio::test]
    async fn stale_tuner_messages_are_discarded() {
        let (mut controller, transport, factory, mut events) = controller();
        controller.play(station());
        let stale = factory.last_link();
        controller.play(station());
        transport.clear_calls();
        take(&mut events);

        stale.station_name("Old");
        stale.tracks(vec![radio_track(1)]);
        for _ in 0..2 {
            let message = controller.next_tuner_message().await.unwrap();
            controller.on_tuner_message(message);
        }

        assert!(take(&mut events).is_empty());
        assert!(transport.calls().is_empty());
        assert!(controller.pending_queue().is_empty());
    }

    #[tokio::test]
    async fn failed_enqueue_keeps_nothing_pending() {
        let (mut controller, transport, _factory, _events) = controller();
        transport.log.lock().unwrap().fail_enqueue = true;

        controller.enqueue(vec![radio_track(1)]);

        assert!(controller.pending_queue().is_empty());
        assert_eq!(transport.calls(), vec!["enqueue"]);
    }

    #[tokio::test]
    async fn failed_enqueue_keeps_earlier_batches_pending() {
        let (mut controller, transport, _factory, _events) = controller();
        controller.enqueue(vec![radio_track(1)]);
        transport.log.lock().unwrap().fail_enqueue = true;

        let mut retitled = radio_track(1);
        retitled.title = "Track 1 (live)".into();
        controller.enqueue(vec![retitled, radio_track(2)]);

        assert_eq!(controller.pending_queue().len(), 1);
        assert_eq!(controller.pending_queue().get(&url(1)), Some(&radio_track(1)));
    }

    #[tokio::test]
    async fn loading_reports_pending_track_without_taking_it() {
        let (mut controller, transport, factory, mut events) = controller();
        tuned(&mut controller, &factory, vec![radio_track(1)]).await;
        take(&mut events);

        transport.set_current(&url(1));
        controller.on_transport_state_changed(TransportState::Loading, TransportState::Stopped);

        assert_eq!(take(&mut events), vec![RadioEvent::Preparing(radio_track(1))]);
        assert!(controller.pending_queue().contains_key(&url(1)));
    }

    #[tokio::test]
    async fn loading_unknown_source_reports_null_track() {
        let (mut controller, transport, _factory, mut events) = controller();
        transport.set_current(&url(7));

        controller.on_transport_state_changed(TransportState::Loading, TransportState::Stopped);

        assert_eq!(take(&mut events), vec![RadioEvent::Preparing(Track::null(RADIO_PLAYER_ID))]);
    }

    #[tokio::test]
    async fn playing_starts_track_and_refills_queue() {
        let (mut controller, transport, factory, mut events) = controller();
        tuned(&mut controller, &factory, vec![radio_track(1), radio_track(2)]).await;
        take(&mut events);

        transport.set_current(&url(1));
        controller.on_transport_state_changed(TransportState::Playing, TransportState::Stopped);
        let started = take(&mut events);
        assert!(matches!(started.as_slice(),
            [RadioEvent::TrackStarted(t)] if t.url == Some(url(1)) && t.timestamp.is_some()));
        assert!(!controller.pending_queue().contains_key(&url(1)));
        assert!(controller.pending_queue().contains_key(&url(2)));
        assert_eq!(factory.log.lock().unwrap().fetches, 0);

        transport.set_current(&url(2));
        controller.on_transport_state_changed(TransportState::Playing, TransportState::Stopped);
        assert_eq!(take(&mut events).len(), 1);
        assert!(controller.pending_queue().is_empty());
        assert_eq!(factory.log.lock().unwrap().fetches, 1);
    }

    #[tokio::test]
    async fn playing_unknown_source_is_ignored() {
        let (mut controller, transport, _factory, mut events) = controller();
        transport.set_current(&url(3));

        controller.on_transport_state_changed(TransportState::Playing, TransportState::Loading);

        assert!(take(&mut events).is_empty());
    }

    #[tokio::test]
    async fn transport_states_map_to_events() {
        let (mut controller, transport, _factory, mut events) = controller();
        transport.log.lock().unwrap().error = Some("stream died".into());

        controller.on_transport_state_changed(TransportState::Buffering, TransportState::Playing);
        controller.on_transport_state_changed(TransportState::Playing, TransportState::Buffering);
        controller.on_transport_state_changed(TransportState::Paused, TransportState::Playing);
        controller.on_transport_state_changed(TransportState::Playing, TransportState::Paused);
        controller.on_transport_state_changed(TransportState::Error, TransportState::Playing);
        controller.on_transport_state_changed(TransportState::Stopped, TransportState::Error);

        assert_eq!(take(&mut events), vec![
            RadioEvent::Buffering(0),
            RadioEvent::PlaybackResumed,
            RadioEvent::PlaybackPaused,
            RadioEvent::PlaybackResumed,
            RadioEvent::PlaybackEnded,
        ]);
    }

    #[tokio::test]
    async fn buffer_status_is_relayed() {
        let (mut controller, _transport, _factory, mut events) = controller();

        controller.on_transport_notification(TransportNotification::BufferStatus(42));
        controller.on_transport_notification(TransportNotification::AboutToFinish);

        assert_eq!(take(&mut events), vec![RadioEvent::Buffering(42)]);
    }

    #[tokio::test]
    async fn skip_moves_to_next_queued_source() {
        let (mut controller, transport, factory, _events) = controller();
        tuned(&mut controller, &factory, vec![radio_track(1), radio_track(2)]).await;
        transport.clear_calls();

        controller.skip();

        assert_eq!(transport.calls(), vec!["set_queue", "set_current_source", "play"]);
        assert_eq!(transport.current_source(), Some(url(1)));
        assert_eq!(transport.queue(), vec![url(2)]);
    }

    #[tokio::test]
    async fn skip_with_empty_queue_does_nothing() {
        let (mut controller, transport, _factory, _events) = controller();

        controller.skip();

        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn stop_clears_transport_and_pending() {
        let (mut controller, transport, factory, _events) = controller();
        tuned(&mut controller, &factory, vec![radio_track(1)]).await;
        transport.set_current(&url(1));

        controller.stop();

        assert!(transport.queue().is_empty());
        assert_eq!(transport.current_source(), None);
        assert!(controller.pending_queue().is_empty());
        assert!(controller.has_tuner());
    }

    #[tokio::test]
    async fn pause_and_unpause_drive_transport() {
        let (mut controller, transport, _factory, _events) = controller();

        controller.handle_command(RadioCommand::Pause);
        controller.handle_command(RadioCommand::Unpause);

        assert_eq!(transport.calls(), vec!["pause", "play"]);
    }

    #[tokio::test]
    async fn run_loop_plays_station_tracks() {
        let (controller, transport, factory, mut events) = controller();
        let (command_tx, command_rx) = mpsc::channel(8);
        let (transport_tx, transport_rx) = mpsc::channel(8);
        let handle = controller.run(command_rx, transport_rx);

        command_tx.send(RadioCommand::Play(station())).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), RadioEvent::TuningIn(station()));

        factory.last_link().tracks(vec![radio_track(1)]);
        transport.set_current(&url(1));
        transport_tx.send(TransportNotification::StateChanged {
            new_state: TransportState::Playing,
            old_state: TransportState::Loading,
        }).await.unwrap();

        match events.recv().await.unwrap() {
            RadioEvent::TrackStarted(track) => assert_eq!(track.url, Some(url(1))),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(factory.log.lock().unwrap().fetches, 1);

        drop(command_tx);
        handle.await_join().await.unwrap();
        assert!(transport.calls().ends_with(&["stop".to_string(), "clear_queue".to_string(), "set_current_source".to_string()]));
    }
}
