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
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::trace;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub type StopwatchId = u64;

/// Sent once by a stopwatch when its countdown expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopwatchTimeout {
    pub id: StopwatchId,
}

pub type StopwatchTimeoutSender = mpsc::UnboundedSender<StopwatchTimeout>;
pub type StopwatchTimeoutReceiver = mpsc::UnboundedReceiver<StopwatchTimeout>;

static NEXT_STOPWATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Countdowns longer than this are never scheduled.
const MAX_COUNTDOWN: Duration = Duration::from_secs(86400 * 365 * 30);

/// Pausable countdown that fires a single [`StopwatchTimeout`] after the given playing time.
///
/// The countdown runs as a tokio task. Pausing or dropping the stopwatch aborts the task, so a
/// timeout is never sent after the stopwatch is gone. Receivers should still compare the id of a
/// timeout with the stopwatch they own, since a timeout sent just before the drop may be queued.
pub struct Stopwatch {
    id: StopwatchId,
    duration: Duration,
    remaining: Duration,
    resumed_at: Option<Instant>,
    task: Option<JoinHandle<()>>,
    fired: Arc<AtomicBool>,
    timeout_tx: StopwatchTimeoutSender,
}

impl Stopwatch {
    /// Creates a running stopwatch. Must be called within a tokio runtime.
    pub fn start(duration: Duration, timeout_tx: StopwatchTimeoutSender) -> Self {
        let mut watch = Self {
            id: NEXT_STOPWATCH_ID.fetch_add(1, Ordering::Relaxed),
            duration,
            remaining: duration,
            resumed_at: None,
            task: None,
            fired: Arc::new(AtomicBool::new(false)),
            timeout_tx,
        };
        watch.resume();
        watch
    }

    pub fn id(&self) -> StopwatchId {
        self.id
    }

    /// Total playing time after which the stopwatch fires.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        self.resumed_at.is_some() && !self.has_fired()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Playing time left until the stopwatch fires.
    pub fn remaining(&self) -> Duration {
        if self.has_fired() {
            return Duration::ZERO;
        }
        match self.resumed_at {
            Some(resumed_at) => self.remaining.saturating_sub(resumed_at.elapsed()),
            None => self.remaining,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.duration - self.remaining()
    }

    pub fn pause(&mut self) {
        let Some(resumed_at) = self.resumed_at.take() else {
            return;
        };
        self.remaining = self.remaining.saturating_sub(resumed_at.elapsed());
        if let Some(task) = self.task.take() {
            task.abort();
        }
        trace!("Stopwatch {} paused with {:?} remaining", self.id, self.remaining);
    }

    pub fn resume(&mut self) {
        if self.resumed_at.is_some() || self.has_fired() {
            return;
        }

        let id = self.id;
        let remaining = self.remaining;
        let now = Instant::now();
        self.resumed_at = Some(now);

        let Some(deadline) = now.checked_add(remaining).filter(|_| remaining <= MAX_COUNTDOWN) else {
            trace!("Stopwatch {} deadline is out of range, it will not fire", self.id);
            return;
        };
        let fired = self.fired.clone();
        let timeout_tx = self.timeout_tx.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fired.store(true, Ordering::Release);
            let _ = timeout_tx.send(StopwatchTimeout { id });
        }));
        trace!("Stopwatch {} running with {:?} remaining", self.id, remaining);
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stopwatch")
            .field("id", &self.id)
            .field("duration", &self.duration)
            .field("remaining", &self.remaining())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    const LONG_WAIT: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_duration() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = Instant::now();
        let watch = Stopwatch::start(Duration::from_secs(90), tx);

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.id, watch.id());
        assert!(started.elapsed() >= Duration::from_secs(90));
        assert!(started.elapsed() < Duration::from_secs(91));
        assert!(watch.has_fired());
        assert_eq!(watch.remaining(), Duration::ZERO);

        assert!(timeout(LONG_WAIT, rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_keeps_remaining_time() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watch = Stopwatch::start(Duration::from_secs(10), tx);

        advance(Duration::from_secs(4)).await;
        watch.pause();
        assert!(!watch.is_running());
        assert_eq!(watch.remaining(), Duration::from_secs(6));
        assert_eq!(watch.elapsed(), Duration::from_secs(4));

        assert!(timeout(LONG_WAIT, rx.recv()).await.is_err());
        assert_eq!(watch.remaining(), Duration::from_secs(6));

        let resumed = Instant::now();
        watch.resume();
        assert!(watch.is_running());
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.id, watch.id());
        assert!(resumed.elapsed() >= Duration::from_secs(6));
        assert!(resumed.elapsed() < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_stopwatch_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watch = Stopwatch::start(Duration::from_secs(5), tx.clone());
        advance(Duration::from_secs(2)).await;
        drop(watch);

        assert!(timeout(LONG_WAIT, rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_after_fire_does_not_rearm() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watch = Stopwatch::start(Duration::from_secs(1), tx);
        rx.recv().await.unwrap();

        watch.pause();
        watch.resume();
        assert!(!watch.is_running());
        assert!(timeout(LONG_WAIT, rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_countdown_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watch = Stopwatch::start(Duration::MAX, tx.clone());
        let mut long = Stopwatch::start(Duration::from_secs(u64::MAX / 2), tx);
        assert!(watch.is_running());
        assert!(long.is_running());

        assert!(timeout(LONG_WAIT, rx.recv()).await.is_err());
        watch.pause();
        long.pause();
        assert!(watch.remaining() >= Duration::MAX - LONG_WAIT - Duration::from_secs(1));
        watch.resume();
        assert!(watch.is_running());
    }

    #[tokio::test]
    async fn stopwatches_get_distinct_ids() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let first = Stopwatch::start(Duration::from_secs(1), tx.clone());
        let second = Stopwatch::start(Duration::from_secs(1), tx);
        assert_ne!(first.id(), second.id());
    }
}
