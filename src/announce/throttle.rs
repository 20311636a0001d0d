use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::announce::aggregate::PhraseSet;

/// Fixed opening of every spoken announcement.
pub const ANNOUNCEMENT_PREAMBLE: &str = "I have detected ";

/// Source of monotonic time for the throttle.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

/// Process monotonic clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock. Clones share the same time, so a test can keep one
/// handle while the frame loop owns another.
#[derive(Clone, Debug)]
pub struct ManualClock {
    base: Instant,
    offset_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}

/// Logical throttle state, derived from the last announcement time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleState {
    /// Next non-empty aggregate will be spoken.
    Idle,
    /// Recently spoke; new phrases are dropped until `remaining` has passed.
    Cooldown { remaining: Duration },
}

/// Rate limiter between the aggregator and speech dispatch.
///
/// Holds a single timestamp. Phrases suppressed during cooldown are dropped,
/// never queued.
#[derive(Clone, Debug)]
pub struct AnnouncementThrottle {
    interval: Duration,
    last_announcement: Instant,
}

impl AnnouncementThrottle {
    /// `started_at` counts as the last announcement, so nothing is spoken
    /// during the first interval after start-up.
    pub fn new(interval: Duration, started_at: Instant) -> Self {
        Self {
            interval,
            last_announcement: started_at,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_announcement(&self) -> Instant {
        self.last_announcement
    }

    pub fn state(&self, now: Instant) -> ThrottleState {
        let elapsed = now.saturating_duration_since(self.last_announcement);
        if elapsed > self.interval {
            ThrottleState::Idle
        } else {
            ThrottleState::Cooldown {
                remaining: self.interval - elapsed,
            }
        }
    }

    /// Decide whether `phrases` are spoken at `now`.
    ///
    /// Returns the sentence to hand to speech dispatch and records `now` as
    /// the last announcement. An empty phrase set never fires and never
    /// touches the timestamp.
    pub fn evaluate(&mut self, phrases: &PhraseSet, now: Instant) -> Option<String> {
        if phrases.is_empty() {
            return None;
        }
        match self.state(now) {
            ThrottleState::Idle => {
                self.last_announcement = self.last_announcement.max(now);
                Some(compose_announcement(phrases))
            }
            ThrottleState::Cooldown { .. } => None,
        }
    }
}

pub fn compose_announcement(phrases: &PhraseSet) -> String {
    let joined: Vec<&str> = phrases.iter().map(String::as_str).collect();
    format!("{}{}", ANNOUNCEMENT_PREAMBLE, joined.join(", "))
}
