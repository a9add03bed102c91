use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// Remaining-time threshold (seconds) under which a countdown reports low time.
pub const DEFAULT_LOW_TIME_SECS: u64 = 300;

//
// ─── CLOCK ─────────────────────────────────────────────────────────────────────
//

/// Wall-clock abstraction so sessions can be driven deterministically in tests.
///
/// `Manual` shares its instant between clones, which lets a test advance the
/// time observed by a session it no longer owns.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
    Manual(Arc<AtomicI64>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns a shared, manually advanced clock starting at `at`.
    #[must_use]
    pub fn manual(at: DateTime<Utc>) -> Self {
        Self::Manual(Arc::new(AtomicI64::new(at.timestamp_millis())))
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
            Clock::Manual(millis) => {
                DateTime::<Utc>::from_timestamp_millis(millis.load(Ordering::SeqCst))
                    .unwrap_or_default()
            }
        }
    }

    /// Advance a fixed or manual clock by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        match self {
            Clock::Default => {}
            Clock::Fixed(t) => *t += delta,
            Clock::Manual(millis) => {
                millis.fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
            }
        }
    }

    /// Returns true if this clock represents real time.
    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, Clock::Default)
    }
}

/// Whole seconds elapsed between two instants, clamped at zero.
#[must_use]
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from(to.signed_duration_since(from).num_seconds()).unwrap_or(0)
}

//
// ─── COUNTDOWN ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountdownState {
    Running,
    Expired,
    Stopped,
}

/// Outcome of advancing a countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; carries the seconds left after this tick.
    Running { remaining: u64 },
    /// This tick exhausted the budget. Reported exactly once.
    Expired,
    /// The countdown had already expired or was stopped; nothing happened.
    Idle,
}

/// Single-use countdown over a budget of whole seconds.
///
/// Pure state machine: whoever owns it decides when a second has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    low_time_threshold: u64,
    state: CountdownState,
}

impl Countdown {
    #[must_use]
    pub fn new(duration_secs: u64) -> Self {
        Self {
            remaining: duration_secs,
            low_time_threshold: DEFAULT_LOW_TIME_SECS,
            state: CountdownState::Running,
        }
    }

    #[must_use]
    pub fn with_low_time_threshold(mut self, threshold_secs: u64) -> Self {
        self.low_time_threshold = threshold_secs;
        self
    }

    /// Advance by one second.
    ///
    /// A zero budget expires on the first tick. Remaining time never goes
    /// below zero.
    pub fn tick(&mut self) -> Tick {
        if self.state != CountdownState::Running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = CountdownState::Expired;
            Tick::Expired
        } else {
            Tick::Running {
                remaining: self.remaining,
            }
        }
    }

    /// Halt the countdown. Returns `true` if it was still running.
    pub fn stop(&mut self) -> bool {
        if self.state == CountdownState::Running {
            self.state = CountdownState::Stopped;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    #[must_use]
    pub fn low_time_threshold(&self) -> u64 {
        self.low_time_threshold
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.state == CountdownState::Expired
    }

    #[must_use]
    pub fn is_low_time(&self) -> bool {
        is_low_time(self.remaining, self.low_time_threshold)
    }

    /// Remaining time as `HH:MM:SS`.
    #[must_use]
    pub fn format_hms(&self) -> String {
        format_hms(self.remaining)
    }
}

#[must_use]
pub fn is_low_time(remaining_secs: u64, threshold_secs: u64) -> bool {
    remaining_secs < threshold_secs
}

#[must_use]
pub fn format_hms(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

//
// ─── TEST HELPERS ──────────────────────────────────────────────────────────────
//

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
