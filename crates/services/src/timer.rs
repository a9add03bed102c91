use std::time::Duration;

use exam_core::time::{Countdown, Tick, format_hms, is_low_time};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Tokio-driven countdown for one session.
///
/// Publishes the remaining seconds once per second and calls `on_expire`
/// exactly once when the budget runs out. Stopping (or dropping) the timer
/// halts ticking with no further callbacks.
#[derive(Debug)]
pub struct ExamTimer {
    remaining: watch::Receiver<u64>,
    cancel: CancellationToken,
    low_time_threshold: u64,
    _guard: DropGuard,
}

impl ExamTimer {
    /// Spawn the ticking task on the current runtime.
    ///
    /// A countdown with no time left expires without waiting for a tick.
    pub fn start<F>(countdown: Countdown, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(countdown.remaining_seconds());
        let low_time_threshold = countdown.low_time_threshold();

        tokio::spawn(run(countdown, tx, cancel.clone(), on_expire));

        Self {
            remaining: rx,
            _guard: cancel.clone().drop_guard(),
            cancel,
            low_time_threshold,
        }
    }

    /// Halt ticking. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u64 {
        *self.remaining.borrow()
    }

    #[must_use]
    pub fn is_low_time(&self) -> bool {
        is_low_time(self.remaining_seconds(), self.low_time_threshold)
    }

    #[must_use]
    pub fn format_hms(&self) -> String {
        format_hms(self.remaining_seconds())
    }
}

async fn run<F>(
    mut countdown: Countdown,
    tx: watch::Sender<u64>,
    cancel: CancellationToken,
    on_expire: F,
) where
    F: FnOnce() + Send + 'static,
{
    let mut on_expire = Some(on_expire);
    let mut fire = move || {
        if let Some(callback) = on_expire.take() {
            callback();
        }
    };

    if countdown.remaining_seconds() == 0 {
        countdown.tick();
        tracing::info!("exam timer expired on start");
        fire();
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                countdown.stop();
                tracing::debug!(remaining = countdown.remaining_seconds(), "exam timer stopped");
                return;
            }
            _ = interval.tick() => match countdown.tick() {
                Tick::Running { remaining } => {
                    tx.send_replace(remaining);
                }
                Tick::Expired => {
                    tx.send_replace(0);
                    tracing::info!("exam timer expired");
                    fire();
                    return;
                }
                Tick::Idle => return,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> (Arc<AtomicU32>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicU32::new(0));
        let handle = Arc::clone(&fired);
        (fired, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn one_second_budget_fires_once() {
        let (fired, on_expire) = counter();
        let timer = ExamTimer::start(Countdown::new(1), on_expire);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.remaining_seconds(), 1);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.remaining_seconds(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticking_without_callback() {
        let (fired, on_expire) = counter();
        let timer = ExamTimer::start(Countdown::new(3), on_expire);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(timer.remaining_seconds(), 2);
        timer.stop();
        assert!(timer.is_stopped());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.remaining_seconds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_cancels_it() {
        let (fired, on_expire) = counter();
        let timer = ExamTimer::start(Countdown::new(2), on_expire);
        drop(timer);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_expires_without_waiting() {
        let (fired, on_expire) = counter();
        let _timer = ExamTimer::start(Countdown::new(0), on_expire);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn low_time_flag_follows_threshold() {
        let (_fired, on_expire) = counter();
        let timer = ExamTimer::start(Countdown::new(302).with_low_time_threshold(300), on_expire);
        assert!(!timer.is_low_time());
        assert_eq!(timer.format_hms(), "00:05:02");

        let mut rx = timer.subscribe();
        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 299);
        assert!(timer.is_low_time());
    }
}
