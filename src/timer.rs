//! One-second countdown used for the duration of a single quiz.
//!
//! [`Countdown`] holds the arithmetic; [`QuizTimer`] drives it from a Tokio
//! task and owns that task for as long as the timer lives.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(u32),
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    duration: u32,
    remaining: u32,
}

impl Countdown {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration: duration_secs,
            remaining: duration_secs,
        }
    }

    /// Advances one second. Reaching zero clamps and reports expiry.
    pub fn tick(&mut self) -> Tick {
        if self.remaining <= 1 {
            self.remaining = 0;
            Tick::Expired
        } else {
            self.remaining -= 1;
            Tick::Running(self.remaining)
        }
    }

    pub fn reset(&mut self) {
        self.remaining = self.duration;
    }

    pub fn set_duration(&mut self, duration_secs: u32) {
        self.duration = duration_secs;
        self.remaining = duration_secs;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }
}

pub type ExpiryCallback = Arc<dyn Fn() + Send + Sync>;

/// Countdown timer with exactly-once expiry.
///
/// The callback runs on the timer task while the countdown is locked, so it
/// must not call back into the timer. Dropping the timer cancels it.
pub struct QuizTimer {
    countdown: Arc<Mutex<Countdown>>,
    on_expire: ExpiryCallback,
    running: Option<CancellationToken>,
}

impl QuizTimer {
    pub fn new(duration_secs: u32, on_expire: ExpiryCallback) -> Self {
        Self {
            countdown: Arc::new(Mutex::new(Countdown::new(duration_secs))),
            on_expire,
            running: None,
        }
    }

    /// Starts counting down. Has no effect while a countdown is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let countdown = Arc::clone(&self.countdown);
        let on_expire = Arc::clone(&self.on_expire);
        self.running = Some(token);

        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticks.tick() => {
                        if !advance(&countdown, &cancelled, &on_expire) {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Cancels the countdown, keeping the remaining time as it is.
    ///
    /// Waits for an in-flight tick to finish, so no expiry fires after this returns.
    pub fn stop(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
            drop(lock(&self.countdown));
        }
    }

    /// Stops and restores the configured duration. Does not restart.
    pub fn reset(&mut self) {
        self.stop();
        lock(&self.countdown).reset();
    }

    /// Stops and reconfigures for a new duration. The caller restarts it.
    pub fn set_duration(&mut self, duration_secs: u32) {
        self.stop();
        lock(&self.countdown).set_duration(duration_secs);
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|t| !t.is_cancelled())
            .unwrap_or(false)
    }

    pub fn remaining(&self) -> u32 {
        lock(&self.countdown).remaining()
    }

    pub fn duration(&self) -> u32 {
        lock(&self.countdown).duration()
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
        }
    }
}

impl std::fmt::Debug for QuizTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizTimer")
            .field("countdown", &*lock(&self.countdown))
            .field("running", &self.is_running())
            .finish()
    }
}

/// Applies one tick. Returns `false` once the countdown should stop.
fn advance(
    countdown: &Mutex<Countdown>,
    cancelled: &CancellationToken,
    on_expire: &ExpiryCallback,
) -> bool {
    let mut guard = lock(countdown);
    if cancelled.is_cancelled() {
        return false;
    }
    match guard.tick() {
        Tick::Running(_) => true,
        Tick::Expired => {
            cancelled.cancel();
            on_expire();
            false
        }
    }
}

fn lock(countdown: &Mutex<Countdown>) -> MutexGuard<'_, Countdown> {
    countdown.lock().expect("countdown mutex poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counting_timer(duration_secs: u32) -> (QuizTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = QuizTimer::new(
            duration_secs,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (timer, fired)
    }

    #[test]
    fn countdown_clamps_at_zero() {
        let mut c = Countdown::new(2);
        assert_eq!(c.tick(), Tick::Running(1));
        assert_eq!(c.tick(), Tick::Expired);
        assert_eq!(c.remaining(), 0);
        assert_eq!(c.tick(), Tick::Expired);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn countdown_set_duration_replaces_remaining() {
        let mut c = Countdown::new(600);
        c.tick();
        c.set_duration(480);
        assert_eq!(c.remaining(), 480);
        c.tick();
        c.reset();
        assert_eq!(c.remaining(), 480);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_exactly_once_for_various_durations() {
        for duration in [1u32, 2, 5, 30] {
            let (mut timer, fired) = counting_timer(duration);
            timer.start();
            sleep(Duration::from_millis(u64::from(duration) * 1000 + 500)).await;
            assert_eq!(fired.load(Ordering::SeqCst), 1, "duration {}", duration);
            assert_eq!(timer.remaining(), 0);
            assert!(!timer.is_running());

            sleep(Duration::from_secs(5)).await;
            assert_eq!(fired.load(Ordering::SeqCst), 1, "duration {}", duration);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_does_not_double_the_rate() {
        let (mut timer, _) = counting_timer(10);
        timer.start();
        timer.start();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(timer.remaining(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_and_restores_duration() {
        let (mut timer, fired) = counting_timer(10);
        timer.start();
        sleep(Duration::from_millis(2500)).await;
        assert_eq!(timer.remaining(), 8);

        timer.reset();
        assert_eq!(timer.remaining(), 10);
        assert!(!timer.is_running());

        sleep(Duration::from_secs(20)).await;
        assert_eq!(timer.remaining(), 10);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn new_duration_requires_a_fresh_start() {
        let (mut timer, fired) = counting_timer(600);
        timer.start();
        sleep(Duration::from_millis(3500)).await;

        timer.set_duration(300);
        assert_eq!(timer.remaining(), 300);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(timer.remaining(), 300);

        timer.start();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(timer.remaining(), 299);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_expiry_fires_again() {
        let (mut timer, fired) = counting_timer(1);
        timer.start();
        sleep(Duration::from_millis(1500)).await;
        timer.reset();
        timer.start();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_cancels_expiry() {
        let (mut timer, fired) = counting_timer(2);
        timer.start();
        sleep(Duration::from_millis(500)).await;
        drop(timer);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
