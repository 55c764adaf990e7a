//! Debounced recomputation.
//!
//! A [`Debouncer`] is a single cancellable scheduled task owned by one
//! actor. Scheduling replaces the pending value and moves the deadline in
//! the same call, so a superseded deadline can never fire and a stale value
//! can never be delivered after a fresher one.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// Default quiet period before a recomputation runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Coalesces rapid updates; only the last value survives the quiet period.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<T>,
    timer: Pin<Box<Sleep>>,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            timer: Box::pin(sleep(delay)),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending value and restart the quiet period.
    pub fn schedule(&mut self, value: T) {
        self.pending = Some(value);
        self.timer.as_mut().reset(Instant::now() + self.delay);
    }

    /// Drop the pending value without firing.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take()
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolves with the latest value once the quiet period elapses.
    ///
    /// Never resolves while nothing is scheduled, which makes it safe to
    /// poll from a `tokio::select!` loop every iteration.
    pub async fn fired(&mut self) -> T {
        loop {
            if self.pending.is_none() {
                std::future::pending::<()>().await;
            }

            self.timer.as_mut().await;

            // Fire only once the current deadline has passed.
            if Instant::now() >= self.timer.deadline() {
                if let Some(value) = self.pending.take() {
                    return value;
                }
            }
        }
    }
}
