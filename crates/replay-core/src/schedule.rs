//! Scheduling primitives shared by the controller tasks.
//!
//! - [`Ticker`] -- autoplay timer that exists only while autoplay is on.
//! - [`settle`] -- await an optional in-flight fetch inside `select!`.
//!
//! Both yield a future that never resolves when there is nothing to wait
//! for, so controller loops can `select!` over them unconditionally.

use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Shortest period a ticker accepts; `Interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Recurring autoplay timer.
///
/// The underlying [`Interval`] is created when autoplay turns on and
/// dropped when it turns off, so no tick can be delivered for a stopped,
/// reset or disposed controller. Controllers still guard each tick with
/// their own autoplay flag.
#[derive(Debug, Default)]
pub struct Ticker {
    active: Option<(Duration, Interval)>,
}

impl Ticker {
    /// Create a stopped ticker.
    pub const fn new() -> Self {
        Self { active: None }
    }

    /// Bring the timer in line with the controller's autoplay flag.
    ///
    /// Starts the timer (first tick one full period from now) when enabled
    /// and stopped, restarts it when the period changed, and tears it down
    /// when disabled.
    pub fn sync(&mut self, enabled: bool, period: Duration) {
        if !enabled {
            if self.active.take().is_some() {
                debug!("autoplay timer stopped");
            }
            return;
        }

        let period = period.max(MIN_PERIOD);
        if self
            .active
            .as_ref()
            .is_some_and(|(current, _)| *current == period)
        {
            return;
        }

        let now = Instant::now();
        let first = now.checked_add(period).unwrap_or(now);
        let mut interval = tokio::time::interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.active = Some((period, interval));
        debug!(period_ms = period.as_millis(), "autoplay timer started");
    }

    #[cfg(test)]
    const fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Wait for the next tick; pends forever while stopped.
    pub async fn tick(&mut self) {
        match self.active.as_mut() {
            Some((_, interval)) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Wait for the fetch in `slot`, clearing the slot once it completes.
///
/// Pends forever when the slot is empty. Cancel-safe: dropping the future
/// before completion leaves the handle in place.
pub async fn settle<T>(slot: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    let Some(handle) = slot.as_mut() else {
        return std::future::pending().await;
    };
    let outcome = handle.await;
    *slot = None;
    outcome
}

/// Abort the fetch in `slot`, if any.
pub fn abort<T>(slot: &mut Option<JoinHandle<T>>) {
    if let Some(handle) = slot.take() {
        handle.abort();
    }
}
