//! Polling cadence and shutdown signalling for the continuous mode.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

/// Lower bound for the poll period; tokio refuses a zero interval.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Sending half of a shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Signals every [`Shutdown`] cloned from this channel. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half of a shutdown signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: Option<watch::Receiver<bool>>,
}

/// Creates a connected trigger/receiver pair.
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx: Some(rx) })
}

impl Shutdown {
    /// A signal that never fires.
    pub fn never() -> Self {
        Shutdown { rx: None }
    }

    pub fn is_triggered(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once shutdown has been requested.
    ///
    /// If the trigger is dropped without firing, this never resolves.
    pub async fn triggered(&mut self) {
        match self.rx.as_mut() {
            Some(rx) => {
                let closed = rx.wait_for(|fired| *fired).await.is_err();
                if closed {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Outcome of waiting for the next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Elapsed,
    Shutdown,
}

/// Fixed-delay ticking source: each wait lasts one full period from the
/// moment it starts, so a long pass never causes back-to-back polls.
#[derive(Debug)]
pub struct Ticker {
    interval: Interval,
    period: Duration,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        let period = period.max(MIN_PERIOD);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ticker { interval, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits one period, or less if `shutdown` fires first.
    pub async fn wait(&mut self, shutdown: &mut Shutdown) -> Tick {
        if shutdown.is_triggered() {
            return Tick::Shutdown;
        }
        self.interval.reset();
        tokio::select! {
            _ = self.interval.tick() => Tick::Elapsed,
            _ = shutdown.triggered() => Tick::Shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticker_waits_a_full_period() {
        let mut ticker = Ticker::new(Duration::from_secs(10));
        let mut shutdown = Shutdown::never();
        let started = tokio::time::Instant::now();

        assert_eq!(ticker.wait(&mut shutdown).await, Tick::Elapsed);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_wait() {
        let mut ticker = Ticker::new(Duration::from_secs(3600));
        let (trigger, mut shutdown) = shutdown_channel();

        let waiter = tokio::spawn(async move { ticker.wait(&mut shutdown).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.trigger();

        assert_eq!(waiter.await.unwrap(), Tick::Shutdown);
    }

    #[tokio::test]
    async fn already_triggered_returns_immediately() {
        let mut ticker = Ticker::new(Duration::from_secs(3600));
        let (trigger, mut shutdown) = shutdown_channel();
        trigger.trigger();
        assert!(shutdown.is_triggered());
        assert_eq!(ticker.wait(&mut shutdown).await, Tick::Shutdown);
    }

    #[tokio::test]
    async fn zero_period_is_clamped() {
        assert_eq!(Ticker::new(Duration::ZERO).period(), MIN_PERIOD);
    }

    #[test]
    fn never_is_never_triggered() {
        assert!(!Shutdown::never().is_triggered());
    }
}
