//! Tick sources for the queue poller.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

/// Wakes the poller. Returning `false` stops the poll loop.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self) -> bool;
}

/// Fixed-period ticker. The first tick fires immediately. Periods shorter
/// than a millisecond are raised to one.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        // A slow cycle pushes the schedule back rather than bursting.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks once per message on a channel; stops when every sender is dropped.
pub struct ManualTicker {
    rx: mpsc::Receiver<()>,
}

impl ManualTicker {
    /// Returns the ticker and the handle used to trigger it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_ticker_stops_when_sender_dropped() {
        let (tx, mut ticker) = ManualTicker::channel(4);
        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();
        drop(tx);

        assert!(ticker.tick().await);
        assert!(ticker.tick().await);
        assert!(!ticker.tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_fires_immediately_then_periodically() {
        let start = tokio::time::Instant::now();
        let mut ticker = IntervalTicker::new(Duration::from_secs(60));

        assert!(ticker.tick().await);
        assert!(start.elapsed() < Duration::from_secs(1));

        assert!(ticker.tick().await);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_zero_period_is_clamped() {
        let start = tokio::time::Instant::now();
        let mut ticker = IntervalTicker::new(Duration::ZERO);

        assert!(ticker.tick().await);
        assert!(ticker.tick().await);
        assert!(start.elapsed() >= Duration::from_millis(1));
    }
}
