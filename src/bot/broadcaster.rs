use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

pub const BROADCAST_INTERVAL: Duration = Duration::from_secs(30);
pub const BROADCAST_ITERATIONS: u32 = 5;
pub const BROADCAST_MESSAGE: &str = "?attack";

/// Fixed-count timer. It can be started once per lifetime and fires at most
/// `iterations` times, the first one immediately after starting.
#[derive(Debug)]
pub struct Broadcaster {
    period: Duration,
    remaining: u32,
    ticker: Option<Interval>,
    started: bool,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(BROADCAST_INTERVAL, BROADCAST_ITERATIONS)
    }
}

impl Broadcaster {
    pub fn new(period: Duration, iterations: u32) -> Self {
        Self {
            period,
            remaining: iterations,
            ticker: None,
            started: false,
        }
    }

    /// Returns `false` if the broadcaster was already started.
    pub fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        true
    }

    pub fn is_active(&self) -> bool {
        self.ticker.is_some() && self.remaining > 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Completes when the next firing is due. Never completes once the
    /// broadcaster is inactive, so it can sit in a `select!` unconditionally.
    pub async fn tick(&mut self) {
        if !self.is_active() {
            return std::future::pending::<()>().await;
        }
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.tick().await;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.ticker = None;
        }
    }
}
