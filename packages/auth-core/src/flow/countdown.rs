use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Seconds before a verification code may be re-sent.
pub const RESEND_COOLDOWN_SECS: u32 = 60;

/// Countdown gating the resend action.
///
/// The remaining seconds live in a shared cell; a 1 Hz ticker decrements it
/// until zero. The ticker is scoped to the challenge it was started for and
/// aborted on drop, so no timer outlives the flow that owns it.
pub struct ResendCountdown {
    remaining: Arc<Mutex<u32>>,
    ticker: Option<JoinHandle<()>>,
}

impl ResendCountdown {
    /// Fresh countdown at the full cooldown, with a live ticker.
    pub fn start() -> Self {
        let mut countdown = Self::manual();
        countdown.spawn_ticker();
        countdown
    }

    /// Countdown without a ticker; `tick` drives it by hand.
    pub fn manual() -> Self {
        Self {
            remaining: Arc::new(Mutex::new(RESEND_COOLDOWN_SECS)),
            ticker: None,
        }
    }

    fn spawn_ticker(&mut self) {
        let remaining = Arc::clone(&self.remaining);
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(
                tokio::time::Instant::now() + Duration::from_secs(1),
                Duration::from_secs(1),
            );
            loop {
                interval.tick().await;
                if Self::decrement(&remaining) == 0 {
                    break;
                }
            }
        }));
    }

    fn decrement(remaining: &Mutex<u32>) -> u32 {
        let mut left = remaining.lock().unwrap();
        *left = left.saturating_sub(1);
        *left
    }

    /// Advance by one second.
    pub fn tick(&self) {
        Self::decrement(&self.remaining);
    }

    pub fn remaining(&self) -> u32 {
        *self.remaining.lock().unwrap()
    }

    pub fn can_resend(&self) -> bool {
        self.remaining() == 0
    }
}

impl Drop for ResendCountdown {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_full_cooldown() {
        let countdown = ResendCountdown::manual();
        assert_eq!(countdown.remaining(), 60);
        assert!(!countdown.can_resend());
    }

    #[test]
    fn test_resend_allowed_at_tick_sixty_exactly() {
        let countdown = ResendCountdown::manual();
        for tick in 1..=59 {
            countdown.tick();
            assert!(
                !countdown.can_resend(),
                "resend must stay blocked at tick {}",
                tick
            );
        }
        countdown.tick();
        assert!(countdown.can_resend(), "resend unblocks at tick 60");
    }

    #[test]
    fn test_tick_saturates_at_zero() {
        let countdown = ResendCountdown::manual();
        for _ in 0..100 {
            countdown.tick();
        }
        assert_eq!(countdown.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_counts_down_in_real_time() {
        let countdown = ResendCountdown::start();
        assert_eq!(countdown.remaining(), 60);

        // Let the spawned ticker run once so it arms its interval against the
        // paused clock before we start advancing time.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        tokio::time::advance(Duration::from_secs(59)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(!countdown.can_resend(), "one second short of the cooldown");

        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(countdown.can_resend());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_ticker() {
        let countdown = ResendCountdown::start();
        let remaining = Arc::clone(&countdown.remaining);
        drop(countdown);

        tokio::time::advance(Duration::from_secs(10)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*remaining.lock().unwrap(), 60, "aborted ticker must not tick");
    }
}
