//! Fixed-window budget on outbound fetch attempts.

use super::error::RateError;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fetch attempts allowed per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 5;

/// Length of the budget window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Window {
    started_at: Option<Instant>,
    count: u32,
}

/// Counts fetch attempts in a window that restarts once it has elapsed.
///
/// Every tier's fetch draws from the same budget. A rejected attempt does not
/// advance the counter.
#[derive(Debug)]
pub struct RequestBudget {
    max_requests: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RequestBudget {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(Window::default()),
        }
    }

    /// Lock the window, recovering from poison.
    fn lock_state(&self) -> MutexGuard<'_, Window> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Request budget mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Records one fetch attempt, or fails if the window's budget is spent.
    pub fn try_acquire(&self) -> Result<(), RateError> {
        let mut state = self.lock_state();
        let now = Instant::now();

        let in_window = state
            .started_at
            .is_some_and(|started| now.duration_since(started) < self.window);

        if in_window {
            if state.count >= self.max_requests {
                debug!(count = state.count, "Request budget exhausted");
                return Err(RateError::RateLimitExceeded {
                    limit: self.max_requests,
                    window_secs: self.window.as_secs(),
                });
            }
        } else {
            state.count = 0;
            state.started_at = Some(now);
        }

        state.count += 1;
        debug!(count = state.count, max = self.max_requests, "Request budget used");
        Ok(())
    }

    /// Attempts left in the current window.
    pub fn remaining(&self) -> u32 {
        let state = self.lock_state();
        match state.started_at {
            Some(started) if started.elapsed() < self.window => {
                self.max_requests.saturating_sub(state.count)
            }
            _ => self.max_requests,
        }
    }
}

impl Default for RequestBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_sixth_attempt_in_window_is_rejected() {
        let budget = RequestBudget::default();

        for _ in 0..5 {
            assert!(budget.try_acquire().is_ok());
        }
        assert_eq!(budget.remaining(), 0);
        assert_eq!(
            budget.try_acquire(),
            Err(RateError::RateLimitExceeded {
                limit: 5,
                window_secs: 60
            })
        );
    }

    #[test]
    fn test_rejections_do_not_advance_the_counter() {
        let budget = RequestBudget::new(2, Duration::from_secs(60));
        budget.try_acquire().unwrap();
        budget.try_acquire().unwrap();
        for _ in 0..3 {
            assert!(budget.try_acquire().is_err());
        }
        assert_eq!(budget.lock_state().count, 2);
    }

    #[test]
    fn test_budget_resets_after_window() {
        let budget = RequestBudget::new(5, Duration::from_millis(30));
        for _ in 0..5 {
            budget.try_acquire().unwrap();
        }
        assert!(budget.try_acquire().is_err());

        sleep(Duration::from_millis(40));

        assert_eq!(budget.remaining(), 5);
        for _ in 0..5 {
            assert!(budget.try_acquire().is_ok());
        }
        assert!(budget.try_acquire().is_err());
    }
}
