use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Rate limiter for transaction-building commands.
///
/// Every command that ends in an unsigned transaction (a nonce fetch, a
/// simulation, a DB row) shares one per-user cooldown. Read-only commands
/// (/balance, /climbs, /pending) are not limited.
#[derive(Clone)]
pub struct RateLimiter {
    /// Earliest next-allowed instant per user
    limits: Arc<Mutex<HashMap<i64, Instant>>>,
    cooldown: Duration,
}

impl RateLimiter {
    /// Create a rate limiter with the default cooldown from config.
    pub fn new() -> Self {
        Self::with_cooldown(crate::core::config::rate_limit::duration())
    }

    /// Create a rate limiter with a custom cooldown.
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            limits: Arc::new(Mutex::new(HashMap::new())),
            cooldown,
        }
    }

    /// Returns `true` if the user must still wait before the next
    /// transaction-building command.
    pub async fn is_rate_limited(&self, user_id: i64) -> bool {
        let limits = self.limits.lock().await;
        if let Some(&instant) = limits.get(&user_id) {
            if Instant::now() < instant {
                return true;
            }
        }
        false
    }

    /// Remaining wait time for the user, if any.
    pub async fn get_remaining_time(&self, user_id: i64) -> Option<Duration> {
        let limits = self.limits.lock().await;
        if let Some(&instant) = limits.get(&user_id) {
            let now = Instant::now();
            if now < instant {
                return Some(instant - now);
            }
        }
        None
    }

    /// Start a new cooldown window for the user. Called after a transaction
    /// was successfully built.
    pub async fn update_rate_limit(&self, user_id: i64) {
        let mut limits = self.limits.lock().await;
        limits.insert(user_id, Instant::now() + self.cooldown);
    }

    /// Drop the user's cooldown (admin reset, /cancel).
    pub async fn remove_rate_limit(&self, user_id: i64) {
        let mut limits = self.limits.lock().await;
        limits.remove(&user_id);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_user_is_not_limited() {
        let limiter = RateLimiter::with_cooldown(Duration::from_secs(30));
        assert!(!limiter.is_rate_limited(1).await);
        assert!(limiter.get_remaining_time(1).await.is_none());
    }

    #[tokio::test]
    async fn limited_after_update() {
        let limiter = RateLimiter::with_cooldown(Duration::from_secs(30));
        limiter.update_rate_limit(1).await;
        assert!(limiter.is_rate_limited(1).await);
        assert!(limiter.get_remaining_time(1).await.is_some());
        // A different user is unaffected
        assert!(!limiter.is_rate_limited(2).await);
    }

    #[tokio::test]
    async fn remove_clears_the_window() {
        let limiter = RateLimiter::with_cooldown(Duration::from_secs(30));
        limiter.update_rate_limit(1).await;
        limiter.remove_rate_limit(1).await;
        assert!(!limiter.is_rate_limited(1).await);
    }

    #[tokio::test]
    async fn zero_cooldown_never_limits() {
        let limiter = RateLimiter::with_cooldown(Duration::from_secs(0));
        limiter.update_rate_limit(1).await;
        assert!(!limiter.is_rate_limited(1).await);
    }
}
