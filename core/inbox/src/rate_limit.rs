use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use idea_inbox_schemas::OwnerId;

pub const DEFAULT_MAX_REQUESTS: usize = 15;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Decides whether an owner may issue another request right now
pub trait RateLimiter: Send {
    /// Records the request when it is allowed
    fn is_allowed(&mut self, owner_id: OwnerId) -> bool;
}

/// Per-owner sliding window over request instants
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    requests: HashMap<OwnerId, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: HashMap::new(),
            last_sweep: None,
        }
    }

    pub fn is_allowed_at(&mut self, owner_id: OwnerId, now: Instant) -> bool {
        self.sweep_idle(now);

        let window = self.window;
        let history = self.requests.entry(owner_id).or_default();
        drop_expired(history, now, window);

        if history.len() >= self.max_requests {
            if history.is_empty() {
                self.requests.remove(&owner_id);
            }
            warn!("Rate limit exceeded for owner {}", owner_id);
            return false;
        }

        history.push_back(now);
        true
    }

    /// Owners that still have requests inside the window
    pub fn tracked_owners(&self) -> usize {
        self.requests.len()
    }

    /// At most once per window, forget owners whose requests have all expired
    fn sweep_idle(&mut self, now: Instant) {
        if let Some(last) = self.last_sweep {
            if now.saturating_duration_since(last) < self.window {
                return;
            }
        }
        self.last_sweep = Some(now);

        let window = self.window;
        let before = self.requests.len();
        self.requests.retain(|_, history| {
            drop_expired(history, now, window);
            !history.is_empty()
        });
        let removed = before - self.requests.len();
        if removed > 0 {
            debug!("Forgot {} idle owner(s) in rate limiter", removed);
        }
    }
}

fn drop_expired(history: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = history.front() {
        if now.saturating_duration_since(*oldest) >= window {
            history.pop_front();
        } else {
            break;
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn is_allowed(&mut self, owner_id: OwnerId) -> bool {
        self.is_allowed_at(owner_id, Instant::now())
    }
}
