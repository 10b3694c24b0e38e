//! Sliding-window request admission.
//!
//! Guards the paid edit service against bursts from a single client. The
//! limiter remembers the instant of every admitted request inside the
//! trailing window and admits a new one while fewer than `max_requests` are
//! on record. Entries that fall out of the window are pruned lazily on each
//! read.
//!
//! The limit is per limiter instance: nothing is persisted and nothing is
//! shared across processes, so it is advisory rather than a global quota.
//!
//! [`RateLimiter::try_acquire`] checks and records under one lock. The
//! separate [`check`](RateLimiter::check) / [`record_request`](RateLimiter::record_request)
//! pair is kept for callers that want to inspect before committing, but two
//! callers can both pass `check` before either records.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Source of the current instant. Injected so tests can move time by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time via [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the limiter.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window: Duration::from_secs(120),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// Requests still available after this one, when allowed.
    pub remaining: Option<u32>,
    /// How long until a slot frees up, when denied.
    pub retry_after: Option<Duration>,
    /// User-facing explanation, when denied.
    pub message: Option<String>,
}

impl Admission {
    fn allowed(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining: Some(remaining),
            retry_after: None,
            message: None,
        }
    }

    fn denied(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            remaining: None,
            retry_after: Some(retry_after),
            message: Some(denial_message(retry_after)),
        }
    }
}

/// "Please wait N seconds", rounding any partial second up.
pub fn denial_message(retry_after: Duration) -> String {
    let secs = retry_after.as_millis().div_ceil(1000);
    format!("Too many requests. Please wait {secs} seconds before trying again.")
}

/// Sliding-window limiter over a chronological queue of request instants.
#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    config: RateLimitConfig,
    clock: C,
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter<SystemClock> {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(config: RateLimitConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            requests: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every entry that is `window` or more old. Idempotent.
    fn prune(&self, requests: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = requests.front() {
            if now.saturating_duration_since(oldest) >= self.config.window {
                requests.pop_front();
            } else {
                break;
            }
        }
    }

    fn admission(&self, requests: &VecDeque<Instant>, now: Instant) -> Admission {
        let count = requests.len() as u32;
        if count < self.config.max_requests {
            return Admission::allowed(self.config.max_requests - count - 1);
        }
        let elapsed = requests
            .front()
            .map(|&oldest| now.saturating_duration_since(oldest))
            .unwrap_or_default();
        Admission::denied(self.config.window.saturating_sub(elapsed))
    }

    /// Would a request be admitted right now? Only prunes; records nothing.
    pub fn check(&self) -> Admission {
        let now = self.clock.now();
        let mut requests = self.lock();
        self.prune(&mut requests, now);
        self.admission(&requests, now)
    }

    /// Record a request at the current instant, unconditionally.
    pub fn record_request(&self) {
        let now = self.clock.now();
        self.lock().push_back(now);
    }

    /// Check and, when allowed, record in one step.
    pub fn try_acquire(&self) -> Admission {
        let now = self.clock.now();
        let mut requests = self.lock();
        self.prune(&mut requests, now);
        let admission = self.admission(&requests, now);
        if admission.allowed {
            requests.push_back(now);
        }
        admission
    }

    /// Slots left in the current window.
    pub fn remaining_requests(&self) -> u32 {
        let now = self.clock.now();
        let mut requests = self.lock();
        self.prune(&mut requests, now);
        self.config
            .max_requests
            .saturating_sub(requests.len() as u32)
    }

    /// Time until the oldest recorded request leaves the window. Zero when
    /// nothing is recorded.
    pub fn next_available_in(&self) -> Duration {
        let now = self.clock.now();
        let requests = self.lock();
        match requests.front() {
            Some(&oldest) => self
                .config
                .window
                .saturating_sub(now.saturating_duration_since(oldest)),
            None => Duration::ZERO,
        }
    }
}
