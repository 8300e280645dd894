//! RateLimiter: sliding-window request accounting, two scopes (user,
//! organization) x two horizons (minute, day). Process-local, self-cleaning.

mod clock;

pub use clock::{Clock, FixedClock, SystemClock};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cre_ai_policy::PolicyConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CLEANUP_INTERVAL: ChronoDuration = ChronoDuration::minutes(5);
const EVICTION_CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    UserPerMinute,
    UserPerDay,
    OrgPerMinute,
    OrgPerDay,
}

impl LimitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::UserPerMinute => "user_per_minute",
            LimitType::UserPerDay => "user_per_day",
            LimitType::OrgPerMinute => "org_per_minute",
            LimitType::OrgPerDay => "org_per_day",
        }
    }
}

/// Outcome of `RateLimiter::check`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    pub retry_after_seconds: Option<u64>,
    pub limit_type: Option<LimitType>,
    pub current: Option<u32>,
    pub limit: Option<u32>,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            retry_after_seconds: None,
            limit_type: None,
            current: None,
            limit: None,
        }
    }

    fn deny(limit_type: LimitType, retry_after_seconds: u64, current: u32, limit: u32) -> Self {
        Self {
            allowed: false,
            reason: Some("rate_limit_exceeded".to_string()),
            retry_after_seconds: Some(retry_after_seconds),
            limit_type: Some(limit_type),
            current: Some(current),
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    timestamps: VecDeque<DateTime<Utc>>,
    last_cleanup: Option<DateTime<Utc>>,
}

/// Sliding-window rate limiter, one shared instance per process.
pub struct RateLimiter {
    config: PolicyConfig,
    clock: Arc<dyn Clock>,
    user_store: Mutex<HashMap<String, Entry>>,
    org_store: Mutex<HashMap<String, Entry>>,
    shutdown: Arc<AtomicBool>,
}

impl RateLimiter {
    pub fn new(config: PolicyConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: PolicyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            user_store: Mutex::new(HashMap::new()),
            org_store: Mutex::new(HashMap::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    fn minute_window(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.config.minute_window().as_secs() as i64)
    }

    fn day_window(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.config.day_window().as_secs() as i64)
    }

    /// Check order: user-per-minute -> user-per-day -> org-per-minute ->
    /// org-per-day; first denial wins. Organization scope is skipped when
    /// `org_id` is `None`.
    #[tracing::instrument(skip(self))]
    pub fn check(&self, user_id: &str, org_id: Option<&str>) -> RateLimitDecision {
        let now = self.clock.now();

        if let Some(denial) = self.check_scope(
            &self.user_store,
            user_id,
            now,
            self.config.user_per_minute,
            self.config.user_per_day,
            LimitType::UserPerMinute,
            LimitType::UserPerDay,
        ) {
            return denial;
        }

        if let Some(org) = org_id {
            if let Some(denial) = self.check_scope(
                &self.org_store,
                org,
                now,
                self.config.org_per_minute,
                self.config.org_per_day,
                LimitType::OrgPerMinute,
                LimitType::OrgPerDay,
            ) {
                return denial;
            }
        }

        RateLimitDecision::allow()
    }

    /// Record a request. Intended to be called only after a successful
    /// `check` and before downstream work begins, so aborted downstream
    /// calls still consume quota.
    #[tracing::instrument(skip(self))]
    pub fn record(&self, user_id: &str, org_id: Option<&str>) {
        let now = self.clock.now();
        Self::push(&self.user_store, user_id, now);
        if let Some(org) = org_id {
            Self::push(&self.org_store, org, now);
        }
    }

    fn push(store: &Mutex<HashMap<String, Entry>>, key: &str, now: DateTime<Utc>) {
        let mut guard = store.lock();
        let entry = guard.entry(key.to_string()).or_default();
        entry.timestamps.push_back(now);
    }

    #[allow(clippy::too_many_arguments)]
    fn check_scope(
        &self,
        store: &Mutex<HashMap<String, Entry>>,
        key: &str,
        now: DateTime<Utc>,
        minute_limit: u32,
        day_limit: u32,
        minute_limit_type: LimitType,
        day_limit_type: LimitType,
    ) -> Option<RateLimitDecision> {
        let mut guard = store.lock();
        let entry = guard.entry(key.to_string()).or_default();

        let day_window = self.day_window();
        let minute_window = self.minute_window();

        let needs_cleanup = match entry.last_cleanup {
            Some(last) => now.signed_duration_since(last) > CLEANUP_INTERVAL,
            None => true,
        };
        if needs_cleanup {
            let cutoff = now - day_window;
            entry.timestamps.retain(|ts| *ts >= cutoff);
            entry.last_cleanup = Some(now);
        }

        let minute_cutoff = now - minute_window;
        let minute_count = entry
            .timestamps
            .iter()
            .filter(|ts| **ts >= minute_cutoff)
            .count() as u32;
        let day_count = entry.timestamps.len() as u32;

        if minute_count >= minute_limit {
            let oldest_in_minute = entry
                .timestamps
                .iter()
                .find(|ts| **ts >= minute_cutoff)
                .copied()
                .unwrap_or(now);
            return Some(RateLimitDecision::deny(
                minute_limit_type,
                ceil_seconds(oldest_in_minute + minute_window, now),
                minute_count,
                minute_limit,
            ));
        }

        if day_count >= day_limit {
            let oldest = entry.timestamps.front().copied().unwrap_or(now);
            return Some(RateLimitDecision::deny(
                day_limit_type,
                ceil_seconds(oldest + day_window, now),
                day_count,
                day_limit,
            ));
        }

        None
    }

    /// Evict entries whose newest timestamp predates `day_window + minute`
    ///. Exposed directly so tests don't
    /// need to wait an hour; `spawn_eviction_task` calls this on a timer.
    pub fn evict_stale(&self) {
        let now = self.clock.now();
        let cutoff = now - self.day_window() - self.minute_window();
        for store in [&self.user_store, &self.org_store] {
            let mut guard = store.lock();
            guard.retain(|_, entry| {
                entry
                    .timestamps
                    .back()
                    .map(|newest| *newest >= cutoff)
                    .unwrap_or(false)
            });
        }
    }

    /// Start the hourly eviction task. Stops when `shutdown` is called or the
    /// returned handle is dropped... actually the handle must be kept alive;
    /// call `shutdown()` to request a clean stop.
    pub fn spawn_eviction_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        let shutdown = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(EVICTION_CHECK_INTERVAL);
            loop {
                interval.tick().await;
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                limiter.evict_stale();
            }
        })
    }

    /// Request the eviction task (if running) to stop at its next tick.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

fn ceil_seconds(target: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let nanos = (target - now).num_nanoseconds().unwrap_or(0).max(0);
    let secs = nanos as f64 / 1_000_000_000.0;
    secs.ceil().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config_with_user_per_minute(n: u32) -> PolicyConfig {
        let mut cfg = PolicyConfig::default();
        cfg.user_per_minute = n;
        cfg
    }

    #[test]
    fn burn_denies_after_limit_reached() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
        let limiter = RateLimiter::with_clock(config_with_user_per_minute(2), clock.clone());

        limiter.record("u1", None);
        limiter.record("u1", None);
        limiter.record("u1", None);

        let decision = limiter.check("u1", None);
        assert!(!decision.allowed);
        assert_eq!(decision.limit_type, Some(LimitType::UserPerMinute));
        assert!(decision.retry_after_seconds.unwrap() <= 60);
    }

    #[test]
    fn allows_under_limit() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
        let limiter = RateLimiter::with_clock(config_with_user_per_minute(5), clock.clone());
        limiter.record("u1", None);
        let decision = limiter.check("u1", None);
        assert!(decision.allowed);
    }

    #[test]
    fn window_slides_forward_over_time() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let limiter = RateLimiter::with_clock(config_with_user_per_minute(1), clock.clone());

        limiter.record("u1", None);
        assert!(!limiter.check("u1", None).allowed);

        clock.advance(ChronoDuration::seconds(61));
        assert!(limiter.check("u1", None).allowed);
    }

    #[test]
    fn organization_scope_skipped_when_absent() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
        let mut cfg = PolicyConfig::default();
        cfg.org_per_minute = 0;
        let limiter = RateLimiter::with_clock(cfg, clock);
        // Org limit of 0 would deny immediately if evaluated; org_id is None
        // so it must never be checked.
        assert!(limiter.check("u1", None).allowed);
    }

    #[test]
    fn user_check_order_wins_before_org() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
        let mut cfg = PolicyConfig::default();
        cfg.user_per_minute = 1;
        cfg.org_per_minute = 1;
        let limiter = RateLimiter::with_clock(cfg, clock);
        limiter.record("u1", Some("o1"));
        let decision = limiter.check("u1", Some("o1"));
        assert_eq!(decision.limit_type, Some(LimitType::UserPerMinute));
    }

    #[test]
    fn evict_stale_removes_old_entries() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let limiter = RateLimiter::with_clock(PolicyConfig::default(), clock.clone());
        limiter.record("u1", None);
        clock.advance(ChronoDuration::days(2));
        limiter.evict_stale();
        assert!(limiter.user_store.lock().get("u1").is_none());
    }

    #[test]
    fn never_exceeds_limit_within_window() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let limiter = RateLimiter::with_clock(config_with_user_per_minute(3), clock.clone());

        let mut admitted = 0u32;
        for _ in 0..10 {
            let decision = limiter.check("u1", None);
            if decision.allowed {
                limiter.record("u1", None);
                admitted += 1;
            }
        }
        assert!(admitted <= 3);
    }
}
