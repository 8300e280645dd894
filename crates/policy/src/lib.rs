//! PolicyConfig: process-wide tunables for the AI Safety & Governance Gateway.
//!
//! Values are bound once at startup from the environment and then shared
//! read-only (behind an `Arc`) by every downstream component. Each key has a
//! documented default so the gateway behaves sanely with no environment at
//! all.

use std::env;
use std::time::Duration;

/// The full recognized option set, one field per row.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Master switch for `SecurityPipeline`.
    pub security_enabled: bool,
    /// Jailbreak score at or above which input is blocked.
    pub jailbreak_block_threshold: f64,
    /// Jailbreak score at or above which input is warned (but not blocked).
    pub jailbreak_warn_threshold: f64,
    /// Inputs longer than this are truncated.
    pub max_input_length: usize,
    /// Master switch for output validation.
    pub output_validation_enabled: bool,
    /// Master switch for the consent check (if false, consent always passes).
    pub consent_enabled: bool,
    /// Pre-consent grace window, in days, for migrated users.
    pub consent_grace_period_days: i64,
    /// Auto-expiry window from grant, in months.
    pub consent_expiration_months: i64,
    /// Current consent policy version, compared by string equality.
    pub current_policy_version: String,
    /// Per-user request limit per minute.
    pub user_per_minute: u32,
    /// Per-user request limit per day.
    pub user_per_day: u32,
    /// Per-organization request limit per minute.
    pub org_per_minute: u32,
    /// Per-organization request limit per day.
    pub org_per_day: u32,
    /// Fractional spread across document sources that triggers a conflict flag.
    pub conflict_variance_threshold: f64,
    /// Confidence below which a field is flagged for review.
    pub low_confidence_threshold: f64,
    /// Minimum evaluator sub-score; below this, a parse session is EVAL_FAILED.
    pub eval_min_score: u8,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            security_enabled: true,
            jailbreak_block_threshold: 0.8,
            jailbreak_warn_threshold: 0.5,
            max_input_length: 10_000,
            output_validation_enabled: true,
            consent_enabled: true,
            consent_grace_period_days: 14,
            consent_expiration_months: 12,
            current_policy_version: "1.0.0".to_string(),
            user_per_minute: 20,
            user_per_day: 200,
            org_per_minute: 500,
            org_per_day: 5_000,
            conflict_variance_threshold: 0.05,
            low_confidence_threshold: 0.7,
            eval_min_score: 70,
        }
    }
}

impl PolicyConfig {
    /// Load configuration from environment variables, falling back to the
    /// documented default for any key that is absent or fails to parse.
    ///
    /// Variable names are identical to the config keys, prefixed `AI_` and
    /// SCREAMING_SNAKE_CASE, e.g. `AI_JAILBREAK_BLOCK_THRESHOLD`.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            security_enabled: env_bool("AI_SECURITY_ENABLED", default.security_enabled),
            jailbreak_block_threshold: env_f64(
                "AI_JAILBREAK_BLOCK_THRESHOLD",
                default.jailbreak_block_threshold,
            ),
            jailbreak_warn_threshold: env_f64(
                "AI_JAILBREAK_WARN_THRESHOLD",
                default.jailbreak_warn_threshold,
            ),
            max_input_length: env_usize("AI_MAX_INPUT_LENGTH", default.max_input_length),
            output_validation_enabled: env_bool(
                "AI_OUTPUT_VALIDATION_ENABLED",
                default.output_validation_enabled,
            ),
            consent_enabled: env_bool("AI_CONSENT_ENABLED", default.consent_enabled),
            consent_grace_period_days: env_i64(
                "AI_CONSENT_GRACE_PERIOD_DAYS",
                default.consent_grace_period_days,
            ),
            consent_expiration_months: env_i64(
                "AI_CONSENT_EXPIRATION_MONTHS",
                default.consent_expiration_months,
            ),
            current_policy_version: env::var("AI_CONSENT_POLICY_VERSION")
                .unwrap_or(default.current_policy_version),
            user_per_minute: env_u32("AI_RATE_LIMIT_USER_PER_MINUTE", default.user_per_minute),
            user_per_day: env_u32("AI_RATE_LIMIT_USER_PER_DAY", default.user_per_day),
            org_per_minute: env_u32("AI_RATE_LIMIT_ORG_PER_MINUTE", default.org_per_minute),
            org_per_day: env_u32("AI_RATE_LIMIT_ORG_PER_DAY", default.org_per_day),
            conflict_variance_threshold: env_f64(
                "AI_CONFLICT_VARIANCE_THRESHOLD",
                default.conflict_variance_threshold,
            ),
            low_confidence_threshold: env_f64(
                "AI_LOW_CONFIDENCE_THRESHOLD",
                default.low_confidence_threshold,
            ),
            eval_min_score: env_u8("AI_EVAL_MIN_SCORE", default.eval_min_score),
        }
    }

    /// Sliding-window duration for the per-minute rate-limit horizon.
    pub fn minute_window(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// Sliding-window duration for the per-day rate-limit horizon.
    pub fn day_window(&self) -> Duration {
        Duration::from_secs(86_400)
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "invalid boolean env var, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "invalid float env var, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "invalid u32 env var, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_u8(key: &str, default: u8) -> u8 {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "invalid u8 env var, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "invalid i64 env var, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "invalid usize env var, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = PolicyConfig::default();
        assert!(cfg.security_enabled);
        assert_eq!(cfg.jailbreak_block_threshold, 0.8);
        assert_eq!(cfg.jailbreak_warn_threshold, 0.5);
        assert_eq!(cfg.max_input_length, 10_000);
        assert_eq!(cfg.consent_grace_period_days, 14);
        assert_eq!(cfg.consent_expiration_months, 12);
        assert_eq!(cfg.current_policy_version, "1.0.0");
        assert_eq!(cfg.user_per_minute, 20);
        assert_eq!(cfg.user_per_day, 200);
        assert_eq!(cfg.org_per_minute, 500);
        assert_eq!(cfg.org_per_day, 5_000);
        assert_eq!(cfg.eval_min_score, 70);
    }

    #[test]
    fn bad_env_value_falls_back_to_default() {
        // SAFETY: test runs single-threaded env mutation is acceptable here.
        unsafe {
            env::set_var("AI_JAILBREAK_BLOCK_THRESHOLD", "not-a-number");
        }
        let cfg = PolicyConfig::from_env();
        assert_eq!(cfg.jailbreak_block_threshold, 0.8);
        unsafe {
            env::remove_var("AI_JAILBREAK_BLOCK_THRESHOLD");
        }
    }

    #[test]
    fn env_override_applies() {
        unsafe {
            env::set_var("AI_RATE_LIMIT_USER_PER_MINUTE", "5");
        }
        let cfg = PolicyConfig::from_env();
        assert_eq!(cfg.user_per_minute, 5);
        unsafe {
            env::remove_var("AI_RATE_LIMIT_USER_PER_MINUTE");
        }
    }
}
