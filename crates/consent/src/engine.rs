//! ConsentEngine: per-user consent lifecycle, versioning, audit log

use crate::clock::{Clock, SystemClock};
use crate::repository::ConsentRepository;
use crate::types::{
    consent_method, ConsentAudit, ConsentAuditAction, ConsentRecord, Feature, FeatureToggles,
};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};
use cre_ai_policy::PolicyConfig;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const PRE_CONSENT_VERSION: &str = "PRE_CONSENT";

/// Stable, wire-compatible reason code for a `check` decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckReason {
    ConsentDisabled,
    NoUserId,
    NoConsentRecord,
    ConsentWithdrawn,
    GracePeriod,
    ConsentNotGiven,
    ConsentExpired,
    PolicyUpdated,
    FeatureNotAllowed,
    ConsentValid,
}

impl CheckReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckReason::ConsentDisabled => "consent_disabled",
            CheckReason::NoUserId => "no_user_id",
            CheckReason::NoConsentRecord => "no_consent_record",
            CheckReason::ConsentWithdrawn => "consent_withdrawn",
            CheckReason::GracePeriod => "grace_period",
            CheckReason::ConsentNotGiven => "consent_not_given",
            CheckReason::ConsentExpired => "consent_expired",
            CheckReason::PolicyUpdated => "policy_updated",
            CheckReason::FeatureNotAllowed => "feature_not_allowed",
            CheckReason::ConsentValid => "consent_valid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsentCheckResult {
    pub valid: bool,
    pub reason: CheckReason,
    pub requires_consent: bool,
    pub record: Option<ConsentRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsentStatus {
    pub has_consent: bool,
    pub requires_consent: bool,
    pub requires_reconsent: bool,
    pub in_grace_period: bool,
}

#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("no consent record found for user")]
    NotFound,
    #[error("unknown feature identifier")]
    InvalidFeature,
    #[error("repository error: {0}")]
    Repository(#[from] crate::repository::ConsentRepoError),
}

#[derive(Debug, Default, Clone)]
pub struct GrantOptions {
    pub deal_parsing: Option<bool>,
    pub chat_assistant: Option<bool>,
    pub document_analysis: Option<bool>,
    pub insights: Option<bool>,
    pub consent_method: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Per-user consent lifecycle: grant, withdraw, feature toggles, grace
/// periods, and the decision table consulted on every AI request.
pub struct ConsentEngine {
    repository: Arc<dyn ConsentRepository>,
    config: PolicyConfig,
    clock: Arc<dyn Clock>,
}

impl ConsentEngine {
    pub fn new(repository: Arc<dyn ConsentRepository>, config: PolicyConfig) -> Self {
        Self::with_clock(repository, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<dyn ConsentRepository>,
        config: PolicyConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    /// Decision table, first matching row wins.
    #[tracing::instrument(skip(self))]
    pub async fn check(
        &self,
        user_id: Option<&str>,
        feature: Option<Feature>,
    ) -> Result<ConsentCheckResult, ConsentError> {
        if !self.config.consent_enabled {
            return Ok(ConsentCheckResult {
                valid: true,
                reason: CheckReason::ConsentDisabled,
                requires_consent: false,
                record: None,
            });
        }

        let Some(user_id) = user_id else {
            return Ok(ConsentCheckResult {
                valid: false,
                reason: CheckReason::NoUserId,
                requires_consent: true,
                record: None,
            });
        };

        let record = self.repository.find_by_user(user_id).await?;
        let now = self.clock.now();
        Ok(evaluate(&self.config, now, &record, feature))
    }

    #[tracing::instrument(skip(self, opts))]
    pub async fn grant(
        &self,
        user_id: &str,
        organization_id: &str,
        opts: GrantOptions,
    ) -> Result<ConsentRecord, ConsentError> {
        let now = self.clock.now();
        let existing = self.repository.find_by_user(user_id).await?;
        let before = existing.as_ref().map(|r| serde_json::to_value(r).unwrap());
        let id = existing.as_ref().map(|r| r.id).unwrap_or_else(Uuid::new_v4);

        let record = ConsentRecord {
            id,
            user_id: user_id.to_string(),
            organization_id: organization_id.to_string(),
            consent_given: true,
            consent_version: self.config.current_policy_version.clone(),
            consented_at: now,
            withdrawn_at: None,
            expires_at: Some(add_months(now, self.config.consent_expiration_months)),
            features: FeatureToggles {
                deal_parsing: opts.deal_parsing.unwrap_or(true),
                chat_assistant: opts.chat_assistant.unwrap_or(true),
                document_analysis: opts.document_analysis.unwrap_or(true),
                insights: opts.insights.unwrap_or(true),
            },
            consent_method: opts.consent_method.unwrap_or_else(|| consent_method::UI.to_string()),
            ip_address: opts.ip_address,
            user_agent: opts.user_agent,
        };

        let saved = self.repository.upsert(record).await?;
        self.write_audit(
            user_id,
            saved.id,
            ConsentAuditAction::ConsentGiven,
            before,
            &saved,
            None,
        )
        .await;
        Ok(saved)
    }

    #[tracing::instrument(skip(self))]
    pub async fn withdraw(
        &self,
        user_id: &str,
        reason: Option<String>,
    ) -> Result<ConsentRecord, ConsentError> {
        let existing = self
            .repository
            .find_by_user(user_id)
            .await?
            .ok_or(ConsentError::NotFound)?;
        let before = serde_json::to_value(&existing).unwrap();

        let mut record = existing;
        record.consent_given = false;
        record.withdrawn_at = Some(self.clock.now());
        record.features = FeatureToggles::all(false);

        let saved = self.repository.upsert(record).await?;
        self.write_audit(
            user_id,
            saved.id,
            ConsentAuditAction::ConsentWithdrawn,
            Some(before),
            &saved,
            reason,
        )
        .await;
        Ok(saved)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_feature(
        &self,
        user_id: &str,
        feature: Feature,
        allowed: bool,
    ) -> Result<ConsentRecord, ConsentError> {
        let existing = self
            .repository
            .find_by_user(user_id)
            .await?
            .ok_or(ConsentError::NotFound)?;
        let before = serde_json::to_value(&existing).unwrap();

        let mut record = existing;
        record.features.set(feature, allowed);

        let saved = self.repository.upsert(record).await?;
        self.write_audit(
            user_id,
            saved.id,
            ConsentAuditAction::FeatureToggled,
            Some(before),
            &saved,
            None,
        )
        .await;
        Ok(saved)
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_grace_period(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> Result<ConsentRecord, ConsentError> {
        if let Some(existing) = self.repository.find_by_user(user_id).await? {
            return Ok(existing);
        }
        let now = self.clock.now();
        let record = ConsentRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            organization_id: organization_id.to_string(),
            consent_given: false,
            consent_version: PRE_CONSENT_VERSION.to_string(),
            consented_at: now,
            withdrawn_at: None,
            expires_at: Some(now + ChronoDuration::days(self.config.consent_grace_period_days)),
            features: FeatureToggles::all(true),
            consent_method: consent_method::GRANDFATHERED.to_string(),
            ip_address: None,
            user_agent: None,
        };
        self.repository.upsert(record).await.map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_status(&self, user_id: &str) -> Result<ConsentStatus, ConsentError> {
        let record = self.repository.find_by_user(user_id).await?;
        let now = self.clock.now();
        Ok(derive_status(&self.config, now, &record))
    }

    async fn write_audit(
        &self,
        user_id: &str,
        consent_id: Uuid,
        action: ConsentAuditAction,
        before_state: Option<serde_json::Value>,
        after: &ConsentRecord,
        reason: Option<String>,
    ) {
        let audit = ConsentAudit {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            consent_id,
            action,
            policy_version: self.config.current_policy_version.clone(),
            before_state,
            after_state: serde_json::to_value(after).unwrap(),
            ip_address: after.ip_address.clone(),
            user_agent: after.user_agent.clone(),
            reason,
            created_at: self.clock.now(),
        };
        // Best-effort: a failure here must not fail the mutation it follows.
        if let Err(err) = self.repository.append_audit(audit).await {
            tracing::error!(error = %err, "consent audit write failed");
        }
    }
}

fn evaluate(
    config: &PolicyConfig,
    now: DateTime<Utc>,
    record: &Option<ConsentRecord>,
    feature: Option<Feature>,
) -> ConsentCheckResult {
    let Some(record) = record else {
        return ConsentCheckResult {
            valid: false,
            reason: CheckReason::NoConsentRecord,
            requires_consent: true,
            record: None,
        };
    };

    if record.withdrawn_at.is_some() {
        return ConsentCheckResult {
            valid: false,
            reason: CheckReason::ConsentWithdrawn,
            requires_consent: true,
            record: Some(record.clone()),
        };
    }

    if !record.consent_given {
        let in_grace = record.expires_at.map(|e| e > now).unwrap_or(false);
        return if in_grace {
            ConsentCheckResult {
                valid: true,
                reason: CheckReason::GracePeriod,
                requires_consent: false,
                record: Some(record.clone()),
            }
        } else {
            ConsentCheckResult {
                valid: false,
                reason: CheckReason::ConsentNotGiven,
                requires_consent: true,
                record: Some(record.clone()),
            }
        };
    }

    if let Some(expires_at) = record.expires_at {
        if expires_at <= now {
            return ConsentCheckResult {
                valid: false,
                reason: CheckReason::ConsentExpired,
                requires_consent: true,
                record: Some(record.clone()),
            };
        }
    }

    // PRE_CONSENT is a sentinel for grace-period records; it is never
    // compared against the live policy version.
    if record.consent_version != PRE_CONSENT_VERSION
        && record.consent_version != config.current_policy_version
    {
        return ConsentCheckResult {
            valid: false,
            reason: CheckReason::PolicyUpdated,
            requires_consent: true,
            record: Some(record.clone()),
        };
    }

    if let Some(feature) = feature {
        if !record.features.get(feature) {
            return ConsentCheckResult {
                valid: false,
                reason: CheckReason::FeatureNotAllowed,
                requires_consent: false,
                record: Some(record.clone()),
            };
        }
    }

    ConsentCheckResult {
        valid: true,
        reason: CheckReason::ConsentValid,
        requires_consent: false,
        record: Some(record.clone()),
    }
}

fn derive_status(
    config: &PolicyConfig,
    now: DateTime<Utc>,
    record: &Option<ConsentRecord>,
) -> ConsentStatus {
    let Some(record) = record else {
        return ConsentStatus {
            has_consent: false,
            requires_consent: true,
            requires_reconsent: false,
            in_grace_period: false,
        };
    };

    let in_grace_period = !record.consent_given
        && record.expires_at.map(|e| e > now).unwrap_or(false)
        && record.withdrawn_at.is_none();
    let requires_reconsent = record.consent_version != PRE_CONSENT_VERSION
        && record.consent_version != config.current_policy_version;
    let expired = record.expires_at.map(|e| e <= now).unwrap_or(false);
    let has_consent = record.consent_given
        && record.withdrawn_at.is_none()
        && !expired
        && !requires_reconsent;

    ConsentStatus {
        has_consent,
        requires_consent: !has_consent && !in_grace_period,
        requires_reconsent,
        in_grace_period,
    }
}

/// Month-calendar arithmetic: add `months` to `from`, clamping the day to the
/// target month's length (e.g. Jan 31 + 1 month -> Feb 28/29).
fn add_months(from: DateTime<Utc>, months: i64) -> DateTime<Utc> {
    let total_months = from.year() as i64 * 12 + (from.month() as i64 - 1) + months;
    let year = total_months.div_euclid(12) as i32;
    let month = (total_months.rem_euclid(12)) as u32 + 1;
    let last_day = days_in_month(year, month);
    let day = from.day().min(last_day);

    Utc.with_ymd_and_hms(
        year,
        month,
        day,
        from.hour(),
        from.minute(),
        from.second(),
    )
    .single()
    .expect("constructed date must be valid")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = Utc.with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0).single().unwrap();
    let first_of_this = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single().unwrap();
    (first_of_next - first_of_this).num_days() as u32
}

use chrono::Timelike;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryConsentRepository;

    fn engine_with_clock(clock: Arc<dyn Clock>) -> ConsentEngine {
        ConsentEngine::with_clock(
            Arc::new(InMemoryConsentRepository::new()),
            PolicyConfig::default(),
            clock,
        )
    }

    #[tokio::test]
    async fn grace_period_allows_access() {
        let clock = Arc::new(crate::clock::FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let engine = engine_with_clock(clock);
        engine.create_grace_period("u1", "o1").await.unwrap();
        let result = engine.check(Some("u1"), Some(Feature::ChatAssistant)).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.reason, CheckReason::GracePeriod);
    }

    #[tokio::test]
    async fn policy_bump_forces_reconsent() {
        let clock = Arc::new(crate::clock::FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let repo = Arc::new(InMemoryConsentRepository::new());
        let mut config = PolicyConfig::default();
        config.current_policy_version = "1.0.0".to_string();
        let engine = ConsentEngine::with_clock(repo.clone(), config, clock.clone());
        engine
            .grant("u1", "o1", GrantOptions::default())
            .await
            .unwrap();

        let mut bumped_config = PolicyConfig::default();
        bumped_config.current_policy_version = "1.1.0".to_string();
        let engine2 = ConsentEngine::with_clock(repo, bumped_config, clock);
        let result = engine2.check(Some("u1"), None).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.reason, CheckReason::PolicyUpdated);
        assert!(result.requires_consent);
    }

    #[tokio::test]
    async fn withdraw_without_record_fails() {
        let engine = engine_with_clock(Arc::new(SystemClock));
        let err = engine.withdraw("ghost", None).await.unwrap_err();
        assert!(matches!(err, ConsentError::NotFound));
    }

    #[tokio::test]
    async fn feature_toggle_off_does_not_require_reconsent() {
        let clock = Arc::new(crate::clock::FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let engine = engine_with_clock(clock);
        engine
            .grant("u1", "o1", GrantOptions::default())
            .await
            .unwrap();
        engine
            .update_feature("u1", Feature::Insights, false)
            .await
            .unwrap();
        let result = engine.check(Some("u1"), Some(Feature::Insights)).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.reason, CheckReason::FeatureNotAllowed);
        assert!(!result.requires_consent);
    }

    #[tokio::test]
    async fn audit_written_for_every_mutation() {
        let clock = Arc::new(crate::clock::FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let repo = Arc::new(InMemoryConsentRepository::new());
        let engine = ConsentEngine::with_clock(repo.clone(), PolicyConfig::default(), clock);
        engine.grant("u1", "o1", GrantOptions::default()).await.unwrap();
        engine.update_feature("u1", Feature::Insights, false).await.unwrap();
        engine.withdraw("u1", Some("no longer needed".into())).await.unwrap();
        assert_eq!(repo.audits().len(), 3);
    }

    #[tokio::test]
    async fn monotonic_access_within_validity_window() {
        let clock = Arc::new(crate::clock::FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let engine = engine_with_clock(clock.clone());
        engine.grant("u1", "o1", GrantOptions::default()).await.unwrap();

        let t0 = engine.check(Some("u1"), None).await.unwrap();
        assert!(t0.valid);

        clock.advance(ChronoDuration::days(200));
        let t1 = engine.check(Some("u1"), None).await.unwrap();
        assert!(t1.valid);
    }

    #[test]
    fn add_months_clamps_day_for_shorter_month() {
        let jan31 = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        let plus_one = add_months(jan31, 1);
        assert_eq!(plus_one.month(), 2);
        assert_eq!(plus_one.day(), 28);
    }

    #[test]
    fn add_months_wraps_year() {
        let dec = Utc.with_ymd_and_hms(2026, 12, 15, 0, 0, 0).unwrap();
        let plus_two = add_months(dec, 2);
        assert_eq!(plus_two.year(), 2027);
        assert_eq!(plus_two.month(), 2);
    }
}
