//! Consent data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// AI feature a consent record can separately toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    DealParsing,
    ChatAssistant,
    DocumentAnalysis,
    Insights,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::DealParsing => "deal_parsing",
            Feature::ChatAssistant => "chat_assistant",
            Feature::DocumentAnalysis => "document_analysis",
            Feature::Insights => "insights",
        }
    }
}

/// Per-feature toggles carried on a `ConsentRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureToggles {
    pub deal_parsing: bool,
    pub chat_assistant: bool,
    pub document_analysis: bool,
    pub insights: bool,
}

impl FeatureToggles {
    pub fn all(enabled: bool) -> Self {
        Self {
            deal_parsing: enabled,
            chat_assistant: enabled,
            document_analysis: enabled,
            insights: enabled,
        }
    }

    pub fn get(&self, feature: Feature) -> bool {
        match feature {
            Feature::DealParsing => self.deal_parsing,
            Feature::ChatAssistant => self.chat_assistant,
            Feature::DocumentAnalysis => self.document_analysis,
            Feature::Insights => self.insights,
        }
    }

    pub fn set(&mut self, feature: Feature, allowed: bool) {
        match feature {
            Feature::DealParsing => self.deal_parsing = allowed,
            Feature::ChatAssistant => self.chat_assistant = allowed,
            Feature::DocumentAnalysis => self.document_analysis = allowed,
            Feature::Insights => self.insights = allowed,
        }
    }
}

/// How consent was obtained. Open-ended ("UI", "GRANDFATHERED", …), modeled
/// as a string with well-known constants rather than a closed enum.
pub mod consent_method {
    pub const UI: &str = "UI";
    pub const GRANDFATHERED: &str = "GRANDFATHERED";
    pub const API: &str = "API";
}

/// One per user. GDPR-auditable: never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub id: Uuid,
    pub user_id: String,
    pub organization_id: String,
    pub consent_given: bool,
    pub consent_version: String,
    pub consented_at: DateTime<Utc>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub features: FeatureToggles,
    pub consent_method: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ConsentRecord {
    /// Invariant: `withdrawn_at.is_some() => !consent_given` and
    /// every feature toggle is false.
    pub fn invariant_holds(&self) -> bool {
        if self.withdrawn_at.is_some() {
            return !self.consent_given && !self.features.get(Feature::DealParsing)
                && !self.features.get(Feature::ChatAssistant)
                && !self.features.get(Feature::DocumentAnalysis)
                && !self.features.get(Feature::Insights);
        }
        true
    }
}

/// Append-only audit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentAuditAction {
    ConsentGiven,
    ConsentWithdrawn,
    FeatureToggled,
}

/// One immutable audit record per consent mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentAudit {
    pub id: Uuid,
    pub user_id: String,
    pub consent_id: Uuid,
    pub action: ConsentAuditAction,
    pub policy_version: String,
    pub before_state: Option<serde_json::Value>,
    pub after_state: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
