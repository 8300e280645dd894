//! GDPR-grade consent lifecycle engine for the AI gateway.

pub mod clock;
pub mod engine;
pub mod repository;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{CheckReason, ConsentCheckResult, ConsentEngine, ConsentError, ConsentStatus, GrantOptions};
pub use repository::{ConsentRepoError, ConsentRepoResult, ConsentRepository, InMemoryConsentRepository};
pub use types::{consent_method, ConsentAudit, ConsentAuditAction, ConsentRecord, Feature, FeatureToggles};
