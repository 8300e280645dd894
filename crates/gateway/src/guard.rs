//! The guard chain composed for every AI endpoint.

use crate::audit;
use crate::auth::AuthContext;
use crate::error::GatewayError;
use crate::state::AppState;
use cre_ai_consent::Feature;
use cre_ai_security::SecurityCheckResult;

/// Steps 2-3: rate-limit then consent. Does not record the request yet --
/// callers record only after the security check passes. Any guard failure
/// short-circuits with a typed reason and the audit record records the
/// rejection.
#[allow(clippy::too_many_arguments)]
pub async fn check_rate_and_consent(
    state: &AppState,
    auth: &AuthContext,
    deal_id: Option<&str>,
    endpoint: &str,
    prompt: &str,
    feature: Option<Feature>,
) -> Result<(), GatewayError> {
    let decision = state.rate_limiter.check(&auth.user_id, auth.org_id.as_deref());
    if !decision.allowed {
        let reason = decision.reason.unwrap_or_else(|| "rate limited".to_string());
        audit::record_rejection(state, auth, deal_id, endpoint, prompt, &reason, None).await;
        return Err(GatewayError::RateLimited {
            reason,
            limit_type: decision.limit_type.map(|t| t.as_str().to_string()),
            retry_after_seconds: decision.retry_after_seconds.unwrap_or(60),
        });
    }

    let consent = state
        .consent_engine
        .check(Some(&auth.user_id), feature)
        .await
        .map_err(|_| GatewayError::Internal)?;
    if !consent.valid {
        audit::record_rejection(state, auth, deal_id, endpoint, prompt, consent.reason.as_str(), None).await;
        return Err(GatewayError::ConsentRequired {
            reason: consent.reason.as_str().to_string(),
            policy_version: state.config.current_policy_version.clone(),
        });
    }
    Ok(())
}

/// Step 4: security check on user input. On block, persists the rejection
/// AIAudit (`validationPassed=false, reason=jailbreak_detected`) and returns
/// a typed error without invoking downstream.
pub async fn check_input_security(
    state: &AppState,
    auth: &AuthContext,
    deal_id: Option<&str>,
    endpoint: &str,
    text: &str,
) -> Result<SecurityCheckResult, GatewayError> {
    let result = state.security.security_check(text);
    if result.blocked {
        audit::record_rejection(state, auth, deal_id, endpoint, text, "jailbreak_detected", Some(&result)).await;
        return Err(GatewayError::SecurityBlocked);
    }
    Ok(result)
}

/// Step 5: record the request against the quota. Call only after the
/// security check has passed.
pub fn record_request(state: &AppState, user_id: &str, org_id: Option<&str>) {
    state.rate_limiter.record(user_id, org_id);
}
