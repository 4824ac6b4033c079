//! services/api/src/web/settings.rs
//!
//! Handlers for the onboarding flag the tutorial depends on.

use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use prospectflow_core::domain::User;
use prospectflow_core::onboarding::CompletionOutcome;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct OnboardingResponse {
    /// `false` also when the settings could not be read.
    pub onboarding_complete: bool,
    pub settings_found: bool,
}

#[derive(Serialize, ToSchema)]
pub struct CompletionResponse {
    pub onboarding_complete: bool,
    /// Set when the write failed and the user should be told.
    pub notice: Option<String>,
}

impl From<CompletionOutcome> for CompletionResponse {
    fn from(outcome: CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::Persisted | CompletionOutcome::AlreadyComplete => Self {
                onboarding_complete: true,
                notice: None,
            },
            CompletionOutcome::Failed(notice) => Self {
                onboarding_complete: false,
                notice: Some(notice.message),
            },
        }
    }
}

/// GET /settings/onboarding - Read the onboarding flag
#[utoipa::path(
    get,
    path = "/settings/onboarding",
    responses(
        (status = 200, description = "The onboarding flag", body = OnboardingResponse)
    )
)]
pub async fn get_onboarding_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> impl IntoResponse {
    let settings = state.onboarding.settings(user.user_id).await;
    Json(OnboardingResponse {
        onboarding_complete: settings.as_ref().map_or(false, |s| s.onboarding_complete),
        settings_found: settings.is_some(),
    })
}

/// POST /settings/onboarding/complete - Record onboarding as complete
///
/// A failed write is reported in the body with a 202 so the client keeps going.
#[utoipa::path(
    post,
    path = "/settings/onboarding/complete",
    responses(
        (status = 200, description = "Onboarding recorded", body = CompletionResponse),
        (status = 202, description = "Write failed, will be retried", body = CompletionResponse)
    )
)]
pub async fn complete_onboarding_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> impl IntoResponse {
    let snapshot = state.onboarding.settings(user.user_id).await;
    let outcome = state
        .onboarding
        .persist_completion(user.user_id, snapshot.as_ref())
        .await;
    let status = match outcome {
        CompletionOutcome::Failed(_) => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    (status, Json(CompletionResponse::from(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospectflow_core::onboarding::CompletionNotice;

    #[test]
    fn failed_write_carries_notice() {
        let response = CompletionResponse::from(CompletionOutcome::Failed(CompletionNotice {
            message: "try later".to_string(),
        }));
        assert!(!response.onboarding_complete);
        assert_eq!(response.notice.as_deref(), Some("try later"));
    }

    #[test]
    fn already_complete_reads_as_complete() {
        let response = CompletionResponse::from(CompletionOutcome::AlreadyComplete);
        assert!(response.onboarding_complete);
        assert!(response.notice.is_none());
    }
}
