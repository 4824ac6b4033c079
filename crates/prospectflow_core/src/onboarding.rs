//! crates/prospectflow_core/src/onboarding.rs
//!
//! Reads and records the `onboarding_complete` flag the tutorial depends on.
//! Nothing here fails the caller: an unreadable flag reads as absent, and a failed
//! write comes back as a notice to show the user. The flag is checked again on the
//! next load, which retries the write.

use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::UserSettings;
use crate::ports::SettingsStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Persisted,
    /// The snapshot already said onboarding was complete. Nothing was written.
    AlreadyComplete,
    Failed(CompletionNotice),
}

/// A non-blocking message for the user after a failed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionNotice {
    pub message: String,
}

#[derive(Clone)]
pub struct OnboardingService {
    settings: Arc<dyn SettingsStore>,
}

impl OnboardingService {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    pub async fn settings(&self, user_id: Uuid) -> Option<UserSettings> {
        match self.settings.get_settings(user_id).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Settings for user {} unavailable: {}", user_id, e);
                None
            }
        }
    }

    /// Records that the user finished (or skipped) onboarding.
    pub async fn persist_completion(
        &self,
        user_id: Uuid,
        snapshot: Option<&UserSettings>,
    ) -> CompletionOutcome {
        if snapshot.map_or(false, |s| s.onboarding_complete) {
            return CompletionOutcome::AlreadyComplete;
        }
        match self.settings.mark_onboarding_complete(user_id).await {
            Ok(()) => {
                info!("User {} onboarding marked complete", user_id);
                CompletionOutcome::Persisted
            }
            Err(e) => {
                error!("Error marking onboarding complete for {}: {}", user_id, e);
                CompletionOutcome::Failed(CompletionNotice {
                    message: "We couldn't save your tutorial progress. It will be retried next time you sign in.".to_string(),
                })
            }
        }
    }
}
