//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-connection tutorial state.

use prospectflow_core::billing::BillingService;
use prospectflow_core::domain::{User, UserSettings};
use prospectflow_core::onboarding::OnboardingService;
use prospectflow_core::ports::UserStore;
use prospectflow_core::tutorial::TutorialSequencer;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub billing: BillingService,
    pub onboarding: OnboardingService,
}

//=========================================================================================
// TutorialSession (Specific to One WebSocket Connection)
//=========================================================================================

/// The tour state for a single, active WebSocket connection. Only the connection's
/// own message loop mutates it.
pub struct TutorialSession {
    pub user: User,
    pub sequencer: TutorialSequencer,
    /// The settings as last read. Completion writes are skipped when it says done.
    pub settings: Option<UserSettings>,
}

impl TutorialSession {
    /// Creates a session by loading the user's settings snapshot.
    pub async fn new(app_state: &AppState, user: User, current_page: String) -> Self {
        let settings = app_state.onboarding.settings(user.user_id).await;
        Self {
            user,
            sequencer: TutorialSequencer::new(current_page),
            settings,
        }
    }
}
