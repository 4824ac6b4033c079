//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the guided product tour.

use prospectflow_core::tutorial::{StepPresentation, TutorialKey, TutorialStep};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Initializes the tour. This must be the first message sent on the connection.
    Init { current_page: String },

    /// Starts a tutorial set, optionally part-way through.
    Start {
        tutorial: String,
        #[serde(default)]
        start_at: usize,
    },

    /// The generic "next" control.
    Advance,

    Back,

    /// The user clicked the element a click-trigger step points at. When that was the
    /// last step, `next_tutorial` names the set to continue into.
    ActivateTarget {
        #[serde(default)]
        next_tutorial: Option<String>,
        #[serde(default)]
        next_index: Option<usize>,
    },

    Skip,

    Finish,

    /// Dismissed without finishing (escape key, close button).
    Close,

    /// The browser navigated.
    PageChanged { path: String },

    /// Whether the current step's target element was found on the page.
    TargetStatus { resolvable: bool },

    CompleteStep { step_id: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms initialization and reports the persisted onboarding flag.
    Ready { onboarding_complete: bool },

    /// Render this step. Sent after any `Navigate` it depends on.
    Step {
        tutorial: &'static str,
        index: usize,
        total: usize,
        step_id: &'static str,
        target: Option<&'static str>,
        content: &'static str,
        placement: &'static str,
        /// `"spotlight"` or `"centered"`.
        presentation: &'static str,
        is_click_trigger_step: bool,
        hide_footer: bool,
        /// Whether `complete_step` has marked this step done in the current run.
        completed: bool,
    },

    /// Navigate the browser before rendering the next step.
    Navigate { path: &'static str },

    /// The tour stopped. `outcome` is `finished`, `skipped` or `closed`.
    Ended { outcome: &'static str },

    /// A non-blocking message to show the user, e.g. a failed save.
    Notice { message: String },

    /// Reports a request the server could not act on.
    Error { message: String },
}

impl ServerMessage {
    pub fn step(
        key: TutorialKey,
        index: usize,
        steps: &'static [TutorialStep],
        presentation: StepPresentation,
        completed: bool,
    ) -> Option<Self> {
        let step = steps.get(index)?;
        Some(Self::Step {
            tutorial: key.as_str(),
            index,
            total: steps.len(),
            step_id: step.id,
            target: step.target,
            content: step.content,
            placement: step.placement.as_str(),
            presentation: match presentation {
                StepPresentation::Spotlight => "spotlight",
                StepPresentation::Centered => "centered",
            },
            is_click_trigger_step: step.is_click_trigger_step,
            hide_footer: step.hide_footer,
            completed,
        })
    }
}
