//! crates/prospectflow_core/src/tutorial.rs
//!
//! The onboarding tour: a static table of named step sets and a single-writer
//! state machine that walks one of them. The sequencer never touches the UI. It
//! returns the events a transition produced (steps to show, pages to navigate to,
//! completion to persist) and the presentation layer acts on them.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::domain::UserSettings;

//=========================================================================================
// Step Configuration
//=========================================================================================

/// Names of the tutorial sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TutorialKey {
    Dashboard,
    JobOpeningsSetup,
}

impl TutorialKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::JobOpeningsSetup => "jobOpeningsSetup",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "dashboard" => Some(Self::Dashboard),
            "jobOpeningsSetup" => Some(Self::JobOpeningsSetup),
            _ => None,
        }
    }

    /// The built-in steps for this set.
    pub fn steps(self) -> &'static [TutorialStep] {
        match self {
            Self::Dashboard => DASHBOARD_STEPS,
            Self::JobOpeningsSetup => &[],
        }
    }
}

/// Where the tooltip sits relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Auto,
    Center,
    Right,
    Bottom,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Center => "center",
            Self::Right => "right",
            Self::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialStep {
    /// Unique within its set.
    pub id: &'static str,
    /// Selector of the element to spotlight. `None` renders the step centered.
    pub target: Option<&'static str>,
    pub content: &'static str,
    pub placement: Placement,
    /// Page the step must be shown on.
    pub page_path: Option<&'static str>,
    /// Advances only through `activate_target`, never through a generic next.
    pub is_click_trigger_step: bool,
    pub hide_footer: bool,
}

const DASHBOARD_STEPS: &[TutorialStep] = &[
    TutorialStep {
        id: "dashboard-welcome",
        target: Some("#dashboard-main-content-area"),
        content: "Welcome to ProspectFlow! This is your dashboard, your mission control for outreach. Let's take a quick tour.",
        placement: Placement::Center,
        page_path: None,
        is_click_trigger_step: false,
        hide_footer: false,
    },
    TutorialStep {
        id: "dashboard-sidebar-nav",
        target: Some("#sidebar-main-nav-group"),
        content: "Navigate through Job Openings, Contacts, and Companies using these links. This is your main way to get around.",
        placement: Placement::Right,
        page_path: None,
        is_click_trigger_step: false,
        hide_footer: false,
    },
    TutorialStep {
        id: "dashboard-sidebar-progress",
        target: Some("#sidebar-usage-progress"),
        content: "Keep an eye on your usage here. It shows how many entries you've created against your plan's limits.",
        placement: Placement::Right,
        page_path: None,
        is_click_trigger_step: false,
        hide_footer: false,
    },
    TutorialStep {
        id: "dashboard-add-new-opening-btn",
        target: Some("#dashboard-add-new-opening-button"),
        content: "Ready to track a new opportunity? Click here to add a new job opening.",
        placement: Placement::Bottom,
        page_path: None,
        is_click_trigger_step: true,
        hide_footer: true,
    },
    TutorialStep {
        id: "job-openings-search-highlight",
        target: Some("#job-openings-search-input"),
        content: "You're now on the Job Openings page! Use this search bar to quickly find any opening you've logged.",
        placement: Placement::Bottom,
        page_path: Some("/job-openings"),
        is_click_trigger_step: false,
        hide_footer: false,
    },
    TutorialStep {
        id: "tutorial-complete-job-openings",
        target: Some("#job-openings-main-content-area"),
        content: "Great! You've completed the basic tour. You can now start adding and managing your job prospects. Good luck!",
        placement: Placement::Center,
        page_path: Some("/job-openings"),
        is_click_trigger_step: false,
        hide_footer: false,
    },
];

/// Resolves a set key to its steps. Swappable so callers can supply their own tours.
pub type StepCatalog = fn(TutorialKey) -> &'static [TutorialStep];

//=========================================================================================
// Run State and Events
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { key: TutorialKey, index: usize },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    Finished,
    Skipped,
    Closed,
}

impl EndOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Skipped => "skipped",
            Self::Closed => "closed",
        }
    }
}

/// What a transition asks the presentation layer (and the settings store) to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorialEvent {
    /// Go to `path` before rendering the step that follows in the same batch.
    Navigate { path: &'static str },
    ShowStep {
        key: TutorialKey,
        index: usize,
        step_id: &'static str,
    },
    /// Persist `onboarding_complete = true`.
    PersistCompletion,
    Ended { outcome: EndOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPresentation {
    Spotlight,
    /// Degraded rendering: no target, or the target is not on the page.
    Centered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Completed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TutorialError {
    #[error("Tutorial '{0}' has no steps")]
    EmptySet(&'static str),
    #[error("Tutorial '{key}' has {len} steps, cannot start at step {index}")]
    StepOutOfRange {
        key: &'static str,
        index: usize,
        len: usize,
    },
}

//=========================================================================================
// The Sequencer
//=========================================================================================

pub struct TutorialSequencer {
    catalog: StepCatalog,
    state: RunState,
    current_page: String,
    /// Last reported resolvability of the shown step's target. `None` until reported.
    target_resolvable: Option<bool>,
    completed_steps: HashSet<&'static str>,
    has_run: bool,
    /// Set when a final click ended the run. The navigation that click triggers
    /// records completion.
    completion_on_navigation: bool,
}

impl TutorialSequencer {
    pub fn new(current_page: impl Into<String>) -> Self {
        Self::with_catalog(current_page, TutorialKey::steps)
    }

    pub fn with_catalog(current_page: impl Into<String>, catalog: StepCatalog) -> Self {
        Self {
            catalog,
            state: RunState::Idle,
            current_page: current_page.into(),
            target_resolvable: None,
            completed_steps: HashSet::new(),
            has_run: false,
            completion_on_navigation: false,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running { .. })
    }

    pub fn current_page(&self) -> &str {
        &self.current_page
    }

    pub fn steps(&self, key: TutorialKey) -> &'static [TutorialStep] {
        (self.catalog)(key)
    }

    /// The step being shown, if a run is active.
    pub fn current_step(&self) -> Option<&'static TutorialStep> {
        match self.state {
            RunState::Running { key, index } => self.steps(key).get(index),
            _ => None,
        }
    }

    /// Starts (or restarts) a set at `at_index`. Leaves the state untouched on error.
    pub fn start(
        &mut self,
        key: TutorialKey,
        at_index: usize,
    ) -> Result<Vec<TutorialEvent>, TutorialError> {
        let steps = self.steps(key);
        if steps.is_empty() {
            warn!("No steps found for tutorial '{}'", key.as_str());
            return Err(TutorialError::EmptySet(key.as_str()));
        }
        if at_index >= steps.len() {
            return Err(TutorialError::StepOutOfRange {
                key: key.as_str(),
                index: at_index,
                len: steps.len(),
            });
        }

        info!("Starting tutorial '{}' at step {}", key.as_str(), at_index);
        self.completed_steps.clear();
        self.has_run = true;
        let mut events = Vec::new();
        self.show(key, at_index, &mut events);
        Ok(events)
    }

    /// The generic "next" signal. Ignored on click-trigger steps.
    pub fn advance(&mut self) -> Vec<TutorialEvent> {
        let RunState::Running { key, index } = self.state else {
            return Vec::new();
        };
        let steps = self.steps(key);
        if steps[index].is_click_trigger_step {
            debug!(
                "Ignoring next on step '{}', it waits for its target to be activated",
                steps[index].id
            );
            return Vec::new();
        }

        let mut events = Vec::new();
        if index + 1 < steps.len() {
            self.show(key, index + 1, &mut events);
        } else {
            self.end(RunState::Finished, EndOutcome::Finished, true, &mut events);
        }
        events
    }

    /// Moves one step back. Click-trigger steps hide their footer, so they have no back control.
    pub fn back(&mut self) -> Vec<TutorialEvent> {
        let mut events = Vec::new();
        if let RunState::Running { key, index } = self.state {
            if index > 0 && !self.steps(key)[index].is_click_trigger_step {
                self.show(key, index - 1, &mut events);
            }
        }
        events
    }

    /// The designated target of a click-trigger step was activated.
    ///
    /// On the last step, `chain` names a set to continue into. Without one the run
    /// finishes, and completion is persisted by the next `set_current_page`.
    pub fn activate_target(
        &mut self,
        chain: Option<(TutorialKey, usize)>,
    ) -> Result<Vec<TutorialEvent>, TutorialError> {
        let RunState::Running { key, index } = self.state else {
            return Ok(Vec::new());
        };
        let steps = self.steps(key);
        if !steps[index].is_click_trigger_step {
            debug!("Target activated on '{}', which is not a click step", steps[index].id);
            return Ok(Vec::new());
        }

        info!("Tutorial target '{}' activated", steps[index].id);
        let mut events = Vec::new();
        if index + 1 < steps.len() {
            self.show(key, index + 1, &mut events);
        } else if let Some((next_key, next_index)) = chain {
            return self.start(next_key, next_index);
        } else {
            self.end(RunState::Finished, EndOutcome::Finished, false, &mut events);
            self.completion_on_navigation = true;
        }
        Ok(events)
    }

    /// Abandons the run. Onboarding still counts as complete.
    pub fn skip(&mut self) -> Vec<TutorialEvent> {
        let mut events = Vec::new();
        if self.is_running() {
            self.end(RunState::Idle, EndOutcome::Skipped, true, &mut events);
        }
        events
    }

    pub fn finish(&mut self) -> Vec<TutorialEvent> {
        let mut events = Vec::new();
        if self.is_running() {
            self.end(RunState::Finished, EndOutcome::Finished, true, &mut events);
        }
        events
    }

    /// Closes the tour without recording completion (e.g. the escape key).
    pub fn close(&mut self) -> Vec<TutorialEvent> {
        let mut events = Vec::new();
        if self.is_running() {
            self.end(RunState::Idle, EndOutcome::Closed, false, &mut events);
        }
        events
    }

    /// The presentation layer moved to `path`. Emits the completion a final click
    /// left pending.
    pub fn set_current_page(&mut self, path: impl Into<String>) -> Vec<TutorialEvent> {
        self.current_page = path.into();
        self.target_resolvable = None;
        if std::mem::take(&mut self.completion_on_navigation) {
            debug!("Navigated after the final click, recording completion");
            return vec![TutorialEvent::PersistCompletion];
        }
        Vec::new()
    }

    /// The presentation layer looked for the current step's target.
    pub fn report_target(&mut self, resolvable: bool) {
        if !resolvable {
            if let Some(step) = self.current_step() {
                warn!(
                    "Target {:?} for step '{}' not found, showing it centered",
                    step.target, step.id
                );
            }
        }
        self.target_resolvable = Some(resolvable);
    }

    /// How the current step should render. A target not yet reported is assumed present.
    pub fn presentation(&self) -> Option<StepPresentation> {
        let step = self.current_step()?;
        let spotlight = step.target.is_some() && self.target_resolvable != Some(false);
        Some(if spotlight {
            StepPresentation::Spotlight
        } else {
            StepPresentation::Centered
        })
    }

    pub fn complete_step(&mut self, step_id: &str) {
        if let Some(step) = self.current_run_steps().iter().find(|s| s.id == step_id) {
            self.completed_steps.insert(step.id);
        }
    }

    pub fn step_status(&self, step_id: &str) -> StepStatus {
        if self.completed_steps.contains(step_id) {
            StepStatus::Completed
        } else {
            StepStatus::Pending
        }
    }

    /// Whether the dashboard tour should start by itself for this settings snapshot.
    ///
    /// Only once per sequencer, only on the dashboard page, and only while the
    /// persisted flag says onboarding is incomplete.
    pub fn should_auto_start(&self, settings: Option<&UserSettings>) -> bool {
        matches!(settings, Some(s) if !s.onboarding_complete)
            && self.state == RunState::Idle
            && !self.has_run
            && self.current_page == "/"
    }

    /// Brings the run in line with a fresh settings snapshot: starts the dashboard tour
    /// when onboarding is pending, and closes it quietly once onboarding is recorded.
    pub fn reconcile(&mut self, settings: Option<&UserSettings>) -> Vec<TutorialEvent> {
        if self.should_auto_start(settings) {
            info!("Onboarding not complete, starting the dashboard tutorial");
            return self.start(TutorialKey::Dashboard, 0).unwrap_or_else(|e| {
                warn!("Could not auto-start tutorial: {}", e);
                Vec::new()
            });
        }
        let onboarded = settings.map_or(false, |s| s.onboarding_complete);
        if onboarded
            && matches!(self.state, RunState::Running { key: TutorialKey::Dashboard, .. })
        {
            info!("Onboarding already complete, closing the dashboard tutorial");
            return self.close();
        }
        Vec::new()
    }

    fn current_run_steps(&self) -> &'static [TutorialStep] {
        match self.state {
            RunState::Running { key, .. } => self.steps(key),
            _ => &[],
        }
    }

    fn show(&mut self, key: TutorialKey, index: usize, events: &mut Vec<TutorialEvent>) {
        let step = &self.steps(key)[index];
        if let Some(path) = step.page_path {
            if path != self.current_page {
                debug!("Step '{}' lives on {}, requesting navigation", step.id, path);
                events.push(TutorialEvent::Navigate { path });
            }
        }
        self.state = RunState::Running { key, index };
        self.target_resolvable = None;
        events.push(TutorialEvent::ShowStep {
            key,
            index,
            step_id: step.id,
        });
    }

    fn end(
        &mut self,
        next: RunState,
        outcome: EndOutcome,
        persist: bool,
        events: &mut Vec<TutorialEvent>,
    ) {
        info!("Tutorial ended ({}), persist completion: {}", outcome.as_str(), persist);
        self.state = next;
        self.target_resolvable = None;
        if persist {
            events.push(TutorialEvent::PersistCompletion);
        }
        events.push(TutorialEvent::Ended { outcome });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const PLAIN: &[TutorialStep] = &[
        TutorialStep {
            id: "one",
            target: Some("#one"),
            content: "first",
            placement: Placement::Auto,
            page_path: None,
            is_click_trigger_step: false,
            hide_footer: false,
        },
        TutorialStep {
            id: "two",
            target: None,
            content: "second",
            placement: Placement::Center,
            page_path: None,
            is_click_trigger_step: false,
            hide_footer: false,
        },
        TutorialStep {
            id: "three",
            target: Some("#three"),
            content: "third",
            placement: Placement::Auto,
            page_path: Some("/contacts"),
            is_click_trigger_step: false,
            hide_footer: false,
        },
    ];

    const CLICK_LAST: &[TutorialStep] = &[TutorialStep {
        id: "open-link",
        target: Some("#link"),
        content: "click me",
        placement: Placement::Bottom,
        page_path: None,
        is_click_trigger_step: true,
        hide_footer: true,
    }];

    fn test_catalog(key: TutorialKey) -> &'static [TutorialStep] {
        match key {
            TutorialKey::Dashboard => PLAIN,
            TutorialKey::JobOpeningsSetup => CLICK_LAST,
        }
    }

    fn settings(onboarding_complete: bool) -> UserSettings {
        UserSettings {
            user_id: Uuid::new_v4(),
            onboarding_complete,
        }
    }

    fn persist_count(events: &[TutorialEvent]) -> usize {
        events
            .iter()
            .filter(|e| **e == TutorialEvent::PersistCompletion)
            .count()
    }

    #[test]
    fn start_shows_first_step() {
        let mut seq = TutorialSequencer::new("/");
        let events = seq.start(TutorialKey::Dashboard, 0).unwrap();
        assert_eq!(
            seq.state(),
            RunState::Running {
                key: TutorialKey::Dashboard,
                index: 0
            }
        );
        assert_eq!(
            events,
            vec![TutorialEvent::ShowStep {
                key: TutorialKey::Dashboard,
                index: 0,
                step_id: "dashboard-welcome"
            }]
        );
        assert_eq!(seq.current_step().unwrap().id, "dashboard-welcome");
    }

    #[test]
    fn empty_or_out_of_range_start_is_rejected() {
        let mut seq = TutorialSequencer::new("/");
        assert_eq!(
            seq.start(TutorialKey::JobOpeningsSetup, 0),
            Err(TutorialError::EmptySet("jobOpeningsSetup"))
        );
        assert!(matches!(
            seq.start(TutorialKey::Dashboard, 6),
            Err(TutorialError::StepOutOfRange { len: 6, .. })
        ));
        assert_eq!(seq.state(), RunState::Idle);
    }

    #[test]
    fn advancing_walks_to_finished_then_stops() {
        let mut seq = TutorialSequencer::with_catalog("/", test_catalog);
        seq.start(TutorialKey::Dashboard, 0).unwrap();

        for expected in 1..PLAIN.len() {
            seq.advance();
            assert_eq!(
                seq.state(),
                RunState::Running {
                    key: TutorialKey::Dashboard,
                    index: expected
                }
            );
        }

        let events = seq.advance();
        assert_eq!(seq.state(), RunState::Finished);
        assert_eq!(persist_count(&events), 1);
        assert_eq!(
            events.last(),
            Some(&TutorialEvent::Ended {
                outcome: EndOutcome::Finished
            })
        );

        assert!(seq.advance().is_empty());
        assert_eq!(seq.state(), RunState::Finished);
        assert!(seq.current_step().is_none());
    }

    #[test]
    fn advancing_onto_another_page_requests_navigation_first() {
        let mut seq = TutorialSequencer::with_catalog("/", test_catalog);
        seq.start(TutorialKey::Dashboard, 1).unwrap();
        let events = seq.advance();
        assert_eq!(
            events,
            vec![
                TutorialEvent::Navigate { path: "/contacts" },
                TutorialEvent::ShowStep {
                    key: TutorialKey::Dashboard,
                    index: 2,
                    step_id: "three"
                },
            ]
        );

        let mut seq = TutorialSequencer::with_catalog("/contacts", test_catalog);
        seq.start(TutorialKey::Dashboard, 1).unwrap();
        assert!(!seq
            .advance()
            .iter()
            .any(|e| matches!(e, TutorialEvent::Navigate { .. })));
    }

    #[test]
    fn click_trigger_step_ignores_generic_next() {
        let mut seq = TutorialSequencer::new("/");
        seq.start(TutorialKey::Dashboard, 3).unwrap();
        assert!(seq.current_step().unwrap().is_click_trigger_step);

        assert!(seq.advance().is_empty());
        assert!(seq.back().is_empty());
        assert_eq!(
            seq.state(),
            RunState::Running {
                key: TutorialKey::Dashboard,
                index: 3
            }
        );

        let events = seq.activate_target(None).unwrap();
        assert_eq!(events[0], TutorialEvent::Navigate { path: "/job-openings" });
        assert_eq!(seq.current_step().unwrap().id, "job-openings-search-highlight");
    }

    #[test]
    fn target_activation_on_plain_step_does_nothing() {
        let mut seq = TutorialSequencer::new("/");
        seq.start(TutorialKey::Dashboard, 0).unwrap();
        assert!(seq.activate_target(None).unwrap().is_empty());
        assert_eq!(seq.current_step().unwrap().id, "dashboard-welcome");
    }

    #[test]
    fn activating_last_click_step_finishes_without_persisting() {
        let mut seq = TutorialSequencer::with_catalog("/", test_catalog);
        seq.start(TutorialKey::JobOpeningsSetup, 0).unwrap();
        let events = seq.activate_target(None).unwrap();
        assert_eq!(seq.state(), RunState::Finished);
        assert_eq!(persist_count(&events), 0);
    }

    #[test]
    fn navigation_after_final_click_persists_completion_once() {
        let mut seq = TutorialSequencer::with_catalog("/", test_catalog);
        seq.start(TutorialKey::JobOpeningsSetup, 0).unwrap();
        seq.activate_target(None).unwrap();

        let events = seq.set_current_page("/job-openings/new");
        assert_eq!(events, vec![TutorialEvent::PersistCompletion]);
        assert_eq!(seq.current_page(), "/job-openings/new");
        assert!(seq.set_current_page("/").is_empty());
    }

    #[test]
    fn navigation_after_other_endings_persists_nothing() {
        let mut seq = TutorialSequencer::with_catalog("/", test_catalog);
        seq.start(TutorialKey::Dashboard, 0).unwrap();
        seq.close();
        assert!(seq.set_current_page("/contacts").is_empty());

        seq.start(TutorialKey::JobOpeningsSetup, 0).unwrap();
        seq.activate_target(Some((TutorialKey::Dashboard, 0))).unwrap();
        assert!(seq.set_current_page("/").is_empty());
    }

    #[test]
    fn activating_last_click_step_can_chain_into_another_set() {
        let mut seq = TutorialSequencer::with_catalog("/", test_catalog);
        seq.start(TutorialKey::JobOpeningsSetup, 0).unwrap();
        seq.activate_target(Some((TutorialKey::Dashboard, 1))).unwrap();
        assert_eq!(
            seq.state(),
            RunState::Running {
                key: TutorialKey::Dashboard,
                index: 1
            }
        );
    }

    #[test]
    fn skip_goes_idle_and_persists_once() {
        for index in 0..PLAIN.len() {
            let mut seq = TutorialSequencer::with_catalog("/", test_catalog);
            seq.start(TutorialKey::Dashboard, index).unwrap();
            let events = seq.skip();
            assert_eq!(seq.state(), RunState::Idle);
            assert_eq!(persist_count(&events), 1);
            assert!(seq.skip().is_empty());
        }
    }

    #[test]
    fn finish_and_close_differ_in_persistence() {
        let mut seq = TutorialSequencer::new("/");
        seq.start(TutorialKey::Dashboard, 2).unwrap();
        assert_eq!(persist_count(&seq.finish()), 1);
        assert_eq!(seq.state(), RunState::Finished);

        seq.start(TutorialKey::Dashboard, 2).unwrap();
        let events = seq.close();
        assert_eq!(persist_count(&events), 0);
        assert_eq!(seq.state(), RunState::Idle);
    }

    #[test]
    fn back_returns_to_previous_step() {
        let mut seq = TutorialSequencer::with_catalog("/", test_catalog);
        seq.start(TutorialKey::Dashboard, 0).unwrap();
        assert!(seq.back().is_empty());
        seq.advance();
        seq.back();
        assert_eq!(seq.current_step().unwrap().id, "one");
    }

    #[test]
    fn missing_target_degrades_to_centered() {
        let mut seq = TutorialSequencer::with_catalog("/", test_catalog);
        assert_eq!(seq.presentation(), None);
        seq.start(TutorialKey::Dashboard, 0).unwrap();
        assert_eq!(seq.presentation(), Some(StepPresentation::Spotlight));
        seq.report_target(false);
        assert_eq!(seq.presentation(), Some(StepPresentation::Centered));
        assert!(seq.is_running());

        seq.advance();
        assert_eq!(seq.presentation(), Some(StepPresentation::Centered));
        seq.advance();
        assert_eq!(seq.presentation(), Some(StepPresentation::Spotlight));
    }

    #[test]
    fn completed_steps_reset_on_start() {
        let mut seq = TutorialSequencer::new("/");
        seq.start(TutorialKey::Dashboard, 0).unwrap();
        seq.complete_step("dashboard-welcome");
        seq.complete_step("not-a-step");
        assert_eq!(seq.step_status("dashboard-welcome"), StepStatus::Completed);
        assert_eq!(seq.step_status("not-a-step"), StepStatus::Pending);

        seq.start(TutorialKey::Dashboard, 0).unwrap();
        assert_eq!(seq.step_status("dashboard-welcome"), StepStatus::Pending);
    }

    #[test]
    fn auto_start_only_once_on_dashboard_for_pending_onboarding() {
        let pending = settings(false);
        let done = settings(true);

        let seq = TutorialSequencer::new("/contacts");
        assert!(!seq.should_auto_start(Some(&pending)));

        let mut seq = TutorialSequencer::new("/");
        assert!(!seq.should_auto_start(None));
        assert!(!seq.should_auto_start(Some(&done)));
        assert!(seq.should_auto_start(Some(&pending)));

        let events = seq.reconcile(Some(&pending));
        assert!(matches!(events[0], TutorialEvent::ShowStep { index: 0, .. }));
        seq.skip();
        assert!(seq.reconcile(Some(&pending)).is_empty());
        assert_eq!(seq.state(), RunState::Idle);
    }

    #[test]
    fn reconcile_closes_dashboard_tour_once_onboarded() {
        let mut seq = TutorialSequencer::new("/");
        seq.start(TutorialKey::Dashboard, 1).unwrap();
        let events = seq.reconcile(Some(&settings(true)));
        assert_eq!(
            events,
            vec![TutorialEvent::Ended {
                outcome: EndOutcome::Closed
            }]
        );
        assert_eq!(seq.state(), RunState::Idle);
    }
}
