mod common;

use common::InMemorySettings;
use prospectflow_core::domain::UserSettings;
use prospectflow_core::onboarding::{CompletionOutcome, OnboardingService};
use prospectflow_core::tutorial::{RunState, TutorialEvent, TutorialKey, TutorialSequencer};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use uuid::Uuid;

async fn drive(
    service: &OnboardingService,
    user_id: Uuid,
    snapshot: Option<&UserSettings>,
    events: &[TutorialEvent],
) -> Vec<CompletionOutcome> {
    let mut outcomes = Vec::new();
    for event in events {
        if *event == TutorialEvent::PersistCompletion {
            outcomes.push(service.persist_completion(user_id, snapshot).await);
        }
    }
    outcomes
}

#[tokio::test]
async fn skipping_auto_started_tour_persists_completion_once() {
    let user_id = Uuid::new_v4();
    let store = Arc::new(InMemorySettings::with(UserSettings {
        user_id,
        onboarding_complete: false,
    }));
    let service = OnboardingService::new(store.clone());
    let snapshot = service.settings(user_id).await;

    let mut seq = TutorialSequencer::new("/");
    let started = seq.reconcile(snapshot.as_ref());
    assert!(seq.is_running());
    assert!(drive(&service, user_id, snapshot.as_ref(), &started).await.is_empty());

    let events = seq.skip();
    let outcomes = drive(&service, user_id, snapshot.as_ref(), &events).await;
    assert_eq!(outcomes, vec![CompletionOutcome::Persisted]);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    assert_eq!(seq.state(), RunState::Idle);

    let refreshed = service.settings(user_id).await.unwrap();
    assert!(refreshed.onboarding_complete);
}

#[tokio::test]
async fn completed_snapshot_skips_the_write() {
    let user_id = Uuid::new_v4();
    let settings = UserSettings {
        user_id,
        onboarding_complete: true,
    };
    let store = Arc::new(InMemorySettings::with(settings.clone()));
    let service = OnboardingService::new(store.clone());

    let mut seq = TutorialSequencer::new("/job-openings");
    seq.start(TutorialKey::Dashboard, 5).unwrap();
    let events = seq.finish();
    let outcomes = drive(&service, user_id, Some(&settings), &events).await;
    assert_eq!(outcomes, vec![CompletionOutcome::AlreadyComplete]);
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_write_is_a_notice_and_the_tour_still_ends() {
    let user_id = Uuid::new_v4();
    let store = Arc::new(InMemorySettings::default());
    store.fail_writes.store(true, Ordering::SeqCst);
    let service = OnboardingService::new(store.clone());

    let mut seq = TutorialSequencer::new("/");
    seq.start(TutorialKey::Dashboard, 0).unwrap();
    let events = seq.skip();
    let outcomes = drive(&service, user_id, None, &events).await;

    assert!(matches!(outcomes.as_slice(), [CompletionOutcome::Failed(notice)] if !notice.message.is_empty()));
    assert_eq!(seq.state(), RunState::Idle);
    assert_eq!(service.settings(user_id).await, None);
}
