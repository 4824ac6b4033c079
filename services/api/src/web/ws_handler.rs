//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a tutorial WebSocket connection.
//! Each connection owns one `TutorialSequencer`; client messages drive its transitions
//! and the resulting events are rendered back as `ServerMessage`s.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, TutorialSession},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use prospectflow_core::domain::{User, UserSettings};
use prospectflow_core::onboarding::CompletionOutcome;
use prospectflow_core::tutorial::{
    RunState, StepPresentation, StepStatus, TutorialError, TutorialEvent, TutorialKey,
    TutorialSequencer,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user: User) {
    info!("New tutorial connection established for user: {}", user.user_id);

    // The sender is shared with the completion tasks spawned below.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // --- 1. Initialization Phase ---
    let session_lock = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init { current_page }) => {
                let session = TutorialSession::new(&app_state, user, current_page).await;
                Arc::new(Mutex::new(session))
            }
            _ => {
                error!("First message was not a valid Init message.");
                send(
                    &ws_sender,
                    &ServerMessage::Error {
                        message: "Expected an init message.".to_string(),
                    },
                )
                .await;
                return;
            }
        },
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    {
        let mut session = session_lock.lock().await;
        let onboarding_complete = session
            .settings
            .as_ref()
            .map_or(false, |s| s.onboarding_complete);
        if !send(&ws_sender, &ServerMessage::Ready { onboarding_complete }).await {
            return;
        }
        let settings = session.settings.clone();
        let events = session.sequencer.reconcile(settings.as_ref());
        dispatch(&app_state, &session_lock, &session, &ws_sender, events).await;
    }

    // --- 2. Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Failed to deserialize client message: {}", e);
                        continue;
                    }
                };
                let mut session = session_lock.lock().await;
                match apply(&mut session, client_msg) {
                    Ok(events) => {
                        dispatch(&app_state, &session_lock, &session, &ws_sender, events)
                            .await;
                    }
                    Err(e) => {
                        warn!("Tutorial request rejected: {}", e);
                        send(&ws_sender, &ServerMessage::Error { message: e.to_string() }).await;
                    }
                }
            }
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    info!("Tutorial connection closed.");
}

/// Errors a client message can produce.
#[derive(Debug, thiserror::Error)]
enum RequestError {
    #[error("Unknown tutorial: {0}")]
    UnknownTutorial(String),
    #[error(transparent)]
    Tutorial(#[from] TutorialError),
}

/// Feeds one client message to the sequencer and returns the events to dispatch.
fn apply(
    session: &mut TutorialSession,
    msg: ClientMessage,
) -> Result<Vec<TutorialEvent>, RequestError> {
    let settings = session.settings.clone();
    let seq = &mut session.sequencer;
    let events = match msg {
        ClientMessage::Init { .. } => {
            warn!("Received subsequent Init message, which is ignored.");
            Vec::new()
        }
        ClientMessage::Start { tutorial, start_at } => {
            seq.start(parse_key(&tutorial)?, start_at)?
        }
        ClientMessage::Advance => seq.advance(),
        ClientMessage::Back => seq.back(),
        ClientMessage::ActivateTarget {
            next_tutorial,
            next_index,
        } => {
            let chain = match next_tutorial {
                Some(name) => Some((parse_key(&name)?, next_index.unwrap_or(0))),
                None => None,
            };
            seq.activate_target(chain)?
        }
        ClientMessage::Skip => seq.skip(),
        ClientMessage::Finish => seq.finish(),
        ClientMessage::Close => seq.close(),
        ClientMessage::PageChanged { path } => {
            let mut events = seq.set_current_page(path);
            let reconciled = seq.reconcile(settings.as_ref());
            if reconciled.is_empty() {
                events.extend(reshow_current(seq));
            } else {
                events.extend(reconciled);
            }
            events
        }
        ClientMessage::TargetStatus { resolvable } => {
            seq.report_target(resolvable);
            reshow_current(seq)
        }
        ClientMessage::CompleteStep { step_id } => {
            seq.complete_step(&step_id);
            reshow_current(seq)
        }
    };
    Ok(events)
}

fn parse_key(raw: &str) -> Result<TutorialKey, RequestError> {
    TutorialKey::parse(raw).ok_or_else(|| RequestError::UnknownTutorial(raw.to_string()))
}

/// A `ShowStep` for the current step, so the client re-renders it.
fn reshow_current(seq: &TutorialSequencer) -> Vec<TutorialEvent> {
    match (seq.state(), seq.current_step()) {
        (RunState::Running { key, index }, Some(step)) => {
            vec![TutorialEvent::ShowStep {
                key,
                index,
                step_id: step.id,
            }]
        }
        _ => Vec::new(),
    }
}

/// Turns sequencer events into client messages. Returns whether completion must be
/// persisted.
fn render(seq: &TutorialSequencer, events: &[TutorialEvent]) -> (Vec<ServerMessage>, bool) {
    let mut messages = Vec::with_capacity(events.len());
    let mut persist = false;
    for event in events {
        match *event {
            TutorialEvent::Navigate { path } => messages.push(ServerMessage::Navigate { path }),
            TutorialEvent::ShowStep {
                key,
                index,
                step_id,
            } => {
                let presentation = seq.presentation().unwrap_or(StepPresentation::Centered);
                let completed = seq.step_status(step_id) == StepStatus::Completed;
                if let Some(msg) =
                    ServerMessage::step(key, index, seq.steps(key), presentation, completed)
                {
                    messages.push(msg);
                }
            }
            TutorialEvent::PersistCompletion => persist = true,
            TutorialEvent::Ended { outcome } => messages.push(ServerMessage::Ended {
                outcome: outcome.as_str(),
            }),
        }
    }
    (messages, persist)
}

async fn dispatch(
    app_state: &Arc<AppState>,
    session_lock: &Arc<Mutex<TutorialSession>>,
    session: &TutorialSession,
    ws_sender: &WsSender,
    events: Vec<TutorialEvent>,
) {
    let (messages, persist) = render(&session.sequencer, &events);
    for msg in &messages {
        if !send(ws_sender, msg).await {
            return;
        }
    }
    if persist {
        spawn_completion(app_state, session_lock, session, ws_sender);
    }
}

/// Persists onboarding completion off the message loop. A failure is reported to the
/// client as a notice and leaves the snapshot untouched, so the next load retries.
fn spawn_completion(
    app_state: &Arc<AppState>,
    session_lock: &Arc<Mutex<TutorialSession>>,
    session: &TutorialSession,
    ws_sender: &WsSender,
) {
    let app_state = app_state.clone();
    let session_lock = session_lock.clone();
    let ws_sender = ws_sender.clone();
    let user_id = session.user.user_id;
    let snapshot = session.settings.clone();

    tokio::spawn(async move {
        match app_state
            .onboarding
            .persist_completion(user_id, snapshot.as_ref())
            .await
        {
            CompletionOutcome::Persisted => {
                session_lock.lock().await.settings = Some(UserSettings {
                    user_id,
                    onboarding_complete: true,
                });
            }
            CompletionOutcome::AlreadyComplete => {}
            CompletionOutcome::Failed(notice) => {
                send(&ws_sender, &ServerMessage::Notice { message: notice.message }).await;
            }
        }
    });
}

/// Sends a message; returns false when the client is gone.
async fn send(ws_sender: &WsSender, msg: &ServerMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return false;
        }
    };
    if ws_sender.lock().await.send(Message::Text(json.into())).await.is_err() {
        error!("Failed to send message to client.");
        return false;
    }
    true
}
