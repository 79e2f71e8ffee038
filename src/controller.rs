//! The async session controller.
//!
//! [`SessionController`] wraps a [`Session`] and drives it against a
//! [`ConversionApi`]:
//!
//! 1. [`submit`](SessionController::submit) validates the file, uploads it,
//!    and on success starts the poll loop. It returns once the task id is
//!    known.
//! 2. The poll loop feeds one status result per tick into the session until
//!    it reaches Complete or Error, then stops its own timer.
//! 3. [`wait`](SessionController::wait) resolves with the terminal outcome.
//! 4. [`cancel`](SessionController::cancel) / [`reset`](SessionController::reset)
//!    return to Idle from anywhere.
//!
//! ## Locking
//!
//! Session state sits behind one `std::sync::Mutex` that is never held
//! across an `.await`. Observer events are collected under the lock and
//! delivered after it is released.
//!
//! ## The poll timer
//!
//! The running poll loop is owned by a [`PollHandle`]; dropping it aborts
//! the loop. The handle is stored next to the session and is present exactly
//! while the session is Polling, so there is never more than one.

use crate::api::ConversionApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, SessionError};
use crate::pipeline::input::AudioFile;
use crate::progress::{ObserverRef, SessionEvent};
use crate::report::{ConversionSummary, TaskId, TaskStatus};
use crate::session::{PhaseKind, Session, Step, Ticket};
use crate::stream;
use crate::view::View;
use futures::StreamExt;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Result of a session that reached Complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedConversion {
    pub task_id: TaskId,
    /// Absolute URL of the converted file.
    pub download_url: String,
    pub summary: ConversionSummary,
}

/// Ownership token for the running poll loop. Dropping it aborts the loop.
#[derive(Debug)]
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Let go of the loop without aborting it. Used by the loop itself when
    /// it stops after a terminal status.
    fn release(mut self) {
        self.task.take();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct State {
    session: Session,
    poll: Option<PollHandle>,
}

struct Shared {
    state: Mutex<State>,
    views: watch::Sender<View>,
    observer: Option<ObserverRef>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &State) {
        self.views.send_replace(state.session.view().clone());
    }

    fn deliver(&self, events: Vec<SessionEvent>) {
        if let Some(observer) = &self.observer {
            for event in &events {
                event.deliver(observer.as_ref());
            }
        }
    }

    /// Event describing the terminal phase the session just entered.
    fn terminal_event(state: &State) -> Option<SessionEvent> {
        let session = &state.session;
        match session.phase() {
            PhaseKind::Complete => Some(SessionEvent::Complete(
                session.task_id()?.clone(),
                session.summary()?.clone(),
            )),
            PhaseKind::Error => Some(SessionEvent::Error(session.error()?.clone())),
            _ => None,
        }
    }
}

/// Drives one conversion session at a time.
pub struct SessionController {
    api: Arc<dyn ConversionApi>,
    config: ClientConfig,
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(api: Arc<dyn ConversionApi>, config: ClientConfig) -> Self {
        let (views, _) = watch::channel(View::idle());
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                session: Session::new(),
                poll: None,
            }),
            views,
            observer: config.observer.clone(),
        });
        Self {
            api,
            config,
            shared,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn phase(&self) -> PhaseKind {
        self.shared.lock().session.phase()
    }

    pub fn view(&self) -> View {
        self.shared.lock().session.view().clone()
    }

    pub fn task_id(&self) -> Option<TaskId> {
        self.shared.lock().session.task_id().cloned()
    }

    /// Absolute download URL, once the session is Complete.
    pub fn download_url(&self) -> Option<String> {
        let state = self.shared.lock();
        match state.session.phase() {
            PhaseKind::Complete => state.session.task_id().map(|id| self.api.download_url(id)),
            _ => None,
        }
    }

    /// Whether a poll loop is currently owned by the session.
    pub fn has_active_poll(&self) -> bool {
        self.shared.lock().poll.is_some()
    }

    /// Receive a new [`View`] on every transition.
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.shared.views.subscribe()
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Validate and upload `file`, then start polling.
    ///
    /// Returns the task id once the server accepted the upload. A file is
    /// only accepted from Idle, Complete or Error; a terminal session is
    /// replaced by the new one. Every session failure is also reflected in
    /// the view and reported to the observer.
    pub async fn submit(&self, file: Option<AudioFile>) -> Result<TaskId, ClientError> {
        let meta = file.as_ref().map(AudioFile::meta);

        // ── Validate ─────────────────────────────────────────────────────
        let ticket = {
            let mut state = self.shared.lock();
            let ticket = state.session.select_file()?;
            self.shared.publish(&state);

            let validated = state
                .session
                .validate(ticket, meta, self.config.max_file_size);
            self.shared.publish(&state);
            if let Err(e) = validated {
                let error = SessionError::Validation(e);
                drop(state);
                self.shared.deliver(vec![SessionEvent::Error(error.clone())]);
                return Err(error.into());
            }
            ticket
        };

        let Some(file) = file else {
            return Err(ClientError::Internal(
                "validation passed without a file".into(),
            ));
        };

        // ── Upload ───────────────────────────────────────────────────────
        self.shared.deliver(vec![SessionEvent::UploadStart {
            file_name: file.name().to_string(),
            size: file.size(),
        }]);
        let result = self.api.upload(&file).await;

        // ── Start polling ────────────────────────────────────────────────
        let mut state = self.shared.lock();
        let step = state.session.upload_finished(ticket, result.clone());
        self.shared.publish(&state);

        match step {
            Step::Stale => Err(ClientError::Cancelled),
            Step::Finished => {
                let events: Vec<_> = Shared::terminal_event(&state).into_iter().collect();
                drop(state);
                self.shared.deliver(events);
                Err(match result {
                    Err(e) => e.into(),
                    Ok(_) => ClientError::Internal("upload finished without an error".into()),
                })
            }
            Step::Advanced => {
                let task_id = match state.session.task_id() {
                    Some(id) => id.clone(),
                    None => return Err(ClientError::Internal("polling without a task id".into())),
                };
                let task = tokio::spawn(poll_loop(
                    Arc::clone(&self.shared),
                    Arc::clone(&self.api),
                    ticket,
                    task_id.clone(),
                    self.config.poll_interval(),
                ));
                state.poll = Some(PollHandle { task: Some(task) });
                drop(state);

                info!("Polling task {} every {:?}", task_id, self.config.poll_interval());
                self.shared
                    .deliver(vec![SessionEvent::TaskAccepted(task_id.clone())]);
                Ok(task_id)
            }
        }
    }

    /// Wait for the current session to reach a terminal phase.
    ///
    /// Resolves with [`ClientError::Cancelled`] when the session is reset or
    /// cancelled first, or when there is no session to wait for.
    pub async fn wait(&self) -> Result<CompletedConversion, ClientError> {
        let mut views = self.shared.views.subscribe();
        let ticket = self.shared.lock().session.ticket();

        loop {
            {
                let state = self.shared.lock();
                let session = &state.session;
                if !session.is_current(ticket) {
                    return Err(ClientError::Cancelled);
                }
                match session.phase() {
                    PhaseKind::Idle => return Err(ClientError::Cancelled),
                    PhaseKind::Complete => {
                        if let (Some(task_id), Some(summary)) = (session.task_id(), session.summary())
                        {
                            return Ok(CompletedConversion {
                                task_id: task_id.clone(),
                                download_url: self.api.download_url(task_id),
                                summary: summary.clone(),
                            });
                        }
                    }
                    PhaseKind::Error => {
                        if let Some(error) = session.error() {
                            return Err(error.clone().into());
                        }
                    }
                    PhaseKind::Validating | PhaseKind::Uploading | PhaseKind::Polling => {}
                }
            }

            views
                .changed()
                .await
                .map_err(|_| ClientError::Internal("session view channel closed".into()))?;
        }
    }

    /// Submit and wait in one call.
    pub async fn run(&self, file: AudioFile) -> Result<CompletedConversion, ClientError> {
        self.submit(Some(file)).await?;
        self.wait().await
    }

    /// Stop any poll loop and return to Idle. The server is not told.
    pub fn cancel(&self) {
        let poll = {
            let mut state = self.shared.lock();
            state.session.cancel();
            self.shared.publish(&state);
            state.poll.take()
        };
        drop(poll);
        self.shared.deliver(vec![SessionEvent::Reset]);
    }

    /// Clear the session and return to Idle. Safe from any phase, idempotent.
    pub fn reset(&self) {
        let poll = {
            let mut state = self.shared.lock();
            state.session.reset();
            self.shared.publish(&state);
            state.poll.take()
        };
        drop(poll);
        self.shared.deliver(vec![SessionEvent::Reset]);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shared.lock().poll.take();
    }
}

/// Feed status ticks into the session until it leaves Polling.
async fn poll_loop(
    shared: Arc<Shared>,
    api: Arc<dyn ConversionApi>,
    ticket: Ticket,
    task_id: TaskId,
    every: Duration,
) {
    let mut statuses = stream::status_stream(api, task_id.clone(), every);

    while let Some(result) = statuses.next().await {
        let progress = match &result {
            Ok(report) if report.status == TaskStatus::Processing => {
                Some(report.progress_percent())
            }
            _ => None,
        };

        let (step, events) = {
            let mut state = shared.lock();
            let step = state.session.apply_status(ticket, result);
            let events: Vec<SessionEvent> = match step {
                Step::Stale => Vec::new(),
                Step::Advanced => progress
                    .map(|p| SessionEvent::Progress(task_id.clone(), p))
                    .into_iter()
                    .collect(),
                Step::Finished => {
                    if let Some(handle) = state.poll.take() {
                        handle.release();
                    }
                    Shared::terminal_event(&state).into_iter().collect()
                }
            };
            if step != Step::Stale {
                shared.publish(&state);
            }
            (step, events)
        };

        if step == Step::Stale {
            debug!("Poll loop for task {} is stale; stopping", task_id);
            return;
        }
        shared.deliver(events);
        if step == Step::Finished {
            info!("Task {} finished; poll timer stopped", task_id);
            return;
        }
    }
}
