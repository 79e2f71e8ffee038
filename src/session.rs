//! The conversion-session state machine.
//!
//! ```text
//!            select            pass              task id
//!   Idle ───────────▶ Validating ─────▶ Uploading ────────▶ Polling ──┐ processing
//!    ▲                    │ fail            │ fail          │  ▲ ◀─────┘
//!    │                    ▼                 ▼               │
//!    │                  Error ◀─────────────────────────────┤ error / unknown / transport
//!    │  reset/cancel      │                                 ▼
//!    └────────────────────┴──────────────────────────── Complete
//! ```
//!
//! [`Session`] is pure: it performs no I/O and owns no timer. The
//! controller feeds it the results of network calls and keeps the poll timer
//! alive exactly while [`Session::is_polling`] is true.
//!
//! Every submission, reset and cancel starts a new *generation*. Work is
//! issued under a [`Ticket`] for the generation current at the time, and a
//! result arriving with an older ticket is discarded. This is what keeps a
//! status response that was already in flight when the user cancelled from
//! repainting an idle session.

use crate::error::{ClientError, SessionError, ValidationError};
use crate::pipeline::input::FileMeta;
use crate::pipeline::validate;
use crate::report::{ConversionSummary, StatusReport, TaskId, TaskStatus};
use crate::view::View;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// The phase a session is in, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Idle,
    Validating,
    Uploading,
    Polling,
    Complete,
    Error,
}

impl PhaseKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseKind::Complete | PhaseKind::Error)
    }

    /// Validating, uploading or polling: a new file cannot be accepted.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            PhaseKind::Validating | PhaseKind::Uploading | PhaseKind::Polling
        )
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseKind::Idle => "idle",
            PhaseKind::Validating => "validating",
            PhaseKind::Uploading => "uploading",
            PhaseKind::Polling => "polling",
            PhaseKind::Complete => "complete",
            PhaseKind::Error => "error",
        };
        f.write_str(s)
    }
}

/// Identifies the generation a piece of work was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Outcome of feeding a result into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The ticket no longer matches, or the phase does not expect this result.
    Stale,
    /// Applied; the session is still in a non-terminal phase.
    Advanced,
    /// Applied; the session reached Complete or Error.
    Finished,
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    Validating,
    Uploading {
        file: FileMeta,
    },
    Polling {
        file: FileMeta,
        task_id: TaskId,
    },
    Complete {
        file: FileMeta,
        task_id: TaskId,
        summary: ConversionSummary,
    },
    Error {
        error: SessionError,
    },
}

/// All mutable state of one conversion attempt.
#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    generation: u64,
    view: View,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            view: View::idle(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Idle => PhaseKind::Idle,
            Phase::Validating => PhaseKind::Validating,
            Phase::Uploading { .. } => PhaseKind::Uploading,
            Phase::Polling { .. } => PhaseKind::Polling,
            Phase::Complete { .. } => PhaseKind::Complete,
            Phase::Error { .. } => PhaseKind::Error,
        }
    }

    pub fn ticket(&self) -> Ticket {
        Ticket(self.generation)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.phase, Phase::Polling { .. })
    }

    /// Present only while Polling or Complete.
    pub fn task_id(&self) -> Option<&TaskId> {
        match &self.phase {
            Phase::Polling { task_id, .. } | Phase::Complete { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    /// The file being processed, once it passed validation.
    pub fn file(&self) -> Option<&FileMeta> {
        match &self.phase {
            Phase::Uploading { file }
            | Phase::Polling { file, .. }
            | Phase::Complete { file, .. } => Some(file),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&ConversionSummary> {
        match &self.phase {
            Phase::Complete { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SessionError> {
        match &self.phase {
            Phase::Error { error } => Some(error),
            _ => None,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Idle / Complete / Error → Validating. A terminal session is reset first.
    ///
    /// Returns the ticket for this submission.
    pub fn select_file(&mut self) -> Result<Ticket, ClientError> {
        let phase = self.phase();
        if phase.is_busy() {
            return Err(ClientError::Busy {
                phase: phase.to_string(),
            });
        }

        self.generation += 1;
        self.phase = Phase::Validating;
        self.view = View::validating();
        debug!("Session generation {} validating", self.generation);
        Ok(self.ticket())
    }

    /// Validating → Uploading (pass) or Error (fail).
    pub fn validate(
        &mut self,
        ticket: Ticket,
        file: Option<FileMeta>,
        max_size: u64,
    ) -> Result<Step, ValidationError> {
        if !self.is_current(ticket) || !matches!(self.phase, Phase::Validating) {
            return Ok(Step::Stale);
        }

        match validate::validate(file.as_ref(), max_size) {
            Ok(()) => {
                let file = file.ok_or(ValidationError::NoFile)?;
                self.phase = Phase::Uploading { file };
                self.view = View::uploading();
                Ok(Step::Advanced)
            }
            Err(e) => {
                self.fail(SessionError::Validation(e.clone()));
                Err(e)
            }
        }
    }

    /// Uploading → Polling (task id) or Error.
    pub fn upload_finished(&mut self, ticket: Ticket, result: Result<TaskId, SessionError>) -> Step {
        if !self.is_current(ticket) {
            warn!("Discarding upload result for stale generation {}", ticket.0);
            return Step::Stale;
        }
        let file = match &self.phase {
            Phase::Uploading { file } => file.clone(),
            _ => return Step::Stale,
        };

        match result {
            Ok(task_id) => {
                self.phase = Phase::Polling { file, task_id };
                self.view = View::converting();
                Step::Advanced
            }
            Err(e) => {
                self.fail(e);
                Step::Finished
            }
        }
    }

    /// Apply one status tick while Polling.
    pub fn apply_status(
        &mut self,
        ticket: Ticket,
        result: Result<StatusReport, SessionError>,
    ) -> Step {
        if !self.is_current(ticket) {
            warn!("Discarding status result for stale generation {}", ticket.0);
            return Step::Stale;
        }
        let (file, task_id) = match &self.phase {
            Phase::Polling { file, task_id, .. } => (file.clone(), task_id.clone()),
            _ => return Step::Stale,
        };

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                self.fail(e);
                return Step::Finished;
            }
        };

        match report.status {
            TaskStatus::Unknown => {
                self.fail(SessionError::TaskNotFound);
                Step::Finished
            }
            TaskStatus::Error => {
                self.fail(SessionError::ConversionFailed {
                    message: report.error_message(),
                });
                Step::Finished
            }
            TaskStatus::Processing => {
                self.view = View::processing(report.progress_percent());
                Step::Advanced
            }
            TaskStatus::Complete => {
                let summary = ConversionSummary::from_report(&report);
                self.view = View::complete(&task_id, &summary);
                self.phase = Phase::Complete {
                    file,
                    task_id,
                    summary,
                };
                Step::Finished
            }
            TaskStatus::Pending => {
                debug!("Task {} pending", task_id);
                Step::Advanced
            }
            TaskStatus::Other => {
                warn!("Task {} returned an unrecognised status; still waiting", task_id);
                Step::Advanced
            }
        }
    }

    /// Any phase → Idle. Idempotent.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = Phase::Idle;
        self.view = View::idle();
    }

    /// Any phase → Idle, dropping the task id without telling the server.
    pub fn cancel(&mut self) {
        if let Some(id) = self.task_id() {
            debug!("Cancelling session for task {}", id);
        }
        self.reset();
    }

    fn fail(&mut self, error: SessionError) {
        warn!("Session failed: {}", error);
        self.view = View::error(error.to_string(), self.view.progress);
        self.phase = Phase::Error { error };
    }
}
