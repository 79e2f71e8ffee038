//! Observer trait for conversion-session events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] via
//! [`crate::config::ClientConfigBuilder::observer`] to receive events as a
//! session moves through upload, polling, and its terminal phase.
//!
//! Events are delivered after the session lock is released, so an observer
//! may read the controller's view. It must not block: it runs on the task
//! that drives the session.
//!
//! # Example
//!
//! ```rust
//! use audioconv::{ClientConfig, SessionObserver, TaskId};
//! use std::sync::Arc;
//!
//! struct PrintProgress;
//!
//! impl SessionObserver for PrintProgress {
//!     fn on_progress(&self, task_id: &TaskId, percent: u8) {
//!         eprintln!("{task_id}: {percent}%");
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .observer(Arc::new(PrintProgress))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::SessionError;
use crate::report::{ConversionSummary, TaskId};
use std::sync::Arc;

/// Called by the session controller as a conversion advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait SessionObserver: Send + Sync {
    /// Called once validation passed, just before the upload request.
    fn on_upload_start(&self, file_name: &str, size: u64) {
        let _ = (file_name, size);
    }

    /// Called when the server accepted the upload and polling begins.
    fn on_task_accepted(&self, task_id: &TaskId) {
        let _ = task_id;
    }

    /// Called for every `processing` status tick.
    fn on_progress(&self, task_id: &TaskId, percent: u8) {
        let _ = (task_id, percent);
    }

    /// Called once when the task completes.
    fn on_complete(&self, task_id: &TaskId, summary: &ConversionSummary) {
        let _ = (task_id, summary);
    }

    /// Called once when the session enters its Error phase.
    fn on_error(&self, error: &SessionError) {
        let _ = error;
    }

    /// Called on every reset or cancel.
    fn on_reset(&self) {}
}

/// A no-op implementation for callers that don't need events.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ObserverRef = Arc<dyn SessionObserver>;

/// An event captured under the session lock and delivered after it is released.
#[derive(Debug, Clone)]
pub(crate) enum SessionEvent {
    UploadStart { file_name: String, size: u64 },
    TaskAccepted(TaskId),
    Progress(TaskId, u8),
    Complete(TaskId, ConversionSummary),
    Error(SessionError),
    Reset,
}

impl SessionEvent {
    pub(crate) fn deliver(&self, observer: &dyn SessionObserver) {
        match self {
            SessionEvent::UploadStart { file_name, size } => {
                observer.on_upload_start(file_name, *size)
            }
            SessionEvent::TaskAccepted(id) => observer.on_task_accepted(id),
            SessionEvent::Progress(id, pct) => observer.on_progress(id, *pct),
            SessionEvent::Complete(id, summary) => observer.on_complete(id, summary),
            SessionEvent::Error(e) => observer.on_error(e),
            SessionEvent::Reset => observer.on_reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingObserver {
        progress: Mutex<Vec<u8>>,
        completes: AtomicUsize,
        errors: AtomicUsize,
        resets: AtomicUsize,
    }

    impl SessionObserver for TrackingObserver {
        fn on_progress(&self, _task_id: &TaskId, percent: u8) {
            self.progress.lock().unwrap().push(percent);
        }

        fn on_complete(&self, _task_id: &TaskId, _summary: &ConversionSummary) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _error: &SessionError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_reset(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let ob = NoopObserver;
        let id = TaskId::new("t");
        ob.on_upload_start("a.wav", 10);
        ob.on_task_accepted(&id);
        ob.on_progress(&id, 50);
        ob.on_error(&SessionError::TaskNotFound);
        ob.on_reset();
    }

    #[test]
    fn events_route_to_matching_methods() {
        let ob = TrackingObserver::default();
        let id = TaskId::new("abc");
        let summary = ConversionSummary {
            filename: "x.wav".into(),
            original_size: 1,
            converted_size: 1,
            original_format: Default::default(),
        };

        for event in [
            SessionEvent::Progress(id.clone(), 40),
            SessionEvent::Progress(id.clone(), 80),
            SessionEvent::Complete(id.clone(), summary),
            SessionEvent::Error(SessionError::TaskNotFound),
            SessionEvent::Reset,
        ] {
            event.deliver(&ob);
        }

        assert_eq!(*ob.progress.lock().unwrap(), vec![40, 80]);
        assert_eq!(ob.completes.load(Ordering::SeqCst), 1);
        assert_eq!(ob.errors.load(Ordering::SeqCst), 1);
        assert_eq!(ob.resets.load(Ordering::SeqCst), 1);
    }
}
