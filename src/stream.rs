//! Status polling as a `Stream`.
//!
//! [`status_stream`] yields one status result per interval tick, forever.
//! [`poll_until_done`] wraps it and ends after the first terminal result
//! (complete, error, unknown, or a failed request), which is what most
//! callers outside the session controller want.
//!
//! The first request is issued one interval after the stream is created,
//! matching a repeating timer started right after the upload. Requests are
//! issued one at a time: if a response takes longer than the interval, the
//! next tick waits for it instead of stacking a second request.

use crate::api::ConversionApi;
use crate::error::SessionError;
use crate::report::{StatusReport, TaskId};
use futures::future;
use futures::stream::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::Stream;
use tracing::debug;

/// A boxed stream of status results.
pub type StatusStream = Pin<Box<dyn Stream<Item = Result<StatusReport, SessionError>> + Send>>;

/// Poll `task_id` every `every`, yielding each result.
pub fn status_stream(api: Arc<dyn ConversionApi>, task_id: TaskId, every: Duration) -> StatusStream {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let s = IntervalStream::new(ticker).then(move |_| {
        let api = Arc::clone(&api);
        let task_id = task_id.clone();
        async move {
            debug!("Status tick for task {}", task_id);
            api.status(&task_id).await
        }
    });

    Box::pin(s)
}

/// Like [`status_stream`], but ends right after the first terminal result.
pub fn poll_until_done(
    api: Arc<dyn ConversionApi>,
    task_id: TaskId,
    every: Duration,
) -> StatusStream {
    let s = status_stream(api, task_id, every).scan(false, |done, item| {
        if *done {
            return future::ready(None);
        }
        *done = match &item {
            Ok(report) => report.status.is_terminal(),
            Err(_) => true,
        };
        future::ready(Some(item))
    });

    Box::pin(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::AudioFile;
    use crate::report::TaskStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports `processing` twice, then `complete`, then keeps answering.
    struct CountingApi {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ConversionApi for CountingApi {
        async fn upload(&self, _file: &AudioFile) -> Result<TaskId, SessionError> {
            Ok(TaskId::new("t"))
        }

        async fn status(&self, _task_id: &TaskId) -> Result<StatusReport, SessionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let status = if n < 2 {
                TaskStatus::Processing
            } else {
                TaskStatus::Complete
            };
            Ok(StatusReport::with_status(status))
        }

        fn download_url(&self, task_id: &TaskId) -> String {
            task_id.download_path()
        }
    }

    #[tokio::test]
    async fn poll_until_done_stops_after_terminal() {
        let api = Arc::new(CountingApi {
            calls: AtomicUsize::new(0),
        });
        let results: Vec<_> = poll_until_done(
            api.clone() as Arc<dyn ConversionApi>,
            TaskId::new("t"),
            Duration::from_millis(5),
        )
        .collect()
        .await;

        let statuses: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().status)
            .collect();
        assert_eq!(
            statuses,
            vec![TaskStatus::Processing, TaskStatus::Processing, TaskStatus::Complete]
        );
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn status_stream_keeps_going() {
        let api = Arc::new(CountingApi {
            calls: AtomicUsize::new(0),
        });
        let taken: Vec<_> = status_stream(api, TaskId::new("t"), Duration::from_millis(5))
            .take(5)
            .collect()
            .await;
        assert_eq!(taken.len(), 5);
    }
}
