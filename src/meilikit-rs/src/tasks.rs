//! Task polling and task management endpoints.
//!
//! The poller only observes a task; it never cancels it. A timeout means
//! the client stopped waiting, the server may still complete the job.

use std::time::Duration;

use async_trait::async_trait;
use meilikit_core::{Task, TaskFilter, TaskInfo, TaskList, TaskStatus, TaskWaitConfig};
use reqwest::Method;
use tokio::time::Instant;
use tracing::debug;

use crate::client::Client;
use crate::transport::HttpTransport;
use crate::{ClientError, Result};

/// Deadline used by operations that create or delete something and then
/// wait for it before returning
pub(crate) const COMPOSITE_TIMEOUT: Duration = Duration::from_secs(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// `None` waits forever
    pub timeout: Option<Duration>,
    pub interval: Duration,
    /// Turn a failed or canceled task into `ClientError::TaskFailed`
    pub raise_for_status: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(5000)),
            interval: Duration::from_millis(50),
            raise_for_status: false,
        }
    }
}

impl WaitOptions {
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn raise_for_status(mut self, raise: bool) -> Self {
        self.raise_for_status = raise;
        self
    }

    pub(crate) fn composite(self) -> Self {
        self.with_timeout(Some(COMPOSITE_TIMEOUT))
    }
}

impl From<&TaskWaitConfig> for WaitOptions {
    fn from(config: &TaskWaitConfig) -> Self {
        Self {
            timeout: config.timeout(),
            interval: config.interval(),
            raise_for_status: false,
        }
    }
}

/// Anything that can fetch the current snapshot of a task
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn fetch_task(&self, task_uid: u64) -> Result<Task>;
}

#[async_trait]
impl TaskSource for HttpTransport {
    async fn fetch_task(&self, task_uid: u64) -> Result<Task> {
        self.get(&format!("tasks/{task_uid}"), &[]).await
    }
}

/// Poll `source` until the task reaches a terminal status.
///
/// Elapsed time is counted from before the first fetch and the sleep between
/// polls is capped at the time left. Fetch errors are returned as-is.
pub async fn wait_for_task<S>(source: &S, task_uid: u64, options: &WaitOptions) -> Result<Task>
where
    S: TaskSource + ?Sized,
{
    let start = Instant::now();

    loop {
        let task = source.fetch_task(task_uid).await?;
        debug!(task_uid, status = %task.status, "Polled task");

        if task.status.is_terminal() {
            if options.raise_for_status && task.status.is_failure() {
                return Err(ClientError::TaskFailed {
                    task_uid,
                    status: task.status,
                    error: task.error,
                });
            }
            return Ok(task);
        }

        let pause = match options.timeout {
            Some(timeout) => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    return Err(ClientError::Timeout { task_uid, timeout });
                }
                options.interval.min(timeout - elapsed)
            }
            None => options.interval,
        };

        tokio::time::sleep(pause).await;
    }
}

impl Client {
    pub async fn get_task(&self, task_uid: u64) -> Result<Task> {
        self.transport.fetch_task(task_uid).await
    }

    /// List tasks, optionally restricted to some indexes and task types
    pub async fn get_tasks(&self, index_uids: &[&str], types: &[&str]) -> Result<TaskList> {
        let mut query = Vec::new();
        if !index_uids.is_empty() {
            query.push(("indexUids", index_uids.join(",")));
        }
        if !types.is_empty() {
            query.push(("types", types.join(",")));
        }
        self.transport.get("tasks", &query).await
    }

    /// Wait for a task with the client's default polling options
    pub async fn wait_for_task(&self, task_uid: u64) -> Result<Task> {
        wait_for_task(self.transport.as_ref(), task_uid, &self.wait).await
    }

    pub async fn wait_for_task_with(&self, task_uid: u64, options: &WaitOptions) -> Result<Task> {
        wait_for_task(self.transport.as_ref(), task_uid, options).await
    }

    /// Cancel matching tasks; an empty filter cancels every enqueued or
    /// processing task
    pub async fn cancel_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo> {
        let query = filter.to_query(&[TaskStatus::Enqueued, TaskStatus::Processing]);
        self.transport
            .request::<(), _>(Method::POST, "tasks/cancel", &query, None)
            .await
    }

    /// Delete matching tasks from the history; an empty filter deletes all
    pub async fn delete_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo> {
        let query = filter.to_query(&TaskStatus::ALL);
        self.transport.delete("tasks", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meilikit_core::ErrorBody;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replays a fixed status sequence; the last status repeats forever
    struct ScriptedSource {
        statuses: Mutex<VecDeque<TaskStatus>>,
        fetches: AtomicUsize,
        fetch_delay: Duration,
    }

    impl ScriptedSource {
        fn new(statuses: &[TaskStatus]) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                fetches: AtomicUsize::new(0),
                fetch_delay: Duration::ZERO,
            }
        }

        fn with_fetch_delay(mut self, delay: Duration) -> Self {
            self.fetch_delay = delay;
            self
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    fn task(uid: u64, status: TaskStatus) -> Task {
        Task {
            uid,
            index_uid: Some("movies".to_string()),
            status,
            task_type: "documentAdditionOrUpdate".to_string(),
            details: None,
            error: (status == TaskStatus::Failed).then(|| ErrorBody {
                message: "The primary key inference failed".to_string(),
                code: "index_primary_key_no_candidate_found".to_string(),
                error_type: "invalid_request".to_string(),
                link: String::new(),
            }),
            canceled_by: None,
            duration: None,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    #[async_trait]
    impl TaskSource for ScriptedSource {
        async fn fetch_task(&self, task_uid: u64) -> Result<Task> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
            let status = {
                let mut statuses = self.statuses.lock().unwrap();
                if statuses.len() > 1 {
                    statuses.pop_front().unwrap()
                } else {
                    *statuses.front().unwrap()
                }
            };
            Ok(task(task_uid, status))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TaskSource for FailingSource {
        async fn fetch_task(&self, _task_uid: u64) -> Result<Task> {
            Err(ClientError::Api {
                status: 404,
                body: ErrorBody {
                    message: "Task `9` not found.".to_string(),
                    code: "task_not_found".to_string(),
                    error_type: "invalid_request".to_string(),
                    link: String::new(),
                },
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_succeeded_snapshot() {
        let source = ScriptedSource::new(&[
            TaskStatus::Enqueued,
            TaskStatus::Processing,
            TaskStatus::Succeeded,
        ]);

        let task = wait_for_task(&source, 1, &WaitOptions::default()).await.unwrap();

        assert_eq!(task.uid, 1);
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_task_never_finishes() {
        let source = ScriptedSource::new(&[TaskStatus::Enqueued]);
        let options = WaitOptions::default()
            .with_timeout(Some(Duration::from_millis(200)))
            .with_interval(Duration::from_millis(50));

        let start = Instant::now();
        let err = wait_for_task(&source, 7, &options).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Timeout { task_uid: 7, timeout } if timeout == Duration::from_millis(200)
        ));
        // Sleeps never overshoot the deadline
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(210));
        assert_eq!(source.fetches(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_sleep_is_capped_at_remaining_time() {
        let source = ScriptedSource::new(&[TaskStatus::Processing]);
        let options = WaitOptions::default()
            .with_timeout(Some(Duration::from_millis(120)))
            .with_interval(Duration::from_millis(50));

        let start = Instant::now();
        let err = wait_for_task(&source, 2, &options).await.unwrap_err();

        assert!(matches!(err, ClientError::Timeout { .. }));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(120) && elapsed < Duration::from_millis(130));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetches_count_toward_deadline() {
        let source = ScriptedSource::new(&[TaskStatus::Enqueued])
            .with_fetch_delay(Duration::from_millis(100));
        let options = WaitOptions::default()
            .with_timeout(Some(Duration::from_millis(250)))
            .with_interval(Duration::from_millis(50));

        let err = wait_for_task(&source, 3, &options).await.unwrap_err();

        assert!(matches!(err, ClientError::Timeout { .. }));
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_task_returned_unless_raising() {
        let source = ScriptedSource::new(&[TaskStatus::Processing, TaskStatus::Failed]);
        let task = wait_for_task(&source, 4, &WaitOptions::default()).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        let expected_error = task.error.clone();

        let source = ScriptedSource::new(&[TaskStatus::Processing, TaskStatus::Failed]);
        let options = WaitOptions::default().raise_for_status(true);
        let err = wait_for_task(&source, 4, &options).await.unwrap_err();

        match err {
            ClientError::TaskFailed {
                task_uid,
                status,
                error,
            } => {
                assert_eq!(task_uid, 4);
                assert_eq!(status, TaskStatus::Failed);
                assert_eq!(error, expected_error);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_task_raises_when_requested() {
        let source = ScriptedSource::new(&[TaskStatus::Canceled]);
        let options = WaitOptions::default().raise_for_status(true);

        let err = wait_for_task(&source, 5, &options).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::TaskFailed { status: TaskStatus::Canceled, error: None, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repolling_terminal_task_is_idempotent() {
        let source = ScriptedSource::new(&[TaskStatus::Succeeded]);

        let first = wait_for_task(&source, 6, &WaitOptions::default()).await.unwrap();
        let second = wait_for_task(&source, 6, &WaitOptions::default()).await.unwrap();

        assert_eq!(first.status, second.status);
        assert_eq!(first.uid, second.uid);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timeout_keeps_polling() {
        let mut statuses = vec![TaskStatus::Enqueued; 500];
        statuses.push(TaskStatus::Succeeded);
        let source = ScriptedSource::new(&statuses);

        let task = wait_for_task(&source, 8, &WaitOptions::default().with_timeout(None))
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(source.fetches(), 501);
    }

    #[tokio::test]
    async fn test_fetch_errors_are_not_retried() {
        let err = wait_for_task(&FailingSource, 9, &WaitOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("task_not_found"));
    }

    fn task_json(uid: u64) -> serde_json::Value {
        json!({
            "uid": uid,
            "indexUid": "movies",
            "status": "succeeded",
            "type": "documentAdditionOrUpdate",
            "enqueuedAt": "2023-06-09T01:03:48Z"
        })
    }

    fn task_info(uid: u64, task_type: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "taskUid": uid,
            "indexUid": null,
            "status": "enqueued",
            "type": task_type,
            "enqueuedAt": "2023-06-09T01:03:48Z"
        }))
    }

    #[tokio::test]
    async fn test_get_task_and_filtered_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json(12)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .and(query_param("indexUids", "movies,books"))
            .and(query_param("types", "documentAdditionOrUpdate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [task_json(12), task_json(11)],
                "limit": 20,
                "from": 12,
                "next": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(server.uri(), None).unwrap();
        assert_eq!(client.get_task(12).await.unwrap().status, TaskStatus::Succeeded);

        let list = client
            .get_tasks(&["movies", "books"], &["documentAdditionOrUpdate"])
            .await
            .unwrap();
        assert_eq!(list.results.len(), 2);
        assert_eq!(list.from, Some(12));
    }

    #[tokio::test]
    async fn test_unfiltered_list_sends_no_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "limit": 20
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(server.uri(), None).unwrap();
        assert!(client.get_tasks(&[], &[]).await.unwrap().results.is_empty());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn test_empty_filter_cancels_pending_tasks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks/cancel"))
            .and(query_param("statuses", "enqueued,processing"))
            .respond_with(task_info(20, "taskCancelation"))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(server.uri(), None).unwrap();
        let info = client.cancel_tasks(&TaskFilter::new()).await.unwrap();
        assert_eq!(info.task_uid, 20);
    }

    #[tokio::test]
    async fn test_empty_filter_deletes_every_task() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/tasks"))
            .and(query_param("statuses", "canceled,enqueued,failed,processing,succeeded"))
            .respond_with(task_info(21, "taskDeletion"))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(server.uri(), None).unwrap();
        let info = client.delete_tasks(&TaskFilter::new()).await.unwrap();
        assert_eq!(info.task_uid, 21);
    }

    #[tokio::test]
    async fn test_combined_filter_is_sent_as_given() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks/cancel"))
            .and(query_param("uids", "1,2"))
            .and(query_param("indexUids", "movies"))
            .and(query_param("statuses", "enqueued"))
            .and(query_param("types", "documentDeletion"))
            .respond_with(task_info(22, "taskCancelation"))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(server.uri(), None).unwrap();
        let filter = TaskFilter::new()
            .with_uids([1, 2])
            .with_index_uids(["movies"])
            .with_statuses([TaskStatus::Enqueued])
            .with_types(["documentDeletion"]);
        client.cancel_tasks(&filter).await.unwrap();

        // A non-empty filter never picks up the default status list
        let requests = server.received_requests().await.unwrap();
        let statuses: Vec<_> = requests[0]
            .url
            .query_pairs()
            .filter(|(key, _)| key == "statuses")
            .collect();
        assert_eq!(statuses.len(), 1);
    }

    #[test]
    fn test_wait_options_from_config() {
        let options = WaitOptions::from(&TaskWaitConfig {
            timeout_ms: None,
            interval_ms: 10,
        });
        assert_eq!(options.timeout, None);
        assert_eq!(options.interval, Duration::from_millis(10));
        assert_eq!(WaitOptions::default().composite().timeout, Some(COMPOSITE_TIMEOUT));
    }
}
