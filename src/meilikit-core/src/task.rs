//! Server-side asynchronous tasks.
//!
//! Every mutating call is queued by the server as a task. The client only
//! observes tasks: a [`TaskInfo`] handle comes back from the mutation and a
//! full [`Task`] snapshot is fetched when polling.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ErrorBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Canceled,
        TaskStatus::Enqueued,
        TaskStatus::Failed,
        TaskStatus::Processing,
        TaskStatus::Succeeded,
    ];

    /// No further transitions happen once a task reaches a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Enqueued => "enqueued",
            TaskStatus::Processing => "processing",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TaskInfo is the handle returned by every asynchronous mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub task_uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub task_type: String,
    pub enqueued_at: DateTime<Utc>,
}

/// Task is a full snapshot of a task as returned by `GET /tasks/{uid}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
    #[serde(default)]
    pub canceled_by: Option<u64>,
    #[serde(default)]
    pub duration: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// One page of tasks, newest first
#[derive(Debug, Clone, Deserialize)]
pub struct TaskList {
    pub results: Vec<Task>,
    pub limit: usize,
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub next: Option<u64>,
}

/// TaskFilter selects tasks for bulk cancellation or deletion.
///
/// All criteria are combined by the server. A filter with no criteria at all
/// is not a no-op: it is expanded to a status list matching every task the
/// operation can touch (see [`TaskFilter::to_query`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub uids: Vec<u64>,
    pub index_uids: Vec<String>,
    pub statuses: Vec<TaskStatus>,
    pub types: Vec<String>,
    pub before_enqueued_at: Option<DateTime<Utc>>,
    pub after_enqueued_at: Option<DateTime<Utc>>,
    pub before_started_at: Option<DateTime<Utc>>,
    pub after_finished_at: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uids(mut self, uids: impl IntoIterator<Item = u64>) -> Self {
        self.uids = uids.into_iter().collect();
        self
    }

    pub fn with_index_uids<S: Into<String>>(mut self, index_uids: impl IntoIterator<Item = S>) -> Self {
        self.index_uids = index_uids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn before_enqueued_at(mut self, at: DateTime<Utc>) -> Self {
        self.before_enqueued_at = Some(at);
        self
    }

    pub fn after_enqueued_at(mut self, at: DateTime<Utc>) -> Self {
        self.after_enqueued_at = Some(at);
        self
    }

    pub fn before_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.before_started_at = Some(at);
        self
    }

    pub fn after_finished_at(mut self, at: DateTime<Utc>) -> Self {
        self.after_finished_at = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskFilter::default()
    }

    /// Build the query string pairs for this filter.
    ///
    /// When the filter is empty, `default_statuses` is used as the status list
    /// so the request still matches what the caller asked for ("everything").
    pub fn to_query(&self, default_statuses: &[TaskStatus]) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();

        if self.is_empty() {
            query.push(("statuses", join(default_statuses.iter().map(|s| s.as_str()))));
            return query;
        }

        if !self.uids.is_empty() {
            query.push(("uids", join(self.uids.iter().map(u64::to_string))));
        }
        if !self.index_uids.is_empty() {
            query.push(("indexUids", join(self.index_uids.iter())));
        }
        if !self.statuses.is_empty() {
            query.push(("statuses", join(self.statuses.iter().map(|s| s.as_str()))));
        }
        if !self.types.is_empty() {
            query.push(("types", join(self.types.iter())));
        }

        let dates = [
            ("beforeEnqueuedAt", self.before_enqueued_at),
            ("afterEnqueuedAt", self.after_enqueued_at),
            ("beforeStartedAt", self.before_started_at),
            ("afterFinishedAt", self.after_finished_at),
        ];
        for (name, value) in dates {
            if let Some(at) = value {
                query.push((name, at.to_rfc3339_opts(SecondsFormat::Secs, true)));
            }
        }

        query
    }
}

fn join<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Enqueued.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Canceled.is_terminal());

        assert!(!TaskStatus::Succeeded.is_failure());
        assert!(TaskStatus::Canceled.is_failure());
    }

    #[test]
    fn test_task_deserializes_server_payload() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "uid": 4,
            "indexUid": "movies",
            "status": "failed",
            "type": "indexDeletion",
            "canceledBy": null,
            "details": { "deletedDocuments": 30 },
            "error": {
                "message": "Index `movies` not found.",
                "code": "index_not_found",
                "type": "invalid_request",
                "link": "https://docs.meilisearch.com/errors#index_not_found"
            },
            "duration": "PT0.002765250S",
            "enqueuedAt": "2023-06-09T01:03:48.311936656Z",
            "startedAt": "2023-06-09T01:03:48.314143377Z",
            "finishedAt": "2023-06-09T01:03:48.316536088Z"
        }))
        .unwrap();

        assert_eq!(task.uid, 4);
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.task_type, "indexDeletion");
        assert_eq!(task.error.unwrap().code, "index_not_found");
        assert!(task.finished_at.is_some());
    }

    #[test]
    fn test_task_info_deserializes_enqueued_handle() {
        let info: TaskInfo = serde_json::from_value(serde_json::json!({
            "taskUid": 0,
            "indexUid": "movies",
            "status": "enqueued",
            "type": "documentAdditionOrUpdate",
            "enqueuedAt": "2021-08-12T10:00:00.000000Z"
        }))
        .unwrap();

        assert_eq!(info.task_uid, 0);
        assert_eq!(info.status, TaskStatus::Enqueued);
    }

    #[test]
    fn test_empty_filter_uses_default_statuses() {
        let query = TaskFilter::new().to_query(&[TaskStatus::Enqueued, TaskStatus::Processing]);
        assert_eq!(query, vec![("statuses", "enqueued,processing".to_string())]);

        let query = TaskFilter::new().to_query(&TaskStatus::ALL);
        assert_eq!(
            query,
            vec![(
                "statuses",
                "canceled,enqueued,failed,processing,succeeded".to_string()
            )]
        );
    }

    #[test]
    fn test_filter_combines_criteria() {
        let at = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
        let filter = TaskFilter::new()
            .with_uids([1, 2])
            .with_index_uids(["movies", "books"])
            .with_types(["documentAdditionOrUpdate"])
            .before_enqueued_at(at);

        let query = filter.to_query(&TaskStatus::ALL);

        assert_eq!(
            query,
            vec![
                ("uids", "1,2".to_string()),
                ("indexUids", "movies,books".to_string()),
                ("types", "documentAdditionOrUpdate".to_string()),
                ("beforeEnqueuedAt", "2023-01-02T03:04:05Z".to_string()),
            ]
        );
    }
}
