//! Meilikit Client Library
//!
//! Async HTTP client for the Meilisearch REST API, plus a [`blocking`]
//! facade driving the same implementation on an owned runtime.
//!
//! Mutating calls return a [`TaskInfo`] handle immediately; use
//! [`Client::wait_for_task`] to block until the server has processed it.

pub mod blocking;
mod client;
mod documents;
mod index;
mod keys;
mod settings;
mod tasks;
mod transport;

pub use client::Client;
pub use documents::{BatchSummary, DocumentsQuery};
pub use index::Index;
pub use tasks::{wait_for_task, TaskSource, WaitOptions};
pub use transport::HttpTransport;

pub use meilikit_core::search::facet_search_params;
pub use meilikit_core::{
    generate_tenant_token, ClientStats, Config, DocumentFormat, DocumentsInfo, ErrorBody,
    FacetHit, FacetOrder, FacetSearchResults, Faceting, Filter, Health, IndexInfo, IndexStats,
    Key, KeyCreate, KeySearch, KeyUpdate, MatchingStrategy, MinWordSizeForTypos, Pagination,
    SearchParams, SearchResults, SearchResultsWithUid, Settings, Task, TaskFilter, TaskInfo,
    TaskList, TaskStatus, TypoTolerance, ValidationError, Version,
};

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Communication(#[from] reqwest::Error),

    #[error("Server error: {status} - {body}")]
    Api { status: u16, body: ErrorBody },

    #[error("Task {task_uid} did not finish within {timeout:?}")]
    Timeout { task_uid: u64, timeout: Duration },

    #[error("Task {task_uid} ended as {status}{}", .error.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    TaskFailed {
        task_uid: u64,
        status: TaskStatus,
        error: Option<ErrorBody>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid API key: {0}")]
    InvalidApiKey(#[from] reqwest::header::InvalidHeaderValue),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background job failed: {0}")]
    Background(String),
}

impl ClientError {
    /// The server error code, when the server answered with one
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { body, .. } if !body.code.is_empty() => Some(&body.code),
            _ => None,
        }
    }

    pub fn is_index_not_found(&self) -> bool {
        self.code() == Some("index_not_found")
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
