//! Document endpoints of an index.
//!
//! Bulk helpers partition their input and send every batch concurrently.
//! Each request succeeds or fails on its own and the outcome of every one is
//! reported in a [`BatchSummary`]; a failed batch never cancels its siblings.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use meilikit_core::batching::{batches, combine_documents};
use meilikit_core::loader::{self, DocumentFormat};
use meilikit_core::{DocumentsInfo, Filter, TaskInfo, ValidationError};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use urlencoding::encode;

use crate::index::Index;
use crate::{ClientError, Result};

/// Outcome of a fan-out of document requests, in input order.
///
/// `succeeded` counts requests the server accepted; the tasks they enqueued
/// still have to be awaited to know whether the documents were indexed.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<Result<TaskInfo>>,
}

impl BatchSummary {
    pub(crate) fn from_results(results: Vec<Result<TaskInfo>>) -> Self {
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    fn extend(&mut self, other: BatchSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.results.extend(other.results);
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn task_infos(&self) -> impl Iterator<Item = &TaskInfo> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    /// All task handles, or the first error
    pub fn into_result(self) -> Result<Vec<TaskInfo>> {
        self.results.into_iter().collect()
    }
}

/// Options of [`Index::get_documents`]
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentsQuery {
    pub offset: usize,
    pub limit: usize,
    pub fields: Option<Vec<String>>,
    pub filter: Option<Filter>,
}

impl Default for DocumentsQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
            fields: None,
            filter: None,
        }
    }
}

impl DocumentsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

#[derive(Serialize)]
struct FetchDocumentsRequest<'a> {
    offset: usize,
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [String]>,
    filter: &'a Filter,
}

/// Run a synchronous loader job on the blocking pool
async fn run_blocking<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, ValidationError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ClientError::Background(e.to_string()))?
        .map_err(ClientError::from)
}

async fn load_file(path: &Path, csv_delimiter: Option<&str>) -> Result<Vec<Value>> {
    let path = path.to_path_buf();
    let csv_delimiter = csv_delimiter.map(str::to_string);
    run_blocking(move || loader::load_documents_from_file(&path, csv_delimiter.as_deref())).await
}

async fn list_directory(dir: &Path, format: DocumentFormat) -> Result<Vec<PathBuf>> {
    let dir = dir.to_path_buf();
    run_blocking(move || loader::documents_in_directory(&dir, format)).await
}

fn primary_key_query(primary_key: Option<&str>) -> Vec<(&'static str, String)> {
    primary_key
        .map(|pk| vec![("primaryKey", pk.to_string())])
        .unwrap_or_default()
}

impl Index {
    /// Fetch one document by its primary key value
    pub async fn get_document(&self, document_id: &str) -> Result<Value> {
        self.transport
            .get(&self.path(&format!("documents/{}", encode(document_id))), &[])
            .await
    }

    /// Fetch a page of documents.
    ///
    /// Without a filter this is a plain `GET`; a filter needs the `POST
    /// documents/fetch` route, which takes the same options as a JSON body.
    pub async fn get_documents(&self, query: &DocumentsQuery) -> Result<DocumentsInfo> {
        match &query.filter {
            None => {
                let mut params = vec![
                    ("offset", query.offset.to_string()),
                    ("limit", query.limit.to_string()),
                ];
                if let Some(fields) = &query.fields {
                    params.push(("fields", fields.join(",")));
                }
                self.transport.get(&self.path("documents"), &params).await
            }
            Some(filter) => {
                let body = FetchDocumentsRequest {
                    offset: query.offset,
                    limit: query.limit,
                    fields: query.fields.as_deref(),
                    filter,
                };
                self.transport
                    .post(&self.path("documents/fetch"), &[], &body)
                    .await
            }
        }
    }

    async fn send_documents<T>(
        &self,
        method: Method,
        documents: &[T],
        primary_key: Option<&str>,
    ) -> Result<TaskInfo>
    where
        T: Serialize + Sync,
    {
        let query = primary_key_query(primary_key);
        debug!(index = %self.uid, %method, count = documents.len(), "Sending documents");
        self.transport
            .request(method, &self.path("documents"), &query, Some(documents))
            .await
    }

    async fn send_in_batches<T>(
        &self,
        method: Method,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<BatchSummary>
    where
        T: Serialize + Sync,
    {
        let requests = batches(documents, batch_size)?
            .into_iter()
            .map(|batch| self.send_documents(method.clone(), batch, primary_key));
        Ok(BatchSummary::from_results(join_all(requests).await))
    }

    /// Add documents, replacing any existing document with the same id
    pub async fn add_documents<T>(&self, documents: &[T], primary_key: Option<&str>) -> Result<TaskInfo>
    where
        T: Serialize + Sync,
    {
        self.send_documents(Method::POST, documents, primary_key).await
    }

    /// Add or update documents, merging fields into existing documents
    pub async fn update_documents<T>(&self, documents: &[T], primary_key: Option<&str>) -> Result<TaskInfo>
    where
        T: Serialize + Sync,
    {
        self.send_documents(Method::PUT, documents, primary_key).await
    }

    pub async fn add_documents_in_batches<T>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<BatchSummary>
    where
        T: Serialize + Sync,
    {
        self.send_in_batches(Method::POST, documents, batch_size, primary_key)
            .await
    }

    pub async fn update_documents_in_batches<T>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<BatchSummary>
    where
        T: Serialize + Sync,
    {
        self.send_in_batches(Method::PUT, documents, batch_size, primary_key)
            .await
    }

    pub async fn add_documents_from_file(
        &self,
        path: impl AsRef<Path>,
        primary_key: Option<&str>,
    ) -> Result<TaskInfo> {
        let documents = load_file(path.as_ref(), None).await?;
        self.add_documents(&documents, primary_key).await
    }

    pub async fn update_documents_from_file(
        &self,
        path: impl AsRef<Path>,
        primary_key: Option<&str>,
    ) -> Result<TaskInfo> {
        let documents = load_file(path.as_ref(), None).await?;
        self.update_documents(&documents, primary_key).await
    }

    pub async fn add_documents_from_file_in_batches(
        &self,
        path: impl AsRef<Path>,
        batch_size: usize,
        primary_key: Option<&str>,
        csv_delimiter: Option<&str>,
    ) -> Result<BatchSummary> {
        let documents = load_file(path.as_ref(), csv_delimiter).await?;
        self.add_documents_in_batches(&documents, batch_size, primary_key)
            .await
    }

    pub async fn update_documents_from_file_in_batches(
        &self,
        path: impl AsRef<Path>,
        batch_size: usize,
        primary_key: Option<&str>,
        csv_delimiter: Option<&str>,
    ) -> Result<BatchSummary> {
        let documents = load_file(path.as_ref(), csv_delimiter).await?;
        self.update_documents_in_batches(&documents, batch_size, primary_key)
            .await
    }

    async fn send_directory(
        &self,
        method: Method,
        dir: &Path,
        batch_size: Option<usize>,
        primary_key: Option<&str>,
        format: DocumentFormat,
        csv_delimiter: Option<&str>,
        combine: bool,
    ) -> Result<BatchSummary> {
        if let Some(0) = batch_size {
            return Err(ValidationError::InvalidBatchSize.into());
        }

        let paths = list_directory(dir, format).await?;
        let mut per_file = Vec::with_capacity(paths.len());
        for path in &paths {
            per_file.push(load_file(path, csv_delimiter).await?);
        }

        let send = |documents: Vec<Value>| {
            let method = method.clone();
            async move {
                match batch_size {
                    Some(size) => self.send_in_batches(method, &documents, size, primary_key).await,
                    None => Ok(BatchSummary::from_results(vec![
                        self.send_documents(method, &documents, primary_key).await,
                    ])),
                }
            }
        };

        if combine {
            return send(combine_documents(per_file)).await;
        }

        // The server can race on index creation when several additions for a
        // missing index arrive at once, so the first file goes alone.
        let mut files = per_file.into_iter();
        let mut summary = match files.next() {
            Some(first) => send(first).await?,
            None => BatchSummary::default(),
        };
        for rest in join_all(files.map(send)).await {
            summary.extend(rest?);
        }

        Ok(summary)
    }

    /// Load every `format` file of `dir` and add the documents.
    ///
    /// With `combine` all files are merged into one request, otherwise one
    /// request is sent per file.
    pub async fn add_documents_from_directory(
        &self,
        dir: impl AsRef<Path>,
        primary_key: Option<&str>,
        format: DocumentFormat,
        csv_delimiter: Option<&str>,
        combine: bool,
    ) -> Result<BatchSummary> {
        self.send_directory(Method::POST, dir.as_ref(), None, primary_key, format, csv_delimiter, combine)
            .await
    }

    pub async fn update_documents_from_directory(
        &self,
        dir: impl AsRef<Path>,
        primary_key: Option<&str>,
        format: DocumentFormat,
        csv_delimiter: Option<&str>,
        combine: bool,
    ) -> Result<BatchSummary> {
        self.send_directory(Method::PUT, dir.as_ref(), None, primary_key, format, csv_delimiter, combine)
            .await
    }

    pub async fn add_documents_from_directory_in_batches(
        &self,
        dir: impl AsRef<Path>,
        batch_size: usize,
        primary_key: Option<&str>,
        format: DocumentFormat,
        csv_delimiter: Option<&str>,
        combine: bool,
    ) -> Result<BatchSummary> {
        self.send_directory(
            Method::POST,
            dir.as_ref(),
            Some(batch_size),
            primary_key,
            format,
            csv_delimiter,
            combine,
        )
        .await
    }

    pub async fn update_documents_from_directory_in_batches(
        &self,
        dir: impl AsRef<Path>,
        batch_size: usize,
        primary_key: Option<&str>,
        format: DocumentFormat,
        csv_delimiter: Option<&str>,
        combine: bool,
    ) -> Result<BatchSummary> {
        self.send_directory(
            Method::PUT,
            dir.as_ref(),
            Some(batch_size),
            primary_key,
            format,
            csv_delimiter,
            combine,
        )
        .await
    }

    async fn send_raw_file(
        &self,
        method: Method,
        path: &Path,
        primary_key: Option<&str>,
        csv_delimiter: Option<&str>,
    ) -> Result<TaskInfo> {
        let path = path.to_path_buf();
        let primary_key_owned = primary_key.map(str::to_string);
        let csv_delimiter = csv_delimiter.map(str::to_string);
        let upload = run_blocking(move || {
            loader::prepare_raw_upload(&path, primary_key_owned.as_deref(), csv_delimiter.as_deref())
        })
        .await?;

        debug!(index = %self.uid, content_type = upload.content_type, bytes = upload.body.len(), "Sending raw file");
        self.transport
            .request_raw(method, &self.path("documents"), &upload.query, upload.content_type, upload.body)
            .await
    }

    /// Send a CSV or NDJSON file without parsing it locally
    pub async fn add_documents_from_raw_file(
        &self,
        path: impl AsRef<Path>,
        primary_key: Option<&str>,
        csv_delimiter: Option<&str>,
    ) -> Result<TaskInfo> {
        self.send_raw_file(Method::POST, path.as_ref(), primary_key, csv_delimiter)
            .await
    }

    pub async fn update_documents_from_raw_file(
        &self,
        path: impl AsRef<Path>,
        primary_key: Option<&str>,
        csv_delimiter: Option<&str>,
    ) -> Result<TaskInfo> {
        self.send_raw_file(Method::PUT, path.as_ref(), primary_key, csv_delimiter)
            .await
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<TaskInfo> {
        self.transport
            .delete(&self.path(&format!("documents/{}", encode(document_id))), &[])
            .await
    }

    pub async fn delete_documents(&self, ids: &[&str]) -> Result<TaskInfo> {
        self.transport
            .post(&self.path("documents/delete-batch"), &[], ids)
            .await
    }

    pub async fn delete_documents_by_filter(&self, filter: impl Into<Filter>) -> Result<TaskInfo> {
        let filter: Filter = filter.into();
        let body = json!({ "filter": filter });
        self.transport
            .post(&self.path("documents/delete"), &[], &body)
            .await
    }

    /// Send one delete-by-filter request per filter, concurrently
    pub async fn delete_documents_in_batches_by_filter(&self, filters: Vec<Filter>) -> Result<BatchSummary> {
        let requests = filters
            .into_iter()
            .map(|filter| self.delete_documents_by_filter(filter));
        Ok(BatchSummary::from_results(join_all(requests).await))
    }

    pub async fn delete_all_documents(&self) -> Result<TaskInfo> {
        self.transport.delete(&self.path("documents"), &[]).await
    }
}
