use std::sync::Arc;

use chrono::{DateTime, Utc};
use meilikit_core::search::facet_search_params;
use meilikit_core::{
    FacetSearchResults, IndexInfo, IndexStats, SearchParams, SearchResults, TaskInfo, TaskStatus,
};
use serde_json::json;
use tracing::debug;
use urlencoding::encode;

use crate::tasks::{wait_for_task, WaitOptions};
use crate::transport::HttpTransport;
use crate::Result;

/// Index is a handle on one index of the server.
///
/// Creating a handle with [`crate::Client::index`] makes no network call, so
/// `primary_key` and the timestamps are only known after [`Index::fetch_info`].
#[derive(Debug, Clone)]
pub struct Index {
    pub uid: String,
    pub primary_key: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) wait: WaitOptions,
}

impl Index {
    pub(crate) fn new(transport: Arc<HttpTransport>, wait: WaitOptions, uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            primary_key: None,
            created_at: None,
            updated_at: None,
            transport,
            wait,
        }
    }

    pub(crate) fn from_info(transport: Arc<HttpTransport>, wait: WaitOptions, info: IndexInfo) -> Self {
        Self {
            uid: info.uid,
            primary_key: info.primary_key,
            created_at: Some(info.created_at),
            updated_at: Some(info.updated_at),
            transport,
            wait,
        }
    }

    /// Path of a sub-resource of this index, e.g. `path("search")`
    pub(crate) fn path(&self, resource: &str) -> String {
        if resource.is_empty() {
            format!("indexes/{}", encode(&self.uid))
        } else {
            format!("indexes/{}/{}", encode(&self.uid), resource)
        }
    }

    pub(crate) async fn wait_composite(&self, task: &TaskInfo) -> Result<TaskStatus> {
        let task = wait_for_task(self.transport.as_ref(), task.task_uid, &self.wait.composite()).await?;
        Ok(task.status)
    }

    pub async fn delete(&self) -> Result<TaskInfo> {
        self.transport.delete(&self.path(""), &[]).await
    }

    /// Delete the index and wait; `true` when the deletion task succeeded
    pub async fn delete_if_exists(&self) -> Result<bool> {
        let task = self.delete().await?;
        let status = self.wait_composite(&task).await?;
        debug!(index = %self.uid, %status, "Index deletion finished");
        Ok(status == TaskStatus::Succeeded)
    }

    /// Change the primary key, wait for the update and refresh this handle
    pub async fn update(&mut self, primary_key: &str) -> Result<IndexInfo> {
        let task: TaskInfo = self
            .transport
            .patch(&self.path(""), &json!({ "primaryKey": primary_key }))
            .await?;
        self.wait_composite(&task).await?;
        self.fetch_info().await
    }

    /// Reload the index description from the server into this handle
    pub async fn fetch_info(&mut self) -> Result<IndexInfo> {
        let info: IndexInfo = self.transport.get(&self.path(""), &[]).await?;
        self.primary_key = info.primary_key.clone();
        self.created_at = Some(info.created_at);
        self.updated_at = Some(info.updated_at);
        Ok(info)
    }

    pub async fn get_primary_key(&mut self) -> Result<Option<String>> {
        Ok(self.fetch_info().await?.primary_key)
    }

    pub async fn get_stats(&self) -> Result<IndexStats> {
        self.transport.get(&self.path("stats"), &[]).await
    }

    pub async fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        self.transport.post(&self.path("search"), &[], params).await
    }

    /// Search the values of one facet, narrowed by the regular search options
    pub async fn facet_search(
        &self,
        facet_name: &str,
        facet_query: &str,
        params: SearchParams,
    ) -> Result<FacetSearchResults> {
        let body = facet_search_params(facet_name, facet_query, params);
        self.transport.post(&self.path("facet-search"), &[], &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meilikit_core::Config;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index(server: &MockServer, uid: &str) -> Index {
        let transport = HttpTransport::new(&Config::new(server.uri(), None)).unwrap();
        Index::new(Arc::new(transport), WaitOptions::default(), uid)
    }

    fn task_info(uid: u64, task_type: &str) -> serde_json::Value {
        json!({
            "taskUid": uid,
            "indexUid": "movies",
            "status": "enqueued",
            "type": task_type,
            "enqueuedAt": "2023-06-09T01:03:48.311936656Z"
        })
    }

    fn task(uid: u64, status: &str, task_type: &str) -> serde_json::Value {
        json!({
            "uid": uid,
            "indexUid": "movies",
            "status": status,
            "type": task_type,
            "enqueuedAt": "2023-06-09T01:03:48.311936656Z"
        })
    }

    #[tokio::test]
    async fn test_update_waits_then_refreshes() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/indexes/movies"))
            .and(body_json(json!({ "primaryKey": "movie_id" })))
            .respond_with(ResponseTemplate::new(202).set_body_json(task_info(3, "indexUpdate")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task(3, "succeeded", "indexUpdate")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/movies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uid": "movies",
                "primaryKey": "movie_id",
                "createdAt": "2023-06-09T01:03:48Z",
                "updatedAt": "2023-06-09T01:04:00Z"
            })))
            .mount(&server)
            .await;

        let mut index = index(&server, "movies");
        let info = index.update("movie_id").await.unwrap();

        assert_eq!(info.primary_key.as_deref(), Some("movie_id"));
        assert_eq!(index.primary_key.as_deref(), Some("movie_id"));
        assert!(index.created_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_if_exists_reports_task_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/indexes/movies"))
            .respond_with(ResponseTemplate::new(202).set_body_json(task_info(5, "indexDeletion")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task(5, "failed", "indexDeletion")))
            .mount(&server)
            .await;

        assert!(!index(&server, "movies").delete_if_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_search_posts_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/search"))
            .and(body_partial_json(json!({ "q": "carol", "limit": 20, "filter": "genre = drama" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": [{ "id": 1, "title": "Carol" }],
                "offset": 0,
                "limit": 20,
                "estimatedTotalHits": 1,
                "processingTimeMs": 2,
                "query": "carol"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = index(&server, "movies")
            .search(&SearchParams::query("carol").with_filter("genre = drama"))
            .await
            .unwrap();

        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0]["title"], json!("Carol"));
        assert_eq!(results.estimated_total_hits, Some(1));
    }

    #[tokio::test]
    async fn test_facet_search() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/books/facet-search"))
            .and(body_partial_json(json!({ "facetName": "genres", "facetQuery": "fic" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "facetHits": [{ "value": "fiction", "count": 7 }],
                "facetQuery": "fic",
                "processingTimeMs": 0
            })))
            .mount(&server)
            .await;

        let results = index(&server, "books")
            .facet_search("genres", "fic", SearchParams::new())
            .await
            .unwrap();

        assert_eq!(results.facet_hits[0].value, "fiction");
        assert_eq!(results.facet_hits[0].count, 7);
    }

    #[tokio::test]
    async fn test_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/movies/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "numberOfDocuments": 19654,
                "isIndexing": false,
                "fieldDistribution": { "title": 19654 }
            })))
            .mount(&server)
            .await;

        let stats = index(&server, "movies").get_stats().await.unwrap();
        assert_eq!(stats.number_of_documents, 19654);
        assert_eq!(stats.field_distribution.get("title"), Some(&19654));
    }
}
