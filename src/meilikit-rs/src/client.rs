use std::sync::Arc;

use chrono::{DateTime, Utc};
use meilikit_core::search::MultiSearchResponse;
use meilikit_core::{
    generate_tenant_token, ClientStats, Config, Health, IndexInfo, IndexList, Key, SearchParams,
    SearchResultsWithUid, TaskInfo, Version,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use urlencoding::encode;

use crate::index::Index;
use crate::tasks::{wait_for_task, WaitOptions};
use crate::transport::HttpTransport;
use crate::Result;

/// Meilisearch REST API client
///
/// Cheap to clone: clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) wait: WaitOptions,
    batch_size: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIndexRequest<'a> {
    uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_key: Option<&'a str>,
}

#[derive(Serialize)]
struct MultiSearchRequest<'a> {
    queries: &'a [SearchParams],
}

impl Client {
    /// Create a new client connected to the given base URL
    pub fn new(url: impl Into<String>, api_key: Option<&str>) -> Result<Self> {
        Self::from_config(&Config::new(url, api_key.map(str::to_string)))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        info!(url = %transport.base_url(), "Meilisearch client created");

        Ok(Self {
            transport: Arc::new(transport),
            wait: WaitOptions::from(&config.tasks),
            batch_size: config.batch_size,
        })
    }

    /// Default batch size from the configuration
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn wait_options(&self) -> WaitOptions {
        self.wait
    }

    /// Reference an index by uid; no request is made
    pub fn index(&self, uid: impl Into<String>) -> Index {
        Index::new(self.transport.clone(), self.wait, uid)
    }

    /// Create an index, wait for the creation task and return the new index
    pub async fn create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<Index> {
        let task: TaskInfo = self
            .transport
            .post("indexes", &[], &CreateIndexRequest { uid, primary_key })
            .await?;
        wait_for_task(self.transport.as_ref(), task.task_uid, &self.wait.composite()).await?;
        self.get_index(uid).await
    }

    pub async fn get_index(&self, uid: &str) -> Result<Index> {
        let info: IndexInfo = self.transport.get(&format!("indexes/{}", encode(uid)), &[]).await?;
        Ok(Index::from_info(self.transport.clone(), self.wait, info))
    }

    /// Fetch the raw description of an index; `None` when it does not exist
    pub async fn get_raw_index(&self, uid: &str) -> Result<Option<IndexInfo>> {
        match self.transport.get(&format!("indexes/{}", encode(uid)), &[]).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.status() == Some(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn get_indexes(&self, offset: Option<usize>, limit: Option<usize>) -> Result<Vec<Index>> {
        Ok(self
            .get_raw_indexes(offset, limit)
            .await?
            .into_iter()
            .map(|info| Index::from_info(self.transport.clone(), self.wait, info))
            .collect())
    }

    pub async fn get_raw_indexes(
        &self,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<IndexInfo>> {
        let mut query = Vec::new();
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let list: IndexList = self.transport.get("indexes", &query).await?;
        Ok(list.results)
    }

    /// Return the index, creating it when the server reports `index_not_found`
    pub async fn get_or_create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<Index> {
        match self.get_index(uid).await {
            Ok(index) => Ok(index),
            Err(e) if e.is_index_not_found() => self.create_index(uid, primary_key).await,
            Err(e) => Err(e),
        }
    }

    pub async fn delete_index_if_exists(&self, uid: &str) -> Result<bool> {
        self.index(uid).delete_if_exists().await
    }

    /// Swap the documents, settings and task history of pairs of indexes
    pub async fn swap_indexes(&self, pairs: &[(&str, &str)]) -> Result<TaskInfo> {
        let body: Vec<Value> = pairs
            .iter()
            .map(|(a, b)| json!({ "indexes": [a, b] }))
            .collect();
        self.transport.post("swap-indexes", &[], &body).await
    }

    /// Run several searches, possibly on different indexes, in one request.
    ///
    /// Each query must name its index with [`SearchParams::with_index_uid`].
    pub async fn multi_search(&self, queries: &[SearchParams]) -> Result<Vec<SearchResultsWithUid>> {
        let response: MultiSearchResponse = self
            .transport
            .post("multi-search", &[], &MultiSearchRequest { queries })
            .await?;
        Ok(response.results)
    }

    pub async fn health(&self) -> Result<Health> {
        self.transport.get("health", &[]).await
    }

    /// True when the server answers the health check
    pub async fn is_healthy(&self) -> bool {
        matches!(self.health().await, Ok(health) if health.status == "available")
    }

    pub async fn get_version(&self) -> Result<Version> {
        self.transport.get("version", &[]).await
    }

    pub async fn get_all_stats(&self) -> Result<ClientStats> {
        self.transport.get("stats", &[]).await
    }

    pub async fn create_dump(&self) -> Result<TaskInfo> {
        self.transport
            .request::<(), _>(reqwest::Method::POST, "dumps", &[], None)
            .await
    }

    /// Sign a tenant token with `api_key`; see [`generate_tenant_token`]
    pub fn generate_tenant_token(
        &self,
        search_rules: &Value,
        api_key: &Key,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<String> {
        Ok(generate_tenant_token(search_rules, api_key, expires_at)?)
    }
}
