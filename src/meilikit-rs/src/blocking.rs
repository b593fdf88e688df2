//! Blocking facade over the async client.
//!
//! [`BlockingClient`] owns a current-thread tokio runtime and drives the
//! async implementation with `block_on`, so both surfaces share behaviour
//! and errors. Do not call it from inside an async runtime: `block_on`
//! panics when nested.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

use meilikit_core::{
    ClientStats, Config, DocumentFormat, DocumentsInfo, FacetSearchResults, Faceting, Filter,
    Health, IndexInfo, IndexStats, Key, KeyCreate, KeySearch, KeyUpdate, Pagination, SearchParams,
    SearchResults, SearchResultsWithUid, Settings, Task, TaskFilter, TaskInfo, TaskList,
    TypoTolerance, Version,
};

use crate::{BatchSummary, Client, DocumentsQuery, Index, Result, WaitOptions};

/// Forward `&self` methods to the async value, blocking on the runtime
macro_rules! forward {
    ($( $(#[$meta:meta])* fn $name:ident(&self $(, $arg:ident: $ty:ty)*) -> $ret:ty; )*) => {
        $(
            $(#[$meta])*
            pub fn $name(&self $(, $arg: $ty)*) -> Result<$ret> {
                self.runtime.block_on(self.inner.$name($($arg),*))
            }
        )*
    };
}

#[derive(Debug, Clone)]
pub struct BlockingClient {
    inner: Client,
    runtime: Arc<Runtime>,
}

fn runtime() -> Result<Arc<Runtime>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(Arc::new(runtime))
}

impl BlockingClient {
    pub fn new(url: impl Into<String>, api_key: Option<&str>) -> Result<Self> {
        Self::from_config(&Config::new(url, api_key.map(str::to_string)))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            inner: Client::from_config(config)?,
            runtime: runtime()?,
        })
    }

    /// The async client this facade drives
    pub fn as_async(&self) -> &Client {
        &self.inner
    }

    pub fn batch_size(&self) -> usize {
        self.inner.batch_size()
    }

    pub fn index(&self, uid: impl Into<String>) -> BlockingIndex {
        self.wrap(self.inner.index(uid))
    }

    fn wrap(&self, index: Index) -> BlockingIndex {
        BlockingIndex {
            inner: index,
            runtime: self.runtime.clone(),
        }
    }

    pub fn create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<BlockingIndex> {
        let index = self.runtime.block_on(self.inner.create_index(uid, primary_key))?;
        Ok(self.wrap(index))
    }

    pub fn get_index(&self, uid: &str) -> Result<BlockingIndex> {
        let index = self.runtime.block_on(self.inner.get_index(uid))?;
        Ok(self.wrap(index))
    }

    pub fn get_or_create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<BlockingIndex> {
        let index = self
            .runtime
            .block_on(self.inner.get_or_create_index(uid, primary_key))?;
        Ok(self.wrap(index))
    }

    pub fn get_indexes(&self, offset: Option<usize>, limit: Option<usize>) -> Result<Vec<BlockingIndex>> {
        let indexes = self.runtime.block_on(self.inner.get_indexes(offset, limit))?;
        Ok(indexes.into_iter().map(|index| self.wrap(index)).collect())
    }

    pub fn is_healthy(&self) -> bool {
        self.runtime.block_on(self.inner.is_healthy())
    }

    pub fn generate_tenant_token(
        &self,
        search_rules: &Value,
        api_key: &Key,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<String> {
        self.inner.generate_tenant_token(search_rules, api_key, expires_at)
    }

    forward! {
        fn get_raw_index(&self, uid: &str) -> Option<IndexInfo>;
        fn get_raw_indexes(&self, offset: Option<usize>, limit: Option<usize>) -> Vec<IndexInfo>;
        fn delete_index_if_exists(&self, uid: &str) -> bool;
        fn swap_indexes(&self, pairs: &[(&str, &str)]) -> TaskInfo;
        fn multi_search(&self, queries: &[SearchParams]) -> Vec<SearchResultsWithUid>;
        fn health(&self) -> Health;
        fn get_version(&self) -> Version;
        fn get_all_stats(&self) -> ClientStats;
        fn create_dump(&self) -> TaskInfo;
        fn create_key(&self, key: &KeyCreate) -> Key;
        fn get_keys(&self, offset: Option<usize>, limit: Option<usize>) -> KeySearch;
        fn get_key(&self, key: &str) -> Key;
        fn update_key(&self, update: &KeyUpdate) -> Key;
        fn delete_key(&self, key: &str) -> u16;
        fn get_task(&self, task_uid: u64) -> Task;
        fn get_tasks(&self, index_uids: &[&str], types: &[&str]) -> TaskList;
        fn wait_for_task(&self, task_uid: u64) -> Task;
        fn wait_for_task_with(&self, task_uid: u64, options: &WaitOptions) -> Task;
        fn cancel_tasks(&self, filter: &TaskFilter) -> TaskInfo;
        fn delete_tasks(&self, filter: &TaskFilter) -> TaskInfo;
    }
}

/// Blocking counterpart of [`Index`]
#[derive(Debug, Clone)]
pub struct BlockingIndex {
    inner: Index,
    runtime: Arc<Runtime>,
}

impl BlockingIndex {
    pub fn uid(&self) -> &str {
        &self.inner.uid
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.inner.primary_key.as_deref()
    }

    pub fn as_async(&self) -> &Index {
        &self.inner
    }

    pub fn update(&mut self, primary_key: &str) -> Result<IndexInfo> {
        self.runtime.block_on(self.inner.update(primary_key))
    }

    pub fn fetch_info(&mut self) -> Result<IndexInfo> {
        self.runtime.block_on(self.inner.fetch_info())
    }

    pub fn get_primary_key(&mut self) -> Result<Option<String>> {
        self.runtime.block_on(self.inner.get_primary_key())
    }

    pub fn add_documents<T: Serialize + Sync>(&self, documents: &[T], primary_key: Option<&str>) -> Result<TaskInfo> {
        self.runtime.block_on(self.inner.add_documents(documents, primary_key))
    }

    pub fn update_documents<T: Serialize + Sync>(&self, documents: &[T], primary_key: Option<&str>) -> Result<TaskInfo> {
        self.runtime.block_on(self.inner.update_documents(documents, primary_key))
    }

    pub fn add_documents_in_batches<T: Serialize + Sync>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<BatchSummary> {
        self.runtime
            .block_on(self.inner.add_documents_in_batches(documents, batch_size, primary_key))
    }

    pub fn update_documents_in_batches<T: Serialize + Sync>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<BatchSummary> {
        self.runtime
            .block_on(self.inner.update_documents_in_batches(documents, batch_size, primary_key))
    }

    pub fn delete_documents_by_filter(&self, filter: impl Into<Filter>) -> Result<TaskInfo> {
        self.runtime.block_on(self.inner.delete_documents_by_filter(filter))
    }

    forward! {
        fn delete(&self) -> TaskInfo;
        fn delete_if_exists(&self) -> bool;
        fn get_stats(&self) -> IndexStats;
        fn search(&self, params: &SearchParams) -> SearchResults;
        fn facet_search(&self, facet_name: &str, facet_query: &str, params: SearchParams) -> FacetSearchResults;

        fn get_document(&self, document_id: &str) -> Value;
        fn get_documents(&self, query: &DocumentsQuery) -> DocumentsInfo;
        fn add_documents_from_file(&self, path: &Path, primary_key: Option<&str>) -> TaskInfo;
        fn update_documents_from_file(&self, path: &Path, primary_key: Option<&str>) -> TaskInfo;
        fn add_documents_from_file_in_batches(&self, path: &Path, batch_size: usize, primary_key: Option<&str>, csv_delimiter: Option<&str>) -> BatchSummary;
        fn update_documents_from_file_in_batches(&self, path: &Path, batch_size: usize, primary_key: Option<&str>, csv_delimiter: Option<&str>) -> BatchSummary;
        fn add_documents_from_directory(&self, dir: &Path, primary_key: Option<&str>, format: DocumentFormat, csv_delimiter: Option<&str>, combine: bool) -> BatchSummary;
        fn update_documents_from_directory(&self, dir: &Path, primary_key: Option<&str>, format: DocumentFormat, csv_delimiter: Option<&str>, combine: bool) -> BatchSummary;
        fn add_documents_from_directory_in_batches(&self, dir: &Path, batch_size: usize, primary_key: Option<&str>, format: DocumentFormat, csv_delimiter: Option<&str>, combine: bool) -> BatchSummary;
        fn update_documents_from_directory_in_batches(&self, dir: &Path, batch_size: usize, primary_key: Option<&str>, format: DocumentFormat, csv_delimiter: Option<&str>, combine: bool) -> BatchSummary;
        fn add_documents_from_raw_file(&self, path: &Path, primary_key: Option<&str>, csv_delimiter: Option<&str>) -> TaskInfo;
        fn update_documents_from_raw_file(&self, path: &Path, primary_key: Option<&str>, csv_delimiter: Option<&str>) -> TaskInfo;
        fn delete_document(&self, document_id: &str) -> TaskInfo;
        fn delete_documents(&self, ids: &[&str]) -> TaskInfo;
        fn delete_documents_in_batches_by_filter(&self, filters: Vec<Filter>) -> BatchSummary;
        fn delete_all_documents(&self) -> TaskInfo;

        fn get_settings(&self) -> Settings;
        fn update_settings(&self, settings: &Settings) -> TaskInfo;
        fn reset_settings(&self) -> TaskInfo;
        fn get_ranking_rules(&self) -> Vec<String>;
        fn update_ranking_rules(&self, rules: &[&str]) -> TaskInfo;
        fn reset_ranking_rules(&self) -> TaskInfo;
        fn get_distinct_attribute(&self) -> Option<String>;
        fn update_distinct_attribute(&self, attribute: &str) -> TaskInfo;
        fn reset_distinct_attribute(&self) -> TaskInfo;
        fn get_searchable_attributes(&self) -> Vec<String>;
        fn update_searchable_attributes(&self, attributes: &[&str]) -> TaskInfo;
        fn reset_searchable_attributes(&self) -> TaskInfo;
        fn get_displayed_attributes(&self) -> Vec<String>;
        fn update_displayed_attributes(&self, attributes: &[&str]) -> TaskInfo;
        fn reset_displayed_attributes(&self) -> TaskInfo;
        fn get_stop_words(&self) -> Option<Vec<String>>;
        fn update_stop_words(&self, words: &[&str]) -> TaskInfo;
        fn reset_stop_words(&self) -> TaskInfo;
        fn get_synonyms(&self) -> Option<HashMap<String, Vec<String>>>;
        fn update_synonyms(&self, synonyms: &HashMap<String, Vec<String>>) -> TaskInfo;
        fn reset_synonyms(&self) -> TaskInfo;
        fn get_filterable_attributes(&self) -> Option<Vec<String>>;
        fn update_filterable_attributes(&self, attributes: &[&str]) -> TaskInfo;
        fn reset_filterable_attributes(&self) -> TaskInfo;
        fn get_sortable_attributes(&self) -> Vec<String>;
        fn update_sortable_attributes(&self, attributes: &[&str]) -> TaskInfo;
        fn reset_sortable_attributes(&self) -> TaskInfo;
        fn get_typo_tolerance(&self) -> TypoTolerance;
        fn update_typo_tolerance(&self, typo_tolerance: &TypoTolerance) -> TaskInfo;
        fn reset_typo_tolerance(&self) -> TaskInfo;
        fn get_faceting(&self) -> Faceting;
        fn update_faceting(&self, faceting: &Faceting) -> TaskInfo;
        fn reset_faceting(&self) -> TaskInfo;
        fn get_pagination(&self) -> Pagination;
        fn update_pagination(&self, pagination: &Pagination) -> TaskInfo;
        fn reset_pagination(&self) -> TaskInfo;
        fn get_separator_tokens(&self) -> Vec<String>;
        fn update_separator_tokens(&self, tokens: &[&str]) -> TaskInfo;
        fn reset_separator_tokens(&self) -> TaskInfo;
        fn get_non_separator_tokens(&self) -> Vec<String>;
        fn update_non_separator_tokens(&self, tokens: &[&str]) -> TaskInfo;
        fn reset_non_separator_tokens(&self) -> TaskInfo;
        fn get_dictionary(&self) -> Vec<String>;
        fn update_dictionary(&self, words: &[&str]) -> TaskInfo;
        fn reset_dictionary(&self) -> TaskInfo;
    }
}
