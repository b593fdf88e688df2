//! Meilikit Core Library
//!
//! Types and local logic shared by the Meilikit clients, including:
//! - Wire models for indexes, documents, keys, tasks and settings
//! - Search parameters and results
//! - Client configuration
//! - Document file loading and batching
//! - Tenant token signing

pub mod batching;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod search;
pub mod settings;
pub mod task;
pub mod tenant_token;

// Re-export commonly used types
pub use config::{Config, TaskWaitConfig};
pub use error::ValidationError;
pub use loader::DocumentFormat;
pub use models::*;
pub use search::{
    FacetHit, FacetSearchResults, Filter, MatchingStrategy, SearchParams, SearchResults,
    SearchResultsWithUid,
};
pub use settings::{FacetOrder, Faceting, MinWordSizeForTypos, Pagination, Settings, TypoTolerance};
pub use task::{Task, TaskFilter, TaskInfo, TaskList, TaskStatus};
pub use tenant_token::generate_tenant_token;
