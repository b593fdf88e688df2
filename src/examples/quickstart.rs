//! Quickstart Example
//!
//! Creates an index, adds a few documents, waits for indexing and searches.
//! Expects a Meilisearch server on MEILI_URL (default http://localhost:7700).
//!
//! Run with: cargo run --example quickstart

use meilikit_rs::{Client, SearchParams, Settings, TaskStatus};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize, Deserialize)]
struct Movie {
    id: u32,
    title: String,
    genres: Vec<String>,
}

fn movie(id: u32, title: &str, genres: &[&str]) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meilikit_rs=debug")),
        )
        .init();

    let url = std::env::var("MEILI_URL").unwrap_or_else(|_| "http://localhost:7700".to_string());
    let api_key = std::env::var("MEILI_MASTER_KEY").ok();
    let client = Client::new(url, api_key.as_deref())?;

    let version = client.get_version().await?;
    println!("Connected to Meilisearch {}\n", version.pkg_version);

    let uid = format!("movies_{}", uuid::Uuid::new_v4().simple());
    let index = client.create_index(&uid, Some("id")).await?;
    println!("Created index {}", index.uid);

    let task = index
        .update_settings(&Settings::new().with_filterable_attributes(["genres"]))
        .await?;
    client.wait_for_task(task.task_uid).await?;

    let movies = vec![
        movie(1, "Carol", &["Romance", "Drama"]),
        movie(2, "Wonder Woman", &["Action", "Adventure"]),
        movie(3, "Life of Pi", &["Adventure", "Drama"]),
        movie(4, "Mad Max: Fury Road", &["Adventure", "Science Fiction"]),
    ];
    let info = index.add_documents(&movies, None).await?;
    let task = client.wait_for_task(info.task_uid).await?;
    println!("Indexed {} documents: {}\n", movies.len(), task.status);
    if task.status != TaskStatus::Succeeded {
        anyhow::bail!("indexing failed: {:?}", task.error);
    }

    let results = index
        .search(&SearchParams::query("adventure").with_filter("genres = Drama"))
        .await?;
    println!("Search results for 'adventure' in Drama:");
    for hit in &results.hits {
        let movie: Movie = serde_json::from_value(hit.clone())?;
        println!("   {} - {} {:?}", movie.id, movie.title, movie.genres);
    }

    let deleted = index.delete_if_exists().await?;
    println!("\nCleaned up index: {}", deleted);

    Ok(())
}
