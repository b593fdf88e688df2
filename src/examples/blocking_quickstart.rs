//! Blocking Client Example
//!
//! The same flow as `quickstart`, without an async runtime in user code.
//!
//! Run with: cargo run --example blocking_quickstart

use meilikit_rs::blocking::BlockingClient;
use meilikit_rs::SearchParams;
use serde_json::json;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("meilikit_rs=info")),
        )
        .init();

    let url = std::env::var("MEILI_URL").unwrap_or_else(|_| "http://localhost:7700".to_string());
    let api_key = std::env::var("MEILI_MASTER_KEY").ok();
    let client = BlockingClient::new(url, api_key.as_deref())?;

    if !client.is_healthy() {
        anyhow::bail!("Meilisearch is not available");
    }

    let uid = format!("books_{}", uuid::Uuid::new_v4().simple());
    let index = client.get_or_create_index(&uid, Some("id"))?;

    let books = vec![
        json!({ "id": 1, "title": "Pride and Prejudice", "author": "Jane Austen" }),
        json!({ "id": 2, "title": "Le Petit Prince", "author": "Antoine de Saint-Exupéry" }),
        json!({ "id": 3, "title": "Alice In Wonderland", "author": "Lewis Carroll" }),
    ];
    let info = index.add_documents(&books, None)?;
    client.wait_for_task(info.task_uid)?;

    let results = index.search(&SearchParams::query("prince").with_limit(5))?;
    println!("Found {} hit(s):", results.hits.len());
    for hit in &results.hits {
        println!("   {}", hit["title"]);
    }

    let document = index.get_document("3")?;
    println!("\nDocument 3: {}", document);

    index.delete_if_exists()?;
    Ok(())
}
