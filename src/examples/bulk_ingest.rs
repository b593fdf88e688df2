//! Bulk Ingest Example
//!
//! Loads every NDJSON file of a directory and sends the documents in batches,
//! then cleans up finished tasks. Configuration is read from a JSON file.
//!
//! Run with: cargo run --example bulk_ingest -- config.json ./data

use std::path::PathBuf;

use meilikit_rs::{Client, Config, DocumentFormat, TaskFilter, TaskStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("meilikit_rs=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let dir = PathBuf::from(args.next().unwrap_or_else(|| "./data".to_string()));

    let client = Client::from_config(&config)?;
    let index = client.get_or_create_index("products", Some("id")).await?;

    let summary = index
        .add_documents_from_directory_in_batches(
            &dir,
            client.batch_size(),
            None,
            DocumentFormat::Ndjson,
            None,
            false,
        )
        .await?;
    println!(
        "📦 Sent {} batch(es): {} accepted, {} rejected",
        summary.total, summary.succeeded, summary.failed
    );

    for result in &summary.results {
        match result {
            Ok(info) => {
                let task = client.wait_for_task(info.task_uid).await?;
                println!("   task {} -> {}", task.uid, task.status);
            }
            Err(e) => println!("   rejected: {}", e),
        }
    }

    let stats = index.get_stats().await?;
    println!("\n📊 {} now holds {} documents", index.uid, stats.number_of_documents);

    let cleanup = client
        .delete_tasks(&TaskFilter::new().with_statuses([TaskStatus::Succeeded]).with_index_uids(["products"]))
        .await?;
    println!("🧹 Task cleanup enqueued as task {}", cleanup.task_uid);

    Ok(())
}
