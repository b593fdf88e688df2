//! Tenant Token Example
//!
//! Creates a search-only API key restricted to one index, then signs a tenant
//! token that further restricts searches with a filter. Token signing is done
//! locally and needs no round-trip.
//!
//! Run with: cargo run --example tenant_token

use chrono::{Duration, Utc};
use meilikit_rs::{Client, KeyCreate};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("meilikit_rs=debug")),
        )
        .init();

    let url = std::env::var("MEILI_URL").unwrap_or_else(|_| "http://localhost:7700".to_string());
    let master_key = std::env::var("MEILI_MASTER_KEY").unwrap_or_else(|_| "masterKey".to_string());
    let client = Client::new(url, Some(master_key.as_str()))?;

    let key = client
        .create_key(
            &KeyCreate::new(vec!["search".into()], vec!["medical_records".into()])
                .with_description("Search patient records")
                .with_expires_at(Utc::now() + Duration::days(30)),
        )
        .await?;
    println!("Created key {} for indexes {:?}", key.uid, key.indexes);

    let search_rules = json!({
        "medical_records": { "filter": "user_id = 1" }
    });
    let token = client.generate_tenant_token(&search_rules, &key, Some(Utc::now() + Duration::hours(1)))?;
    println!("Tenant token:\n{}\n", token);

    // A rule naming an index outside the key is refused locally
    let too_wide = json!({ "indexes": ["medical_records", "billing"] });
    match client.generate_tenant_token(&too_wide, &key, None) {
        Ok(_) => println!("Unexpected: token was signed"),
        Err(e) => println!("Refused as expected: {}", e),
    }

    let status = client.delete_key(&key.key).await?;
    println!("Deleted key (HTTP {})", status);

    Ok(())
}
