use meilikit_core::{Key, KeyCreate, KeySearch, KeyUpdate};
use reqwest::Method;
use urlencoding::encode;

use crate::client::Client;
use crate::Result;

impl Client {
    pub async fn create_key(&self, key: &KeyCreate) -> Result<Key> {
        self.transport.post("keys", &[], key).await
    }

    pub async fn get_keys(&self, offset: Option<usize>, limit: Option<usize>) -> Result<KeySearch> {
        let mut query = Vec::new();
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.transport.get("keys", &query).await
    }

    /// Fetch a key by its secret or its uid
    pub async fn get_key(&self, key: &str) -> Result<Key> {
        self.transport.get(&format!("keys/{}", encode(key)), &[]).await
    }

    pub async fn update_key(&self, update: &KeyUpdate) -> Result<Key> {
        self.transport
            .patch(&format!("keys/{}", encode(&update.key)), update)
            .await
    }

    /// Delete a key; returns the HTTP status, 204 on success
    pub async fn delete_key(&self, key: &str) -> Result<u16> {
        self.transport
            .request_status(Method::DELETE, &format!("keys/{}", encode(key)))
            .await
    }
}
