//! Tenant tokens: search credentials signed locally with an API key.
//!
//! A tenant token is an HS256 JWT whose claims carry search rules and the
//! uid of the signing key. The server re-verifies the signature with the
//! key's secret, so a token can never grant more than its parent key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;

use crate::error::ValidationError;
use crate::models::Key;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Claims<'a> {
    search_rules: &'a Value,
    api_key_uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Generate a tenant token scoped by `search_rules`.
///
/// `search_rules` is embedded unchanged; it is usually `["*"]` or an object
/// keyed by index. When it is an object with an `indexes` list, every listed
/// index must be reachable by `api_key`. `expires_at` must be in the future.
pub fn generate_tenant_token(
    search_rules: &Value,
    api_key: &Key,
    expires_at: Option<DateTime<Utc>>,
) -> Result<String, ValidationError> {
    if let Some(indexes) = search_rules.get("indexes").and_then(Value::as_array) {
        if !api_key.allows_all_indexes() {
            for index in indexes {
                let name = index.as_str().map(str::to_string).unwrap_or_else(|| index.to_string());
                if !api_key.indexes.contains(&name) {
                    return Err(ValidationError::InvalidRestriction(name));
                }
            }
        }
    }

    let exp = match expires_at {
        Some(at) if at <= Utc::now() => return Err(ValidationError::InvalidExpiry),
        Some(at) => Some(at.timestamp()),
        None => None,
    };

    let header = serde_json::to_vec(&Header {
        alg: "HS256",
        typ: "JWT",
    })?;
    let claims = serde_json::to_vec(&Claims {
        search_rules,
        api_key_uid: &api_key.uid,
        exp,
    })?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(claims)
    );

    let mut mac = HmacSha256::new_from_slice(api_key.key.as_bytes())
        .map_err(|_| ValidationError::InvalidSigningKey)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}
