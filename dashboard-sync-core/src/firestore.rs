//! Firestore REST (v1) document store.
//!
//! `set` issues a `PATCH` without an update mask, which Firestore treats as
//! "create or fully replace". Documents travel as Firestore typed values; the
//! codec below maps them to and from plain JSON. A top-level `timestamp` field
//! holding an RFC 3339 instant is stored as a native `timestampValue`.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::config::{ProviderConfig, SyncSettings};
use crate::contract::DocumentStore;
use crate::error::StoreError;
use crate::http::bounded;

const TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Clone)]
pub struct FirestoreClient {
    http: Client,
    base_url: String,
    project_id: String,
    database: String,
    access_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        database: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        FirestoreClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            database: database.into(),
            access_token,
        }
    }

    /// `None` when no project id is configured.
    pub fn from_config(
        http: Client,
        config: &ProviderConfig,
        settings: &SyncSettings,
    ) -> Option<Self> {
        let project_id = config.get("gcp.project_id")?;
        Some(Self::new(
            http,
            settings.endpoints.firestore.clone(),
            project_id,
            settings.firestore_database.clone(),
            config.owned("gcp.access_token"),
        ))
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents/{}/{}",
            self.base_url, self.project_id, self.database, collection, id
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let path = format!("{collection}/{id}");
        let write_err = |message: String| StoreError::Write {
            path: path.clone(),
            message,
        };
        let fields = encode_document(&document)
            .ok_or_else(|| write_err("document must be a JSON object".to_string()))?;

        let request = bounded(
            self.http
                .patch(self.document_url(collection, id))
                .json(&json!({ "fields": fields })),
        );
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| write_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%path, status = %status, %body, "Firestore rejected document write");
            return Err(write_err(format!("status {status}")));
        }
        info!(%path, "Wrote Firestore document");
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let path = format!("{collection}/{id}");
        let read_err = |message: String| StoreError::Read {
            path: path.clone(),
            message,
        };
        let request = bounded(self.http.get(self.document_url(collection, id)));
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| read_err(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(%path, "Firestore document not found");
                Ok(None)
            }
            status if status.is_success() => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| read_err(e.to_string()))?;
                let fields = body.get("fields").cloned().unwrap_or_else(|| json!({}));
                Ok(Some(decode_fields(&fields)))
            }
            status => Err(read_err(format!("status {status}"))),
        }
    }
}

/// Plain JSON → Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Top-level document fields for a write. `None` unless `document` is an object.
pub fn encode_document(document: &Value) -> Option<Map<String, Value>> {
    let fields = document
        .as_object()?
        .iter()
        .map(|(key, value)| {
            let typed = match value {
                Value::String(s)
                    if key == TIMESTAMP_FIELD && DateTime::parse_from_rfc3339(s).is_ok() =>
                {
                    json!({ "timestampValue": s })
                }
                _ => encode_value(value),
            };
            (key.clone(), typed)
        })
        .collect();
    Some(fields)
}

/// Firestore typed value → plain JSON. Timestamps and references decode to strings.
pub fn decode_value(typed: &Value) -> Value {
    let Some((kind, inner)) = typed.as_object().and_then(|m| m.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "booleanValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "doubleValue" => inner.clone(),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => decode_fields(inner.get("fields").unwrap_or(&Value::Null)),
        _ => Value::Null,
    }
}

pub fn decode_fields(fields: &Value) -> Value {
    let map = fields
        .as_object()
        .map(|m| {
            m.iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect::<Map<_, _>>()
        })
        .unwrap_or_default();
    Value::Object(map)
}
