//! Firestore REST v1 client. Documents live at
//! `projects/{project}/databases/(default)/documents/{collection}/{key}`;
//! a PATCH without an update mask replaces the whole document (creating it
//! if absent), which is exactly the upsert semantics the pipeline needs.
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value as JsonValue};

use super::gauth::TokenProvider;
use super::truncate_for_log;
use crate::document::{Document, Value};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct FirestoreClient {
    base_url: String,
    project_id: String,
    http: Client,
    tokens: Arc<TokenProvider>,
}

impl FirestoreClient {
    pub fn new(
        project_id: &str,
        tokens: Arc<TokenProvider>,
        base_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let base_url = base_url
            .unwrap_or("https://firestore.googleapis.com/v1")
            .trim_end_matches('/')
            .to_string();
        let http = Client::builder()
            .user_agent("fireseed/0.1")
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(30)))
            .build()?;
        Ok(Self {
            base_url,
            project_id: project_id.to_string(),
            http,
            tokens,
        })
    }

    fn doc_url(&self, collection: &str, key: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            self.base_url,
            self.project_id,
            urlencoding::encode(collection),
            urlencoding::encode(key)
        )
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreClient {
    async fn upsert(&self, collection: &str, key: &str, doc: &Document) -> Result<()> {
        let url = self.doc_url(collection, key);
        let bearer = self.tokens.bearer().await?;
        let body = json!({ "fields": encode_fields(doc) });

        let resp = self
            .http
            .patch(&url)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
            return Err(anyhow!("firestore upsert failed: {status} url={url} body={body}"));
        }
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let url = self.doc_url(collection, key);
        let bearer = self.tokens.bearer().await?;

        let resp = self.http.get(&url).bearer_auth(bearer).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
            return Err(anyhow!("firestore get failed: {status} url={url} body={body}"));
        }

        let body: JsonValue = resp.json().await?;
        // A document with no fields comes back without a "fields" key.
        let doc = match body.get("fields") {
            Some(fields) => decode_fields(fields)?,
            None => Document::new(),
        };
        Ok(Some(doc))
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let url = self.doc_url(collection, key);
        let bearer = self.tokens.bearer().await?;

        let resp = self.http.delete(&url).bearer_auth(bearer).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
            return Err(anyhow!("firestore delete failed: {status} url={url} body={body}"));
        }
        Ok(())
    }
}

pub fn encode_fields(doc: &Document) -> JsonValue {
    let mut fields = serde_json::Map::new();
    for (name, value) in doc {
        fields.insert(name.clone(), encode_value(value));
    }
    JsonValue::Object(fields)
}

pub fn encode_value(value: &Value) -> JsonValue {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        // int64 travels as a decimal string on the wire
        Value::Int(i) => json!({ "integerValue": i.to_string() }),
        Value::Double(f) => json!({ "doubleValue": f }),
        Value::Str(s) => json!({ "stringValue": s }),
        Value::Timestamp(ts) => json!({
            "timestampValue": ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Map(map) => {
            let mut fields = serde_json::Map::new();
            for (name, value) in map {
                fields.insert(name.clone(), encode_value(value));
            }
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

pub fn decode_fields(fields: &JsonValue) -> Result<Document> {
    let Some(map) = fields.as_object() else {
        bail!("expected an object of fields, got {fields}");
    };
    let mut doc = Document::new();
    for (name, value) in map {
        doc.insert(name.clone(), decode_value(value)?);
    }
    Ok(doc)
}

pub fn decode_value(wire: &JsonValue) -> Result<Value> {
    let Some(obj) = wire.as_object() else {
        bail!("expected a typed value object, got {wire}");
    };
    let Some((kind, inner)) = obj.iter().next() else {
        bail!("empty typed value object");
    };
    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| anyhow!("booleanValue holds {inner}")),
        "integerValue" => {
            // Served as a string per the int64 JSON mapping, but accept both.
            if let Some(i) = inner.as_i64() {
                return Ok(Value::Int(i));
            }
            inner
                .as_str()
                .and_then(|s| s.parse::<i64>().ok())
                .map(Value::Int)
                .ok_or_else(|| anyhow!("integerValue holds {inner}"))
        }
        "doubleValue" => inner
            .as_f64()
            .map(Value::Double)
            .ok_or_else(|| anyhow!("doubleValue holds {inner}")),
        "stringValue" => inner
            .as_str()
            .map(|s| Value::Str(s.to_string()))
            .ok_or_else(|| anyhow!("stringValue holds {inner}")),
        "timestampValue" => {
            let raw = inner
                .as_str()
                .ok_or_else(|| anyhow!("timestampValue holds {inner}"))?;
            let ts = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| anyhow!("timestampValue {raw:?}: {e}"))?;
            Ok(Value::Timestamp(ts.with_timezone(&Utc)))
        }
        "arrayValue" => {
            let mut items = Vec::new();
            if let Some(values) = inner.get("values").and_then(|v| v.as_array()) {
                for value in values {
                    items.push(decode_value(value)?);
                }
            }
            Ok(Value::Array(items))
        }
        "mapValue" => {
            let mut map = indexmap::IndexMap::new();
            if let Some(fields) = inner.get("fields").and_then(|v| v.as_object()) {
                for (name, value) in fields {
                    map.insert(name.clone(), decode_value(value)?);
                }
            }
            Ok(Value::Map(map))
        }
        other => bail!("unsupported Firestore value type {other}"),
    }
}
