//! Trait seams for the two remote collaborators. The pipeline only ever
//! talks to these; the `remote` module provides the production
//! implementations and tests substitute in-memory ones.
use anyhow::Result;

use crate::document::Document;

/// Outcome of an identity lookup. `NotFound` is a first-class result, not an
/// error: it means the operator has to provision the account upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Resolved(String),
    NotFound,
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Full-document write: creates the document or replaces its entire
    /// contents. Never merges.
    async fn upsert(&self, collection: &str, key: &str, doc: &Document) -> Result<()>;

    /// Fetch a document; `None` means the key does not exist.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Delete a document. Deleting an absent key is a no-op success.
    async fn delete(&self, collection: &str, key: &str) -> Result<()>;
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn lookup_by_email(&self, email: &str) -> Result<Lookup>;
}
