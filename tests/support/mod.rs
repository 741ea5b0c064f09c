use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use fireseed::dataset::Dataset;
use fireseed::document::Document;
use fireseed::store::{DocumentStore, IdentityProvider, Lookup};

/// In-memory document store. Records every operation in order so tests can
/// assert sequencing, and refuses writes to keys placed on the fail list.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<(String, String), Document>>,
    fail_upserts: Mutex<HashSet<(String, String)>>,
    ops: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, collection: &str, key: &str, doc: Document) {
        self.docs
            .lock()
            .unwrap()
            .insert((collection.to_string(), key.to_string()), doc);
    }

    pub fn fail_upsert(&self, collection: &str, key: &str) {
        self.fail_upserts
            .lock()
            .unwrap()
            .insert((collection.to_string(), key.to_string()));
    }

    pub fn doc(&self, collection: &str, key: &str) -> Option<Document> {
        self.docs
            .lock()
            .unwrap()
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, collection: &str, key: &str) -> bool {
        self.doc(collection, key).is_some()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn log(&self, entry: String) {
        self.ops.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert(&self, collection: &str, key: &str, doc: &Document) -> Result<()> {
        self.log(format!("upsert {collection}/{key}"));
        let id = (collection.to_string(), key.to_string());
        if self.fail_upserts.lock().unwrap().contains(&id) {
            bail!("simulated write refusal for {collection}/{key}");
        }
        self.docs.lock().unwrap().insert(id, doc.clone());
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        self.log(format!("get {collection}/{key}"));
        Ok(self.doc(collection, key))
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        self.log(format!("delete {collection}/{key}"));
        self.docs
            .lock()
            .unwrap()
            .remove(&(collection.to_string(), key.to_string()));
        Ok(())
    }
}

/// In-memory identity directory. Unknown emails resolve to `NotFound`;
/// emails on the outage list fail the lookup outright.
#[derive(Default)]
pub struct MemoryDirectory {
    accounts: HashMap<String, String>,
    outages: HashSet<String>,
}

#[allow(dead_code)]
impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, email: &str, uid: &str) -> Self {
        self.accounts.insert(email.to_string(), uid.to_string());
        self
    }

    pub fn with_outage(mut self, email: &str) -> Self {
        self.outages.insert(email.to_string());
        self
    }
}

#[async_trait]
impl IdentityProvider for MemoryDirectory {
    async fn lookup_by_email(&self, email: &str) -> Result<Lookup> {
        if self.outages.contains(email) {
            bail!("simulated directory outage");
        }
        Ok(match self.accounts.get(email) {
            Some(uid) => Lookup::Resolved(uid.clone()),
            None => Lookup::NotFound,
        })
    }
}

#[allow(dead_code)]
pub fn dataset_from(json: serde_json::Value) -> Dataset {
    serde_json::from_value(json).expect("test dataset should deserialize")
}
