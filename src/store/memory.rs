use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    dynamo::apply_options, Document, DocumentStore, QueryOptions, StoreError, TxApply, TxOutcome,
    TxResult,
};

const ID_ATTR: &str = "id";

/// In-process store used by tests. Transactions serialize under the write
/// lock, so the optimistic retry loop of the DynamoDB backend degenerates to
/// a single attempt here.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn with_id(id: &str, mut doc: Document) -> Document {
    doc.insert(ID_ATTR.to_string(), Value::String(id.to_string()));
    doc
}

fn matches(doc: &Document, filters: &[(&str, Value)]) -> bool {
    filters
        .iter()
        .all(|(field, value)| doc.get(*field) == Some(value))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
        opts: &QueryOptions,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let collections = self.collections.read().unwrap();
        let rows = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| matches(doc, filters))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(apply_options(rows, opts))
    }

    async fn put(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), with_id(id, doc));
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().unwrap();
        let doc = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        for (field, value) in fields {
            doc.insert(field, value);
        }
        doc.insert(ID_ATTR.to_string(), Value::String(id.to_string()));
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().unwrap();
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn transact(
        &self,
        collection: &str,
        id: &str,
        apply: TxApply<'_>,
    ) -> Result<TxResult, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        match apply(docs.get(id)) {
            TxOutcome::Write(doc) => {
                docs.insert(id.to_string(), with_id(id, doc));
                Ok(TxResult::Committed)
            }
            TxOutcome::Abort => Ok(TxResult::Aborted),
        }
    }
}
