use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    operation::{
        delete_item::DeleteItemError, get_item::GetItemError, put_item::PutItemError,
        scan::ScanError, update_item::UpdateItemError,
    },
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

pub mod dynamo;
#[cfg(test)]
pub mod memory;

pub use dynamo::DynamoStore;
#[cfg(test)]
pub use memory::MemoryStore;

/// A single document: a flat JSON object as stored in a collection.
pub type Document = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("DynamoDB Error: GetItem: {0}")]
    Get(#[from] SdkError<GetItemError>),
    #[error("DynamoDB Error: PutItem: {0}")]
    Put(#[from] SdkError<PutItemError>),
    #[error("DynamoDB Error: Scan: {0}")]
    Scan(#[from] SdkError<ScanError>),
    #[error("DynamoDB Error: UpdateItem: {0}")]
    Update(#[from] SdkError<UpdateItemError>),
    #[error("DynamoDB Error: DeleteItem: {0}")]
    Delete(#[from] SdkError<DeleteItemError>),
    #[error("SerdeDynamo failed to process DynamoDB data: {0}")]
    SerdeDynamo(#[from] serde_dynamo::Error),
    #[error("Document is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Write conflict on {collection}/{id} after {attempts} attempts")]
    Conflict {
        collection: String,
        id: String,
        attempts: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordering and paging for [`DocumentStore::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub order_by: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl QueryOptions {
    pub fn ordered(field: &str, direction: SortDirection) -> Self {
        Self {
            order_by: Some((field.to_string(), direction)),
            ..Default::default()
        }
    }
}

/// What a transaction closure decided to do with the document it was handed.
pub enum TxOutcome {
    /// Replace the document with this value and commit.
    Write(Document),
    /// Leave the document untouched; the transaction reports [`TxResult::Aborted`].
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxResult {
    Committed,
    Aborted,
}

impl TxResult {
    pub fn committed(self) -> bool {
        self == TxResult::Committed
    }
}

/// Closure driven by [`DocumentStore::transact`]. Receives the current
/// document (None when absent) and must be pure compute: the store may call
/// it again on every optimistic retry.
pub type TxApply<'a> = &'a mut (dyn FnMut(Option<&Document>) -> TxOutcome + Send);

/// Abstraction over the backing document database.
///
/// Every mutable "check-then-set" transition in the auction subsystem goes
/// through [`transact`](DocumentStore::transact), the store's optimistic
/// single-document read-modify-write. Plain [`merge`](DocumentStore::merge)
/// is reserved for fields that are not safety-critical.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Equality-filtered scan of a collection, returning `(id, document)`
    /// pairs. Ordering and paging are applied client-side; callers that need
    /// non-equality predicates filter the result in memory.
    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
        opts: &QueryOptions,
    ) -> Result<Vec<(String, Document)>, StoreError>;

    async fn put(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError>;

    /// Unconditional partial update: set the given top-level fields, leaving
    /// the rest of the document alone.
    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Optimistic read-modify-write of one document. The closure is retried
    /// until the conditional write lands on an unchanged document or it
    /// aborts; retry exhaustion surfaces as [`StoreError::Conflict`].
    async fn transact(
        &self,
        collection: &str,
        id: &str,
        apply: TxApply<'_>,
    ) -> Result<TxResult, StoreError>;
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    use serde::de::Error as _;

    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde_json::Error::custom(format!(
            "expected a JSON object, got {}",
            other
        ))
        .into()),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Field accessors used inside transaction closures, which work on raw
/// documents rather than typed models so a half-migrated record cannot poison
/// the whole transaction.
pub fn doc_str<'a>(doc: &'a Document, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

pub fn doc_u64(doc: &Document, field: &str) -> Option<u64> {
    doc.get(field).and_then(Value::as_u64)
}
