use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::{error::SdkError, types::AttributeValue, Client};
use serde_dynamo::{from_item, to_attribute_value, to_item};
use serde_json::Value;
use ulid::Ulid;

use super::{
    Document, DocumentStore, QueryOptions, SortDirection, StoreError, TxApply, TxOutcome, TxResult,
};

/// Store-managed revision token backing the optimistic transaction primitive.
/// Never visible to callers.
const REVISION_ATTR: &str = "docRevision";
const ID_ATTR: &str = "id";

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// DynamoDB-backed document store. One table per collection, partition key
/// `id`, documents round-tripped through `serde_dynamo`.
pub struct DynamoStore {
    client: Client,
    table_prefix: String,
    retry: RetryPolicy,
}

impl DynamoStore {
    pub fn new(config: &SdkConfig, table_prefix: impl Into<String>) -> Self {
        Self {
            client: Client::new(config),
            table_prefix: table_prefix.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn table(&self, collection: &str) -> String {
        format!("{}{}", self.table_prefix, collection)
    }

    async fn get_raw(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<HashMap<String, AttributeValue>>, StoreError> {
        let resp = self
            .client
            .get_item()
            .table_name(self.table(collection))
            .key(ID_ATTR, AttributeValue::S(id.to_string()))
            .consistent_read(true)
            .send()
            .await?;
        Ok(resp.item)
    }
}

fn item_to_document(mut item: HashMap<String, AttributeValue>) -> Result<Document, StoreError> {
    item.remove(REVISION_ATTR);
    Ok(from_item(item)?)
}

fn document_to_item(
    id: &str,
    doc: Document,
    revision: &str,
) -> Result<HashMap<String, AttributeValue>, StoreError> {
    let mut item: HashMap<String, AttributeValue> = to_item(doc)?;
    item.insert(ID_ATTR.to_string(), AttributeValue::S(id.to_string()));
    item.insert(
        REVISION_ATTR.to_string(),
        AttributeValue::S(revision.to_string()),
    );
    Ok(item)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Shared post-scan ordering and paging, applied client-side by both backends.
pub(super) fn apply_options(mut rows: Vec<(String, Document)>, opts: &QueryOptions) -> Vec<(String, Document)> {
    if let Some((field, direction)) = &opts.order_by {
        rows.sort_by(|(_, a), (_, b)| {
            let ord = compare_values(a.get(field), b.get(field));
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
    let rows = rows.into_iter().skip(opts.offset);
    match opts.limit {
        Some(limit) => rows.take(limit).collect(),
        None => rows.collect(),
    }
}

#[async_trait]
impl DocumentStore for DynamoStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        match self.get_raw(collection, id).await? {
            Some(item) => Ok(Some(item_to_document(item)?)),
            None => Ok(None),
        }
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
        opts: &QueryOptions,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let mut scan = self.client.scan().table_name(self.table(collection));

        if !filters.is_empty() {
            let expr = filters
                .iter()
                .enumerate()
                .map(|(i, _)| format!("#f{i} = :v{i}"))
                .collect::<Vec<_>>()
                .join(" AND ");
            scan = scan.filter_expression(expr);
            for (i, (field, value)) in filters.iter().enumerate() {
                scan = scan
                    .expression_attribute_names(format!("#f{i}"), field.to_string())
                    .expression_attribute_values(format!(":v{i}"), to_attribute_value(value)?);
            }
        }

        let mut rows = Vec::new();
        let mut exclusive_start_key = None;
        loop {
            let resp = scan
                .clone()
                .set_exclusive_start_key(exclusive_start_key)
                .send()
                .await?;
            for item in resp.items() {
                let id = match item.get(ID_ATTR) {
                    Some(AttributeValue::S(s)) => s.clone(),
                    _ => continue,
                };
                rows.push((id, item_to_document(item.clone())?));
            }
            exclusive_start_key = resp.last_evaluated_key;
            if exclusive_start_key.is_none() {
                break;
            }
        }

        Ok(apply_options(rows, opts))
    }

    async fn put(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        let item = document_to_item(id, doc, &Ulid::new().to_string())?;
        self.client
            .put_item()
            .table_name(self.table(collection))
            .set_item(Some(item))
            .send()
            .await?;
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut update = self
            .client
            .update_item()
            .table_name(self.table(collection))
            .key(ID_ATTR, AttributeValue::S(id.to_string()));

        let mut set_exprs = Vec::with_capacity(fields.len() + 1);
        for (i, (field, value)) in fields.iter().enumerate() {
            set_exprs.push(format!("#k{i} = :u{i}"));
            update = update
                .expression_attribute_names(format!("#k{i}"), field.clone())
                .expression_attribute_values(format!(":u{i}"), to_attribute_value(value)?);
        }
        set_exprs.push("#rev = :rev".to_string());
        update = update
            .expression_attribute_names("#rev", REVISION_ATTR)
            .expression_attribute_values(":rev", AttributeValue::S(Ulid::new().to_string()));

        update
            .update_expression(format!("SET {}", set_exprs.join(", ")))
            .send()
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(self.table(collection))
            .key(ID_ATTR, AttributeValue::S(id.to_string()))
            .send()
            .await?;
        Ok(())
    }

    async fn transact(
        &self,
        collection: &str,
        id: &str,
        apply: TxApply<'_>,
    ) -> Result<TxResult, StoreError> {
        for _ in 0..self.retry.max_attempts {
            let current = self.get_raw(collection, id).await?;
            let revision = current.as_ref().and_then(|item| match item.get(REVISION_ATTR) {
                Some(AttributeValue::S(s)) => Some(s.clone()),
                _ => None,
            });
            let doc = match current {
                Some(item) => Some(item_to_document(item)?),
                None => None,
            };

            let new_doc = match apply(doc.as_ref()) {
                TxOutcome::Write(doc) => doc,
                TxOutcome::Abort => return Ok(TxResult::Aborted),
            };

            let item = document_to_item(id, new_doc, &Ulid::new().to_string())?;
            let mut put = self
                .client
                .put_item()
                .table_name(self.table(collection))
                .set_item(Some(item));
            put = match revision {
                Some(rev) => put
                    .condition_expression("#rev = :rev")
                    .expression_attribute_names("#rev", REVISION_ATTR)
                    .expression_attribute_values(":rev", AttributeValue::S(rev)),
                None => put
                    .condition_expression("attribute_not_exists(#id)")
                    .expression_attribute_names("#id", ID_ATTR),
            };

            match put.send().await {
                Ok(_) => return Ok(TxResult::Committed),
                Err(SdkError::ServiceError(e))
                    if e.err().is_conditional_check_failed_exception() =>
                {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::Conflict {
            collection: collection.to_string(),
            id: id.to_string(),
            attempts: self.retry.max_attempts,
        })
    }
}
