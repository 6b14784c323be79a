// External data sources reached through a transport collaborator
pub mod mysql;
pub mod presto;

pub use mysql::MySqlExternal;
pub use presto::PrestoExternal;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{QueryError, Result};
use crate::models::{AttributeInfo, AttributeType, DatabaseRequest};
use crate::services::dialect::{Engine, SqlDialect};

/// Transport that executes a query and returns its rows as JSON
#[async_trait::async_trait]
pub trait Requester: Send + Sync {
    async fn request(&self, request: DatabaseRequest) -> anyhow::Result<Value>;
}

/// Requester backed by a closure
pub struct FnRequester<F> {
    handler: F,
}

impl<F> FnRequester<F>
where
    F: Fn(DatabaseRequest) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait::async_trait]
impl<F> Requester for FnRequester<F>
where
    F: Fn(DatabaseRequest) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync,
{
    async fn request(&self, request: DatabaseRequest) -> anyhow::Result<Value> {
        (self.handler)(request).await
    }
}

/// Engine and source an External is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSpec {
    pub engine: Engine,
    pub source: String,
}

impl ExternalSpec {
    pub fn new(engine: Engine, source: impl Into<String>) -> Self {
        Self {
            engine,
            source: source.into(),
        }
    }
}

/// Introspected attributes, filled on first use
#[derive(Debug, Default)]
pub struct AttributeCache {
    inner: RwLock<Option<Vec<AttributeInfo>>>,
}

impl AttributeCache {
    pub async fn get(&self) -> Option<Vec<AttributeInfo>> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, attributes: Vec<AttributeInfo>) {
        *self.inner.write().await = Some(attributes);
    }
}

/// A data source on one engine, queried through a `Requester`
#[async_trait::async_trait]
pub trait External: Send + Sync {
    fn engine(&self) -> Engine;

    /// Table or view this External reads from
    fn source(&self) -> &str;

    fn dialect(&self) -> &dyn SqlDialect;

    fn attribute_cache(&self) -> &AttributeCache;

    /// Names of the tables visible to the transport, sorted
    async fn list_sources(&self) -> Result<Vec<String>>;

    async fn engine_version(&self) -> Result<String>;

    /// Query the source's columns and map them onto attribute types.
    /// Columns with unmapped types are dropped.
    async fn introspect_attributes(&self) -> Result<Vec<AttributeInfo>>;

    /// Attributes from the cache, introspecting on a miss
    async fn attributes(&self) -> Result<Vec<AttributeInfo>> {
        if let Some(attributes) = self.attribute_cache().get().await {
            return Ok(attributes);
        }
        let attributes = self.introspect_attributes().await?;
        self.attribute_cache().set(attributes.clone()).await;
        Ok(attributes)
    }
}

/// Factory function to create the External for `spec.engine`
pub fn create_external(spec: ExternalSpec, requester: Arc<dyn Requester>) -> Result<Box<dyn External>> {
    match spec.engine {
        Engine::Presto => Ok(Box::new(PrestoExternal::new(spec, requester)?)),
        Engine::Mysql => Ok(Box::new(MySqlExternal::new(spec, requester)?)),
    }
}

/// Check that both the declared engine and the dialect are `expected`
pub(crate) fn check_engine(expected: Engine, spec: &ExternalSpec, dialect: &dyn SqlDialect) -> Result<()> {
    for actual in [spec.engine, dialect.engine()] {
        if actual != expected {
            return Err(QueryError::EngineMismatch { expected, actual });
        }
    }
    Ok(())
}

/// Issue one query through the transport
pub(crate) async fn issue(requester: &dyn Requester, query: String) -> Result<Value> {
    debug!("Issuing query: {}", query);
    Ok(requester.request(DatabaseRequest::new(query)).await?)
}

/// Response rows, or `InvalidResponse` when the transport returned something
/// other than an array
pub(crate) fn expect_rows(response: Value, query: &str) -> Result<Vec<Value>> {
    match response {
        Value::Array(rows) => Ok(rows),
        other => {
            warn!("Non-array response to '{}': {}", query, other);
            Err(QueryError::InvalidResponse(format!(
                "expected an array of rows for '{}', got {}",
                query,
                json_kind(&other)
            )))
        }
    }
}

/// `SHOW TABLES` through the transport
pub(crate) async fn show_tables(requester: &dyn Requester) -> Result<Vec<String>> {
    let query = "SHOW TABLES";
    let response = issue(requester, query.to_string()).await?;
    source_names(expect_rows(response, query)?)
}

/// Table names from `SHOW TABLES` rows. The column holding the name differs
/// between engines and catalogs, so the first key of the first row is used.
pub(crate) fn source_names(rows: Vec<Value>) -> Result<Vec<String>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let key = first
        .as_object()
        .and_then(|row| row.keys().next())
        .cloned()
        .ok_or_else(|| {
            warn!("Source listing row has no columns: {}", first);
            QueryError::InvalidResponse("source listing rows have no columns".to_string())
        })?;

    let mut names: Vec<String> = rows
        .iter()
        .filter_map(|row| row.get(&key))
        .map(|value| match value {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        })
        .collect();
    names.sort();
    Ok(names)
}

/// One row of a `SHOW COLUMNS` response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ColumnRow {
    #[serde(alias = "Column", alias = "column", alias = "Field")]
    pub name: String,
    #[serde(rename = "sqlType", alias = "Type", alias = "type")]
    pub sql_type: String,
}

pub(crate) fn column_rows(rows: Vec<Value>) -> Result<Vec<ColumnRow>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| QueryError::InvalidResponse(format!("unreadable column row: {}", e)))
        })
        .collect()
}

/// Map column rows onto attributes, dropping types `mapping` does not know
pub(crate) fn to_attributes(
    source: &str,
    columns: Vec<ColumnRow>,
    mapping: fn(&str) -> Option<AttributeType>,
) -> Vec<AttributeInfo> {
    let total = columns.len();
    let attributes: Vec<AttributeInfo> = columns
        .into_iter()
        .filter_map(|column| match mapping(&column.sql_type) {
            Some(attr_type) => Some(AttributeInfo::new(column.name, attr_type)),
            None => {
                debug!("Dropping column {} of unsupported type {}", column.name, column.sql_type);
                None
            }
        })
        .collect();
    info!("Introspected {} of {} columns from {}", attributes.len(), total, source);
    attributes
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
