// Presto external
use std::sync::Arc;

use super::{
    check_engine, column_rows, expect_rows, issue, show_tables, to_attributes, AttributeCache, External,
    ExternalSpec, Requester,
};
use crate::error::{QueryError, Result};
use crate::models::{AttributeInfo, AttributeType};
use crate::services::dialect::{Engine, SqlDialect};

pub struct PrestoExternal {
    source: String,
    requester: Arc<dyn Requester>,
    dialect: Box<dyn SqlDialect>,
    attributes: AttributeCache,
}

impl PrestoExternal {
    pub fn new(spec: ExternalSpec, requester: Arc<dyn Requester>) -> Result<Self> {
        Self::with_dialect(spec, requester, Engine::Presto.dialect())
    }

    /// Fails with `EngineMismatch` unless both `spec` and `dialect` are Presto
    pub fn with_dialect(spec: ExternalSpec, requester: Arc<dyn Requester>, dialect: Box<dyn SqlDialect>) -> Result<Self> {
        check_engine(Engine::Presto, &spec, dialect.as_ref())?;
        Ok(Self {
            source: spec.source,
            requester,
            dialect,
            attributes: AttributeCache::default(),
        })
    }

    /// Tables visible through `requester`, for callers without an External
    pub async fn source_list(requester: &dyn Requester) -> Result<Vec<String>> {
        show_tables(requester).await
    }

    /// Presto has no version query this layer can rely on
    pub async fn version(_requester: &dyn Requester) -> Result<String> {
        Err(QueryError::UnsupportedVersion(Engine::Presto))
    }
}

/// Attribute type for a Presto column type, `None` for unmapped types
pub fn attribute_type(sql_type: &str) -> Option<AttributeType> {
    let sql_type = sql_type.to_lowercase();
    if sql_type.contains("timestamp") {
        Some(AttributeType::Time)
    } else if sql_type.starts_with("varchar(") {
        Some(AttributeType::String)
    } else if sql_type == "bigint" || sql_type == "double" {
        Some(AttributeType::Number)
    } else if sql_type == "boolean" {
        Some(AttributeType::Boolean)
    } else {
        None
    }
}

#[async_trait::async_trait]
impl External for PrestoExternal {
    fn engine(&self) -> Engine {
        Engine::Presto
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    fn attribute_cache(&self) -> &AttributeCache {
        &self.attributes
    }

    async fn list_sources(&self) -> Result<Vec<String>> {
        Self::source_list(self.requester.as_ref()).await
    }

    async fn engine_version(&self) -> Result<String> {
        Self::version(self.requester.as_ref()).await
    }

    async fn introspect_attributes(&self) -> Result<Vec<AttributeInfo>> {
        let query = format!("SHOW COLUMNS FROM {}", self.dialect.escape_literal(&self.source));
        let response = issue(self.requester.as_ref(), query.clone()).await?;
        let columns = column_rows(expect_rows(response, &query)?)?;
        Ok(to_attributes(&self.source, columns, attribute_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dialect::MySqlDialect;
    use crate::services::external::tests::{failing_requester, MockRequester};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn external(response: serde_json::Value) -> (Arc<MockRequester>, PrestoExternal) {
        let requester = Arc::new(MockRequester::new(response));
        let external = PrestoExternal::new(ExternalSpec::new(Engine::Presto, "wiki"), requester.clone()).unwrap();
        (requester, external)
    }

    #[test]
    fn test_attribute_type_mapping() {
        assert_eq!(attribute_type("timestamp(3)"), Some(AttributeType::Time));
        assert_eq!(attribute_type("TIMESTAMP WITH TIME ZONE"), Some(AttributeType::Time));
        assert_eq!(attribute_type("varchar(255)"), Some(AttributeType::String));
        assert_eq!(attribute_type("bigint"), Some(AttributeType::Number));
        assert_eq!(attribute_type("double"), Some(AttributeType::Number));
        assert_eq!(attribute_type("boolean"), Some(AttributeType::Boolean));
        assert_eq!(attribute_type("varchar"), None);
        assert_eq!(attribute_type("char(5)"), None);
        assert_eq!(attribute_type("integer"), None);
    }

    #[tokio::test]
    async fn test_list_sources_sorted() {
        let (requester, external) = external(json!([{"table": "a"}, {"table": "c"}, {"table": "b"}]));
        let sources = assert_ok!(external.list_sources().await);
        assert_eq!(sources, vec!["a", "b", "c"]);
        assert_eq!(requester.queries(), vec!["SHOW TABLES"]);
    }

    #[tokio::test]
    async fn test_list_sources_empty() {
        let (_, external) = external(json!([]));
        assert!(assert_ok!(external.list_sources().await).is_empty());
    }

    #[tokio::test]
    async fn test_list_sources_rejects_non_array() {
        let (_, external) = external(json!({"error": "nope"}));
        let err = assert_err!(external.list_sources().await);
        assert!(matches!(err, QueryError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_source_list_without_instance() {
        let requester = MockRequester::new(json!([{"Table": "edits"}, {"Table": "pages"}]));
        let sources = assert_ok!(PrestoExternal::source_list(&requester).await);
        assert_eq!(sources, vec!["edits", "pages"]);
    }

    #[tokio::test]
    async fn test_version_is_unsupported() {
        let (requester, external) = external(json!([]));
        let err = assert_err!(external.engine_version().await);
        assert!(matches!(err, QueryError::UnsupportedVersion(Engine::Presto)));
        assert!(err.is_unsupported());
        assert_eq!(requester.calls(), 0);
    }

    #[tokio::test]
    async fn test_introspect_attributes() {
        let (requester, external) = external(json!([
            {"name": "t", "sqlType": "timestamp(3)"},
            {"name": "x", "sqlType": "char(5)"},
            {"name": "u", "sqlType": "unknown_type"},
        ]));
        let attributes = assert_ok!(external.introspect_attributes().await);
        assert_eq!(attributes, vec![AttributeInfo::new("t", AttributeType::Time)]);
        assert_eq!(requester.queries(), vec!["SHOW COLUMNS FROM 'wiki'"]);
    }

    #[tokio::test]
    async fn test_introspect_reads_presto_headers() {
        let (_, external) = external(json!([
            {"Column": "page", "Type": "varchar(100)", "Extra": "", "Comment": ""},
            {"Column": "added", "Type": "bigint", "Extra": "", "Comment": ""},
            {"Column": "robot", "Type": "boolean", "Extra": "", "Comment": ""},
        ]));
        let attributes = assert_ok!(external.introspect_attributes().await);
        assert_eq!(
            attributes,
            vec![
                AttributeInfo::new("page", AttributeType::String),
                AttributeInfo::new("added", AttributeType::Number),
                AttributeInfo::new("robot", AttributeType::Boolean),
            ]
        );
    }

    #[tokio::test]
    async fn test_attributes_are_cached() {
        let (requester, external) = external(json!([{"name": "t", "sqlType": "timestamp"}]));
        let first = assert_ok!(external.attributes().await);
        let second = assert_ok!(external.attributes().await);
        assert_eq!(first, second);
        assert_eq!(requester.calls(), 1);

        assert_ok!(external.introspect_attributes().await);
        assert_eq!(requester.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let external = PrestoExternal::new(ExternalSpec::new(Engine::Presto, "wiki"), failing_requester()).unwrap();
        let err = assert_err!(external.introspect_attributes().await);
        assert_eq!(err.code(), "TRANSPORT_ERROR");
        assert!(external.attribute_cache().get().await.is_none());
    }

    #[test]
    fn test_engine_mismatch() {
        let requester: Arc<dyn Requester> = Arc::new(MockRequester::new(json!([])));

        let err = PrestoExternal::new(ExternalSpec::new(Engine::Mysql, "wiki"), requester.clone())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            QueryError::EngineMismatch {
                expected: Engine::Presto,
                actual: Engine::Mysql
            }
        ));

        let err = PrestoExternal::with_dialect(
            ExternalSpec::new(Engine::Presto, "wiki"),
            requester,
            Box::new(MySqlDialect::new()),
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), "CONSTRUCTION_ERROR");
    }
}
