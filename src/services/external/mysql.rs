// MySQL external
use std::sync::Arc;
use tracing::warn;

use super::{
    check_engine, column_rows, expect_rows, issue, show_tables, to_attributes, AttributeCache, External,
    ExternalSpec, Requester,
};
use crate::error::{QueryError, Result};
use crate::models::{AttributeInfo, AttributeType};
use crate::services::dialect::{Engine, SqlDialect};

const VERSION_QUERY: &str = "SELECT @@version";
const VERSION_KEY: &str = "@@version";

pub struct MySqlExternal {
    source: String,
    requester: Arc<dyn Requester>,
    dialect: Box<dyn SqlDialect>,
    attributes: AttributeCache,
}

impl MySqlExternal {
    pub fn new(spec: ExternalSpec, requester: Arc<dyn Requester>) -> Result<Self> {
        Self::with_dialect(spec, requester, Engine::Mysql.dialect())
    }

    pub fn with_dialect(spec: ExternalSpec, requester: Arc<dyn Requester>, dialect: Box<dyn SqlDialect>) -> Result<Self> {
        check_engine(Engine::Mysql, &spec, dialect.as_ref())?;
        Ok(Self {
            source: spec.source,
            requester,
            dialect,
            attributes: AttributeCache::default(),
        })
    }

    pub async fn source_list(requester: &dyn Requester) -> Result<Vec<String>> {
        show_tables(requester).await
    }

    /// Server version from `SELECT @@version`
    pub async fn version(requester: &dyn Requester) -> Result<String> {
        let response = issue(requester, VERSION_QUERY.to_string()).await?;
        let rows = expect_rows(response, VERSION_QUERY)?;
        rows.first()
            .and_then(|row| row.get(VERSION_KEY))
            .and_then(|version| version.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                warn!("No {} in version response", VERSION_KEY);
                QueryError::InvalidResponse(format!("expected a {} string in the first row", VERSION_KEY))
            })
    }
}

/// Attribute type for a MySQL column type, `None` for unmapped types
pub fn attribute_type(sql_type: &str) -> Option<AttributeType> {
    let sql_type = sql_type.to_lowercase();
    let has_prefix = |prefixes: &[&str]| prefixes.iter().any(|prefix| sql_type.starts_with(prefix));

    if sql_type == "datetime" || sql_type == "timestamp" {
        Some(AttributeType::Time)
    } else if has_prefix(&["varchar(", "blob"]) {
        Some(AttributeType::String)
    } else if has_prefix(&["int(", "bigint(", "decimal(", "float", "double"]) {
        Some(AttributeType::Number)
    } else if sql_type == "tinyint(1)" {
        Some(AttributeType::Boolean)
    } else {
        None
    }
}

#[async_trait::async_trait]
impl External for MySqlExternal {
    fn engine(&self) -> Engine {
        Engine::Mysql
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
        let query = format!("SHOW COLUMNS FROM {}", self.dialect.escape_name(&self.source));
        let response = issue(self.requester.as_ref(), query.clone()).await?;
        let columns = column_rows(expect_rows(response, &query)?)?;
        Ok(to_attributes(&self.source, columns, attribute_type))
    }
}
