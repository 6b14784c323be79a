use serde::{Deserialize, Serialize};

/// Request handed to the transport collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRequest {
    pub query: String,
}

impl DatabaseRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into() }
    }
}
