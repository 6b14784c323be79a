pub mod dialect; // SQL rendering per query engine
pub mod external; // Data sources reached through a transport

pub use dialect::{Engine, MySqlDialect, PartPrimitives, PrestoDialect, SqlDialect, TimePart};
pub use external::{
    create_external, AttributeCache, External, ExternalSpec, FnRequester, MySqlExternal, PrestoExternal, Requester,
};
