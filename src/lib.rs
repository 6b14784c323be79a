pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use error::{ErrorDetail, QueryError, Result};
pub use models::*;
pub use services::*;
