pub mod attribute;
pub mod duration;
pub mod request;
pub mod time_range;
pub mod timezone;

pub use attribute::*;
pub use duration::*;
pub use request::*;
pub use time_range::*;
pub use timezone::*;
