pub mod error;
pub mod scope;
pub mod time;

pub use error::{CoreError, Result};
pub use scope::ScopeId;
pub use time::{format_rfc3339, now_utc, parse_rfc3339};
