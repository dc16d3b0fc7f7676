pub mod info;
pub mod query;

pub use info::{Facts, Host};
pub use query::{PROMPT, Query, ask};
