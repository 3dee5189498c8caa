pub(crate) mod json;
pub mod kv_store;

pub use json::*;
