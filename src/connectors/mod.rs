//! External service connectors
//!
//! The upstream model provider is reached only through the
//! [`chat_completions::ChatCompletionsConnector`] trait. Routes receive it as
//! `web::Data<Arc<dyn ChatCompletionsConnector>>` and tests swap in a mock.

pub mod chat_completions;
pub mod errors;

pub use chat_completions::{ChatCompletionsClient, ChatCompletionsConnector};
pub use errors::ConnectorError;
