//! Model provider implementations.

mod openai;

pub use openai::{DEFAULT_BASE_URL, OpenAiProvider, chat_endpoint};
