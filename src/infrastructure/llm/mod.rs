pub mod circuit_breaker;
pub mod client;
pub mod protocol;

pub use client::{HttpLlmClient, LlmClientRegistry};
