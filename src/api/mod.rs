pub mod client;
pub mod server;

pub use client::{ChatMessage, CompletionClient, CompletionRequest, CompletionService, RetryConfiguration};
pub use server::{APIServerConfig, AppState, CodeBloomServer};
