//! Generation collaborator for pagewise.
//!
//! Every call is single-shot and stateless: one prompt in, one completion out.
//! The answer pipeline depends only on the [`LlmClient`] trait, so the Ollama
//! backend and the scripted test double are interchangeable.
//!
//! # Example
//! ```no_run
//! use pagewise_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Define osmosis.", "llama3.2").with_temperature(0.1);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockLlmClient, OllamaClient};
pub use types::ProviderType;
