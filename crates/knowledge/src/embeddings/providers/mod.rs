pub mod mock;
pub mod ollama;
