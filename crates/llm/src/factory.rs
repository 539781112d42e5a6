//! Generation client factory.

use crate::client::LlmClient;
use crate::providers::{MockLlmClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Create a generation client by provider name.
///
/// `endpoint` and `timeout` only apply to network providers.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout: Option<Duration>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| format!("Unknown provider: {}. Supported: ollama, mock", provider))?;

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            match timeout {
                Some(timeout) => Arc::new(OllamaClient::with_timeout(base_url, timeout)),
                None => Arc::new(OllamaClient::with_base_url(base_url)),
            }
        }
        ProviderType::Mock => Arc::new(MockLlmClient::echo()),
    };

    tracing::debug!("Created {} generation client", client.provider_name());
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", Some("http://localhost:8080"), None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_mock_client() {
        let client = create_client("mock", None, Some(Duration::from_secs(1))).unwrap();
        assert_eq!(client.provider_name(), "mock");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("gpt", None, None) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
