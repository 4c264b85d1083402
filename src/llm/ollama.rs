use crate::llm::client::CompletionClient;
use crate::types::GenerationError;
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    Ollama,
};

const DEFAULT_PORT: u16 = 11434;

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

/// Split `scheme://host[:port][/...]` into `scheme://host` and a port.
///
/// A missing scheme means `http`; a missing or unparsable port means 11434.
fn split_base_url(base_url: &str) -> (String, u16) {
    let (scheme, rest) = base_url.split_once("://").unwrap_or(("http", base_url));
    let authority = rest.split('/').next().unwrap_or(rest);

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().unwrap_or(DEFAULT_PORT)),
        None => (authority, DEFAULT_PORT),
    };
    let host = if host.is_empty() { "localhost" } else { host };

    (format!("{}://{}", scheme, host), port)
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String) -> Self {
        let (host, port) = split_base_url(base_url);
        let client = Ollama::new(host, port);

        Self { client, model }
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        let messages = vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ];

        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| GenerationError::Provider {
                provider: "Ollama".to_string(),
                reason: e.to_string(),
            })?;

        let content = response.message.content;
        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse("Ollama".to_string()));
        }
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parsing_full() {
        assert_eq!(
            split_base_url("http://localhost:11434"),
            ("http://localhost".to_string(), 11434)
        );
    }

    #[test]
    fn test_url_parsing_no_port() {
        assert_eq!(
            split_base_url("https://ollama.internal"),
            ("https://ollama.internal".to_string(), 11434)
        );
    }

    #[test]
    fn test_url_parsing_custom_port_and_path() {
        assert_eq!(
            split_base_url("http://192.168.1.100:8080/"),
            ("http://192.168.1.100".to_string(), 8080)
        );
    }

    #[test]
    fn test_url_parsing_no_scheme() {
        assert_eq!(
            split_base_url("gpu-box:9000"),
            ("http://gpu-box".to_string(), 9000)
        );
    }
}
