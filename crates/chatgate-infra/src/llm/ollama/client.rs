//! OllamaProvider -- concrete [`LlmProvider`] implementation for a local
//! Ollama server.

use std::time::Duration;

use chatgate_core::llm::provider::{EventStream, LlmProvider};
use chatgate_observe::genai_attrs::PROVIDER_OLLAMA;
use chatgate_types::llm::{CompletionRequest, LlmError, ProviderCapabilities};

use super::streaming::{create_ollama_stream, status_error};
use super::types::{OllamaChatRequest, OllamaMessage, OllamaOptions, OllamaTagsResponse};

/// Ollama LLM provider speaking the native `/api/chat` protocol.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    capabilities: ProviderCapabilities,
}

impl OllamaProvider {
    /// Create a provider for the server at `base_url` (e.g. `http://localhost:11434`).
    ///
    /// Only the connect phase is bounded; generation may take as long as the
    /// model needs.
    pub fn new(base_url: &str, max_output_tokens: u32) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            capabilities: ProviderCapabilities {
                streaming: true,
                max_output_tokens,
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a completion request to the Ollama wire format.
    ///
    /// The system instruction becomes the first message.
    pub(crate) fn to_ollama_request(request: &CompletionRequest) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| OllamaMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));

        OllamaChatRequest {
            model: request.model.clone(),
            messages,
            stream: true,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER_OLLAMA
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let body = Self::to_ollama_request(&request);
        create_ollama_stream(&self.client, &self.url("/api/chat"), body)
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = self.url("/api/tags");
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(format!("cannot reach {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("model list: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgate_types::llm::{Message, StreamEvent};
    use futures_util::StreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "llama3:latest".to_string(),
            messages: vec![Message::user("hello"), Message::assistant("hi"), Message::user("again")],
            system: Some("be brief".to_string()),
            max_tokens: 256,
            temperature: Some(0.7),
            stream: true,
        }
    }

    /// Serve one HTTP response on a random local port.
    async fn serve_once(status: &'static str, content_type: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + content_length {
                    return;
                }
            }
        }
    }

    #[test]
    fn test_provider_name_and_trailing_slash() {
        let provider = OllamaProvider::new("http://localhost:11434/", 2048).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.base_url(), "http://localhost:11434");
        assert_eq!(provider.url("/api/chat"), "http://localhost:11434/api/chat");
        assert_eq!(provider.capabilities().max_output_tokens, 2048);
    }

    #[test]
    fn test_request_conversion() {
        let body = OllamaProvider::to_ollama_request(&request());
        assert!(body.stream);
        assert_eq!(body.options.num_predict, 256);
        assert_eq!(body.options.temperature, Some(0.7));
        let roles: Vec<&str> = body.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["options"]["num_predict"], 256);
        assert_eq!(json["messages"][0]["content"], "be brief");
    }

    #[tokio::test]
    async fn test_stream_parses_ndjson_response() {
        let body = [
            r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":" there"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#,
        ]
        .join("\n")
            + "\n";
        let url = serve_once("200 OK", "application/x-ndjson", body).await;
        let provider = OllamaProvider::new(&url, 2048).unwrap();

        let events: Vec<StreamEvent> = provider
            .stream(request())
            .map(|e| e.unwrap())
            .collect()
            .await;
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(events.first(), Some(&StreamEvent::Connected));
        assert_eq!(text, "Hi there");
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }

    #[tokio::test]
    async fn test_truncated_stream_is_stream_error() {
        let body = r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#.to_string() + "\n";
        let url = serve_once("200 OK", "application/x-ndjson", body).await;
        let provider = OllamaProvider::new(&url, 2048).unwrap();

        let events: Vec<_> = provider.stream(request()).collect().await;
        assert!(matches!(events.last(), Some(Err(LlmError::Stream(_)))));
    }

    #[tokio::test]
    async fn test_missing_model_is_provider_error() {
        let url = serve_once(
            "404 Not Found",
            "application/json",
            r#"{"error":"model 'llama3:latest' not found, try pulling it first"}"#.to_string(),
        )
        .await;
        let provider = OllamaProvider::new(&url, 2048).unwrap();

        let events: Vec<_> = provider.stream(request()).collect().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(LlmError::Provider { message }) => assert!(message.contains("not found")),
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let provider = OllamaProvider::new(&format!("http://{addr}"), 2048).unwrap();

        let events: Vec<_> = provider.stream(request()).collect().await;
        assert!(matches!(&events[0], Err(LlmError::Unavailable(_))));
        assert!(matches!(provider.list_models().await, Err(LlmError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_list_models() {
        let url = serve_once(
            "200 OK",
            "application/json",
            r#"{"models":[{"name":"llama3:latest","size":1},{"name":"mistral:7b"}]}"#.to_string(),
        )
        .await;
        let provider = OllamaProvider::new(&url, 2048).unwrap();

        let models = provider.list_models().await.unwrap();
        assert_eq!(models, vec!["llama3:latest", "mistral:7b"]);
    }
}
