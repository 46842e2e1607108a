//! Ollama streaming adapter.
//!
//! `/api/chat` with `stream: true` answers with newline-delimited JSON, one
//! object per line:
//!
//! ```text
//! {"message":{"role":"assistant","content":"Hi"},"done":false}
//! {"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","eval_count":2}
//! ```
//!
//! Lines are cut from the raw byte stream as they arrive, so a JSON object
//! split across network chunks is reassembled before parsing.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use chatgate_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::types::{OllamaChatChunk, OllamaChatRequest};

/// Turn one NDJSON line into stream events.
pub(crate) fn process_line(line: &str) -> Result<Vec<StreamEvent>, LlmError> {
    let chunk: OllamaChatChunk = serde_json::from_str(line)
        .map_err(|e| LlmError::Stream(format!("invalid response line: {e}")))?;

    if let Some(message) = chunk.error {
        return Err(LlmError::Provider { message });
    }

    let mut events = Vec::new();
    if let Some(message) = chunk.message {
        if !message.content.is_empty() {
            events.push(StreamEvent::TextDelta {
                text: message.content,
            });
        }
    }

    if chunk.done {
        if chunk.prompt_eval_count.is_some() || chunk.eval_count.is_some() {
            events.push(StreamEvent::Usage(Usage {
                input_tokens: chunk.prompt_eval_count.unwrap_or(0),
                output_tokens: chunk.eval_count.unwrap_or(0),
            }));
        }
        let stop_reason = match chunk.done_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };
        events.push(StreamEvent::MessageDelta { stop_reason });
        events.push(StreamEvent::Done);
    }

    Ok(events)
}

/// Split complete lines off the front of `buffer`.
pub(crate) fn drain_lines(buffer: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let mut line: Vec<u8> = buffer.drain(..=pos).collect();
        line.pop();
        lines.push(line);
    }
    lines
}

/// Error for a non-success HTTP status. The server answered, so this is a
/// provider error (typically an unknown model), not a connectivity failure.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }

    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string());
    LlmError::Provider {
        message: format!("HTTP {status}: {detail}"),
    }
}

fn parse_raw_line(raw: &[u8]) -> Result<Vec<StreamEvent>, LlmError> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| LlmError::Stream(format!("invalid utf-8 in response: {e}")))?
        .trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }
    process_line(line)
}

/// Create the event stream for one `/api/chat` call.
///
/// Failing to connect yields `LlmError::Unavailable` before any event; a
/// non-success status is a provider error. Failures after `Connected` are
/// `LlmError::Stream` (or a provider error reported in-band).
pub fn create_ollama_stream(
    client: &reqwest::Client,
    url: &str,
    body: OllamaChatRequest,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    let client = client.clone();
    let url = url.to_string();

    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(format!("cannot reach {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, "Ollama chat API error response");
            Err::<(), _>(status_error(status, &error_body))?;
            unreachable!();
        }

        yield StreamEvent::Connected;

        let mut byte_stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut finished = false;

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = chunk_result.map_err(|e| LlmError::Stream(format!("response body read: {e}")))?;
            buffer.extend_from_slice(&chunk);

            for raw in drain_lines(&mut buffer) {
                for event in parse_raw_line(&raw)? {
                    finished |= matches!(event, StreamEvent::Done);
                    yield event;
                }
            }
        }

        // A final line without a trailing newline.
        for event in parse_raw_line(&buffer)? {
            finished |= matches!(event, StreamEvent::Done);
            yield event;
        }

        if !finished {
            Err(LlmError::Stream("response ended before completion".to_string()))?;
        }
    })
}
