use tracing::debug;

use crate::backend::BackendRequest;
use crate::compose::WireMessage;

/// Literal payload marking normal stream termination.
const DONE_SENTINEL: &str = "[DONE]";

/// JSON body for a streaming chat-completions request.
#[derive(Debug, serde::Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [WireMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_parameters: Option<SearchParameters>,
}

/// xAI live-search extension field.
#[derive(Debug, serde::Serialize)]
pub(crate) struct SearchParameters {
    pub mode: &'static str,
}

pub(crate) fn build_request_body(req: &BackendRequest) -> ChatCompletionRequest<'_> {
    ChatCompletionRequest {
        model: &req.policy.model,
        messages: &req.messages,
        temperature: req.policy.temperature,
        max_tokens: req.policy.max_tokens,
        stream: true,
        search_parameters: req
            .policy
            .live_search
            .then_some(SearchParameters { mode: "on" }),
    }
}

/// One SSE chunk object from the wire.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

/// One per-choice delta inside a chunk.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct ChunkDelta {
    pub role: Option<String>,
    pub content: Option<String>,
}

/// Incremental SSE line decoder.
///
/// Buffers raw bytes across arbitrary chunk boundaries, splits on `\n`, and
/// yields only `data:` payloads. Blank lines, comments, and other SSE fields
/// are framing noise and are dropped. The `[DONE]` sentinel flips the decoder
/// into its terminal state and suppresses any further payloads.
#[derive(Default)]
pub struct SseLineDecoder {
    buf: Vec<u8>,
    done: bool,
}

impl SseLineDecoder {
    /// Feeds one network chunk and returns the complete payloads it finished.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
            let line_bytes = self.buf[..idx].to_vec();
            self.buf.drain(..idx + 1);
            if self.done {
                continue;
            }
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim_start();
            if payload == DONE_SENTINEL {
                self.done = true;
                continue;
            }
            payloads.push(payload.to_string());
        }
        payloads
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Content and advisory finish reason extracted from one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RoutedChunk {
    pub delta: Option<String>,
    pub finish_reason: Option<String>,
}

/// Routes one raw JSON payload to its first-choice content delta.
///
/// Malformed payloads are skipped, not fatal; one bad frame never aborts an
/// otherwise-healthy stream. A `finish_reason` is advisory only — recorded
/// for the terminal event, while `[DONE]` (or a clean close) stays the
/// authoritative end marker.
pub(crate) fn route_payload(payload: &str) -> Option<RoutedChunk> {
    let chunk: ChatCompletionChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(err) => {
            debug!(error = %err, "skipping malformed SSE payload");
            return None;
        }
    };
    let choice = chunk.choices.first()?;
    if let Some(reason) = choice.finish_reason.as_deref() {
        debug!(chunk_id = %chunk.id, finish_reason = reason, "choice carries finish reason");
    }
    Some(RoutedChunk {
        delta: choice.delta.content.clone(),
        finish_reason: choice.finish_reason.clone(),
    })
}
