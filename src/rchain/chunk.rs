use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chunk type emitted by the backend for assistant output.
pub const AI_MESSAGE_CHUNK: &str = "AIMessageChunk";

/// Complete tool call carried by a chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Parsed arguments, or a raw string when the backend could not parse them yet.
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Partial tool call carrying an argument text fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Declared slot of the tool call inside its message.
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub args: Option<String>,
}

/// Untrusted chunk payload as emitted by the transport.
///
/// Every field is optional; unknown fields are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChunk {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallFragment>>,
    #[serde(default)]
    pub tool_call_chunks: Option<Vec<ToolCallDelta>>,
    #[serde(default)]
    pub response_metadata: Option<Value>,
    #[serde(default)]
    pub usage_metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawChunk {
    /// Text content of the chunk; non-string content counts as empty.
    pub fn text(&self) -> &str {
        self.content
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn tool_calls(&self) -> &[ToolCallFragment] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }

    pub fn tool_call_chunks(&self) -> &[ToolCallDelta] {
        self.tool_call_chunks.as_deref().unwrap_or(&[])
    }
}

/// Run context accompanying a chunk in paired events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug)]
pub enum DecodeError {
    /// The transport line is not JSON.
    Json(serde_json::Error),
    /// The chunk element has unexpected field types.
    Chunk(serde_json::Error),
    /// The metadata element has unexpected field types.
    Metadata(serde_json::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(source) => write!(f, "event is not valid JSON: {source}"),
            Self::Chunk(source) => write!(f, "chunk payload is malformed: {source}"),
            Self::Metadata(source) => write!(f, "run metadata is malformed: {source}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(source) | Self::Chunk(source) | Self::Metadata(source) => Some(source),
        }
    }
}

/// Outcome of decoding one transport payload.
#[derive(Debug)]
pub enum Decoded {
    /// A chunk and/or its metadata.
    Event {
        chunk: Option<RawChunk>,
        metadata: Option<RunMetadata>,
    },
    /// Nothing applicable: `null`, scalars, or an empty pair.
    Empty,
    /// The payload could not be decoded.
    Malformed(DecodeError),
}

impl Decoded {
    /// Collapses the outcome into the `(chunk, metadata)` pair; failures become `(None, None)`.
    pub fn into_parts(self) -> (Option<RawChunk>, Option<RunMetadata>) {
        match self {
            Self::Event { chunk, metadata } => (chunk, metadata),
            Self::Empty | Self::Malformed(_) => (None, None),
        }
    }
}

/// Normalizes a raw transport payload.
///
/// Arrays are read as `[chunk, metadata]` pairs, objects as a bare chunk. Any other
/// value is not applicable.
pub fn decode(raw: &Value) -> Decoded {
    let (chunk, metadata) = match raw {
        Value::Array(items) => (
            items.first().filter(|value| !value.is_null()),
            items.get(1).filter(|value| !value.is_null()),
        ),
        Value::Object(_) => (Some(raw), None),
        _ => return Decoded::Empty,
    };
    if chunk.is_none() && metadata.is_none() {
        return Decoded::Empty;
    }

    let chunk = match chunk.map(RawChunk::deserialize).transpose() {
        Ok(chunk) => chunk,
        Err(source) => return Decoded::Malformed(DecodeError::Chunk(source)),
    };
    let metadata = match metadata.map(RunMetadata::deserialize).transpose() {
        Ok(metadata) => metadata,
        Err(source) => return Decoded::Malformed(DecodeError::Metadata(source)),
    };
    Decoded::Event { chunk, metadata }
}

/// Decodes one newline-delimited JSON event.
pub fn decode_line(line: &str) -> Decoded {
    match serde_json::from_str::<Value>(line) {
        Ok(raw) => decode(&raw),
        Err(source) => Decoded::Malformed(DecodeError::Json(source)),
    }
}

/// Whether a chunk carries assistant output that may touch the message list.
pub fn is_assistant_content(chunk: &RawChunk) -> bool {
    chunk.kind.as_deref() == Some(AI_MESSAGE_CHUNK)
        && (!chunk.text().is_empty()
            || !chunk.tool_calls().is_empty()
            || !chunk.tool_call_chunks().is_empty())
}
