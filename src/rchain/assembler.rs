//! Folds streamed chunks into the conversation message list.
//!
//! [`assemble`] is the fail-safe entry point for live render loops: anything that
//! cannot be applied leaves the list as it was. [`try_assemble`] reports why.

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::rchain::chunk::{decode, is_assistant_content, DecodeError, Decoded};
use crate::rchain::messages::Message;
use crate::rchain::run_id::resolve_run_id;
use crate::rchain::tools::merge_tool_calls;

/// Why a payload was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// `null`, scalar or empty payload.
    Empty,
    /// A pair carrying metadata but no chunk.
    MetadataOnly,
    /// A chunk that is not assistant content.
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assembled {
    /// The chunk was folded into a new list.
    Updated(Vec<Message>),
    /// Not applicable; the input list stands.
    Unchanged(Skip),
}

#[derive(Debug)]
pub enum AssembleError {
    Decode(DecodeError),
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(source) => write!(f, "decode failed: {source}"),
        }
    }
}

impl std::error::Error for AssembleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(source) => Some(source),
        }
    }
}

/// Applies one raw payload to `messages`, returning the new list.
///
/// Never fails: rejected, empty and malformed payloads yield an unchanged copy.
pub fn assemble(messages: &[Message], raw: &Value) -> Vec<Message> {
    match try_assemble(messages, raw) {
        Ok(Assembled::Updated(updated)) => updated,
        Ok(Assembled::Unchanged(_)) => messages.to_vec(),
        Err(err) => {
            warn!(error = %err, "dropping chunk");
            messages.to_vec()
        }
    }
}

pub fn try_assemble(messages: &[Message], raw: &Value) -> Result<Assembled, AssembleError> {
    try_assemble_decoded(messages, decode(raw))
}

/// Folds an already decoded payload.
pub fn try_assemble_decoded(
    messages: &[Message],
    decoded: Decoded,
) -> Result<Assembled, AssembleError> {
    let (chunk, metadata) = match decoded {
        Decoded::Event {
            chunk: Some(chunk),
            metadata,
        } => (chunk, metadata),
        Decoded::Event { chunk: None, .. } => return Ok(Assembled::Unchanged(Skip::MetadataOnly)),
        Decoded::Empty => return Ok(Assembled::Unchanged(Skip::Empty)),
        Decoded::Malformed(err) => return Err(AssembleError::Decode(err)),
    };

    if !is_assistant_content(&chunk) {
        debug!(kind = ?chunk.kind, "skipping non-assistant chunk");
        return Ok(Assembled::Unchanged(Skip::Rejected));
    }

    let run_id = resolve_run_id(&chunk, metadata.as_ref());
    let mut updated = messages.to_vec();

    match updated
        .iter_mut()
        .rev()
        .find(|message| message.is_ai() && message.id == run_id)
    {
        Some(message) => {
            let merged = merge_tool_calls(
                message.tool_calls.as_deref().unwrap_or(&[]),
                chunk.tool_calls(),
                chunk.tool_call_chunks(),
            );
            message.content.push_str(chunk.text());
            if message.tool_calls.is_some() || !merged.is_empty() {
                message.tool_calls = Some(merged);
            }
        }
        None => {
            // A fresh message takes complete calls when present, deltas otherwise.
            let tool_calls = if chunk.tool_calls().is_empty() {
                merge_tool_calls(&[], &[], chunk.tool_call_chunks())
            } else {
                merge_tool_calls(&[], chunk.tool_calls(), &[])
            };
            debug!(run_id = %run_id, "starting assistant message");
            updated.push(Message::ai(run_id, chunk.text()).with_tool_calls(tool_calls));
        }
    }

    Ok(Assembled::Updated(updated))
}

#[cfg(test)]
mod tests {
    use super::{assemble, try_assemble, AssembleError, Assembled, Skip};
    use crate::rchain::messages::Message;
    use serde_json::{json, Value};
    use std::thread;
    use std::time::Duration;

    fn fold(chunks: &[Value]) -> Vec<Message> {
        chunks
            .iter()
            .fold(Vec::new(), |messages, raw| assemble(&messages, raw))
    }

    fn text_chunk(id: &str, content: &str) -> Value {
        json!({"id": id, "type": "AIMessageChunk", "content": content})
    }

    #[test]
    fn two_chunks_of_one_run_merge() {
        let messages = fold(&[text_chunk("r1", "Hel"), text_chunk("r1", "lo")]);
        assert_eq!(messages, vec![Message::ai("r1", "Hello")]);
        assert_eq!(
            serde_json::to_value(&messages).expect("messages should serialize"),
            json!([{"id": "r1", "role": "ai", "content": "Hello"}])
        );
    }

    #[test]
    fn content_is_split_invariant() {
        let text = "streaming tokens arrive in order";
        let whole = fold(&[text_chunk("r1", text)]);
        for split in 1..text.len() {
            let (head, tail) = text.split_at(split);
            let pieces = fold(&[text_chunk("r1", head), text_chunk("r1", tail)]);
            assert_eq!(pieces, whole, "split at {split}");
        }
    }

    #[test]
    fn rejected_chunk_leaves_list_unchanged() {
        let messages = vec![Message::human("h1", "hi"), Message::ai("r1", "Hel")];
        let raw = json!({"id": "r1", "type": "HumanMessageChunk", "content": "lo"});
        assert_eq!(assemble(&messages, &raw), messages);
        assert_eq!(
            try_assemble(&messages, &raw).expect("rejection is not an error"),
            Assembled::Unchanged(Skip::Rejected)
        );
    }

    #[test]
    fn empty_and_metadata_only_payloads_are_skipped() {
        let messages = vec![Message::ai("r1", "x")];
        assert_eq!(
            try_assemble(&messages, &json!(null)).expect("empty payload"),
            Assembled::Unchanged(Skip::Empty)
        );
        assert_eq!(
            try_assemble(&messages, &json!([null, {"run_id": "run-1"}])).expect("metadata only"),
            Assembled::Unchanged(Skip::MetadataOnly)
        );
    }

    #[test]
    fn malformed_payload_is_reported_and_degrades() {
        let messages = vec![Message::ai("r1", "x")];
        let raw = json!({"id": 7, "type": "AIMessageChunk", "content": "y"});
        assert!(matches!(try_assemble(&messages, &raw), Err(AssembleError::Decode(_))));
        assert_eq!(assemble(&messages, &raw), messages);
    }

    #[test]
    fn tool_call_without_id_is_appended_and_content_grows() {
        let messages = fold(&[text_chunk("r1", "a")]);
        let raw = json!({
            "id": "r1",
            "type": "AIMessageChunk",
            "content": "b",
            "tool_calls": [{"name": "search", "args": {"q": 1}}]
        });
        let updated = match try_assemble(&messages, &raw).expect("chunk should apply") {
            Assembled::Updated(updated) => updated,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].content, "ab");
        assert!(updated[0].content.starts_with(&messages[0].content));
        let calls = updated[0].tool_calls.as_ref().expect("tool calls should be present");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "tool_call_0");
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].args, json!({"q": 1}));
    }

    #[test]
    fn tool_call_without_id_starts_a_message() {
        let raw = json!({
            "id": "r2",
            "type": "AIMessageChunk",
            "content": "hi",
            "tool_calls": [{"name": "search", "args": {}}]
        });
        let messages = assemble(&[], &raw);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "r2");
        assert_eq!(messages[0].content, "hi");
        let calls = messages[0].tool_calls.as_ref().expect("tool calls should be present");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "tool_call_0");
        assert_eq!(calls[0].args, json!({}));
    }

    #[test]
    fn metadata_run_id_groups_chunks() {
        let messages = fold(&[
            json!([{"type": "AIMessageChunk", "content": "a"}, {"run_id": "run-1"}]),
            json!([{"type": "AIMessageChunk", "content": "b"}, {"run_id": "run-1"}]),
        ]);
        assert_eq!(messages, vec![Message::ai("ai-run-1", "ab")]);
    }

    #[test]
    fn interleaved_runs_keep_first_appearance_order() {
        let messages = fold(&[
            text_chunk("r1", "a"),
            text_chunk("r2", "x"),
            text_chunk("r1", "b"),
            text_chunk("r2", "y"),
        ]);
        assert_eq!(messages, vec![Message::ai("r1", "ab"), Message::ai("r2", "xy")]);
    }

    #[test]
    fn existing_non_ai_message_with_same_id_is_not_merged() {
        let messages = vec![Message::human("r1", "question")];
        let updated = assemble(&messages, &text_chunk("r1", "answer"));
        assert_eq!(updated, vec![Message::human("r1", "question"), Message::ai("r1", "answer")]);
    }

    #[test]
    fn fallback_ids_do_not_merge() {
        let chunk = json!({"type": "AIMessageChunk", "content": "part"});
        let first = assemble(&[], &chunk);
        thread::sleep(Duration::from_millis(5));
        let second = assemble(&first, &chunk);

        assert_eq!(second.len(), 2);
        assert_ne!(second[0].id, second[1].id);
        assert!(second.iter().all(|message| message.id.starts_with("ai-response-")));
        assert!(second.iter().all(|message| message.content == "part"));
    }

    #[test]
    fn tool_call_deltas_across_chunks_compact_by_slot() {
        let delta = |index: usize, id: &str, args: &str| {
            json!({
                "id": "r1",
                "type": "AIMessageChunk",
                "content": "",
                "tool_call_chunks": [{"index": index, "id": id, "name": format!("tool_{index}"), "args": args}]
            })
        };
        let messages = fold(&[delta(2, "c", "{}"), delta(0, "a", "{}"), delta(1, "b", "{}")]);
        assert_eq!(messages.len(), 1);
        let calls = messages[0].tool_calls.as_ref().expect("tool calls should be present");
        let ids = calls.iter().map(|call| call.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(calls.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn streamed_arguments_accumulate_on_one_call() {
        let messages = fold(&[
            json!({
                "id": "r1",
                "type": "AIMessageChunk",
                "content": "Let me check.",
                "tool_call_chunks": [{"index": 0, "id": "call_1", "name": "weather", "args": "{\"ci"}]
            }),
            json!({
                "id": "r1",
                "type": "AIMessageChunk",
                "tool_call_chunks": [{"index": 0, "args": "ty\":\"Oslo\"}"}]
            }),
        ]);
        let calls = messages[0].tool_calls.as_ref().expect("tool calls should be present");
        assert_eq!(messages[0].content, "Let me check.");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "weather");
        assert_eq!(calls[0].args, json!("{\"city\":\"Oslo\"}"));
        assert_eq!(calls[0].parsed_args(), Some(json!({"city": "Oslo"})));
    }

    #[test]
    fn new_message_prefers_full_tool_calls_over_deltas() {
        let messages = fold(&[json!({
            "id": "r1",
            "type": "AIMessageChunk",
            "tool_calls": [{"id": "call_1", "name": "search", "args": {"q": "rust"}, "type": "tool_call"}],
            "tool_call_chunks": [{"index": 0, "id": "call_1", "name": "search", "args": "{\"q\":\"rust\"}"}]
        })]);
        let calls = messages[0].tool_calls.as_ref().expect("tool calls should be present");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, json!({"q": "rust"}));
    }

    #[test]
    fn repeated_full_tool_call_updates_in_place() {
        let chunk = json!({
            "id": "r1",
            "type": "AIMessageChunk",
            "tool_calls": [{"id": "call_1", "name": "search", "args": {"q": "rust"}}]
        });
        let messages = fold(&[chunk.clone(), chunk]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].tool_calls.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn input_list_is_not_mutated() {
        let messages = vec![Message::ai("r1", "a")];
        let updated = assemble(&messages, &text_chunk("r1", "b"));
        assert_eq!(messages, vec![Message::ai("r1", "a")]);
        assert_eq!(updated, vec![Message::ai("r1", "ab")]);
    }
}
