use std::time::{SystemTime, UNIX_EPOCH};

use crate::rchain::chunk::{RawChunk, RunMetadata};

/// Resolves the key grouping chunks of one generation run.
///
/// Precedence: `chunk.id`, then `"ai-" + metadata.run_id`, then
/// `"ai-response-<unix millis>"`. The last form is fresh on every call, so chunks
/// carrying neither identifier never merge into an existing message.
pub fn resolve_run_id(chunk: &RawChunk, metadata: Option<&RunMetadata>) -> String {
    resolve_run_id_with(chunk, metadata, now_millis)
}

/// Same as [`resolve_run_id`] with an explicit clock for the fallback id.
pub fn resolve_run_id_with(
    chunk: &RawChunk,
    metadata: Option<&RunMetadata>,
    now: impl FnOnce() -> u128,
) -> String {
    if let Some(id) = chunk.id.as_deref().filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    if let Some(run_id) = metadata
        .and_then(|metadata| metadata.run_id.as_deref())
        .filter(|run_id| !run_id.is_empty())
    {
        return format!("ai-{run_id}");
    }
    format!("ai-response-{}", now())
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
