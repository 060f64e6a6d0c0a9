use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rchain::chunk::{ToolCallDelta, ToolCallFragment};

/// Discriminator carried by every record on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallKind {
    #[default]
    ToolCall,
}

/// Tool call being assembled for an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Provider-generated call id, or `tool_call_<slot>` when none was streamed.
    pub id: String,
    /// Tool/function name.
    #[serde(default)]
    pub name: String,
    /// Arguments payload: a parsed value, or a string accumulator fed by deltas.
    #[serde(default)]
    pub args: Value,
    #[serde(default, rename = "type")]
    pub kind: ToolCallKind,
    /// Declared slot inside the owning message. Not part of the wire shape; records
    /// read back without it are re-slotted in order.
    #[serde(default, skip_serializing)]
    pub index: usize,
}

impl ToolCallRecord {
    fn from_fragment(fragment: &ToolCallFragment, slot: usize) -> Self {
        Self {
            id: fragment
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("tool_call_{slot}")),
            name: fragment.name.clone().unwrap_or_default(),
            args: fragment.args.clone().unwrap_or(Value::Null),
            kind: ToolCallKind::ToolCall,
            index: slot,
        }
    }

    fn from_delta(delta: &ToolCallDelta, slot: usize) -> Self {
        Self {
            id: delta
                .id
                .clone()
                .unwrap_or_else(|| format!("tool_call_{slot}")),
            name: delta.name.clone().unwrap_or_default(),
            args: Value::String(delta.args.clone().unwrap_or_default()),
            kind: ToolCallKind::ToolCall,
            index: slot,
        }
    }

    /// Incoming name wins when present; string args concatenate, other args replace.
    fn merge_fragment(&mut self, fragment: &ToolCallFragment) {
        if let Some(name) = &fragment.name {
            self.name = name.clone();
        }
        match (&mut self.args, &fragment.args) {
            (Value::String(existing), Some(Value::String(incoming))) => {
                existing.push_str(incoming);
            }
            (existing, Some(incoming)) => *existing = incoming.clone(),
            (_, None) => {}
        }
    }

    fn append_args(&mut self, fragment: &str) {
        let mut text = match std::mem::take(&mut self.args) {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        text.push_str(fragment);
        self.args = Value::String(text);
    }

    /// Arguments rendered as text, the way providers put them on the wire.
    pub fn args_as_string(&self) -> String {
        match &self.args {
            Value::String(value) => value.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Arguments as a structured value, once the accumulated text is complete JSON.
    pub fn parsed_args(&self) -> Option<Value> {
        match &self.args {
            Value::String(raw) => serde_json::from_str(raw).ok(),
            Value::Null => None,
            other => Some(other.clone()),
        }
    }
}

/// Records keyed by slot, read back dense and in slot order.
#[derive(Debug, Default)]
struct ToolCallSlots {
    slots: BTreeMap<usize, ToolCallRecord>,
}

impl ToolCallSlots {
    fn from_records(records: &[ToolCallRecord]) -> Self {
        let mut slots = Self::default();
        for record in records {
            let mut record = record.clone();
            if slots.slots.contains_key(&record.index) {
                record.index = slots.next_slot();
            }
            slots.slots.insert(record.index, record);
        }
        slots
    }

    fn next_slot(&self) -> usize {
        self.slots
            .last_key_value()
            .map_or(0, |(slot, _)| slot + 1)
    }

    /// Merges by id; a call without an id never matches and takes the next slot.
    fn merge_full(&mut self, fragment: &ToolCallFragment) {
        let existing = fragment
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .and_then(|id| self.slots.values_mut().find(|record| record.id == id));
        match existing {
            Some(record) => record.merge_fragment(fragment),
            None => {
                let slot = self.next_slot();
                self.slots
                    .insert(slot, ToolCallRecord::from_fragment(fragment, slot));
            }
        }
    }

    fn merge_delta(&mut self, delta: &ToolCallDelta) {
        let slot = delta.index.unwrap_or(0);
        match self.slots.get_mut(&slot) {
            Some(record) => record.append_args(delta.args.as_deref().unwrap_or("")),
            None => {
                self.slots.insert(slot, ToolCallRecord::from_delta(delta, slot));
            }
        }
    }

    fn into_records(self) -> Vec<ToolCallRecord> {
        self.slots.into_values().collect()
    }
}

/// Folds complete tool calls and argument deltas into `existing`.
///
/// Complete calls merge by id, deltas by declared slot. The result is dense and
/// ordered by slot.
pub fn merge_tool_calls(
    existing: &[ToolCallRecord],
    incoming_full: &[ToolCallFragment],
    incoming_deltas: &[ToolCallDelta],
) -> Vec<ToolCallRecord> {
    let mut slots = ToolCallSlots::from_records(existing);
    for fragment in incoming_full {
        slots.merge_full(fragment);
    }
    for delta in incoming_deltas {
        slots.merge_delta(delta);
    }
    slots.into_records()
}
