//! Incremental assembly of streamed assistant output.
//!
//! Raw transport events flow through [`chunk::decode`], the
//! [`chunk::is_assistant_content`] gate and [`run_id::resolve_run_id`] into
//! [`assembler::assemble`], which folds them into a [`messages::Message`] list.
//! [`throttle::UpdateThrottle`] paces the resulting render notifications.

/// Folding chunks into the message list.
pub mod assembler;
/// Transport payload types, decoding and the assistant-content gate.
pub mod chunk;
/// Conversation message types.
pub mod messages;
/// Run identity resolution.
pub mod run_id;
/// Trailing-edge debounce for render notifications.
pub mod throttle;
/// Tool call records and their merge rules.
pub mod tools;
