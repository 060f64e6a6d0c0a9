//! Streaming message assembly for live chat rendering.

pub mod commands;
pub mod config;
pub mod logging;
pub mod rchain;

/// Crate version with the git revision and build timestamp.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("MP_GIT_SHA"),
    ", built ",
    env!("MP_BUILD_TS"),
    ")"
);
