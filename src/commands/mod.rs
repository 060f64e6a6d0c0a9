//! Command implementations shared by the `mpstream` and `mpreplay` binaries.

pub mod config;
pub mod replay;
