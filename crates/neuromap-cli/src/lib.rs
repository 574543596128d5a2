//! neuromap CLI crate
//!
//! Purpose:
//! - Drive `neuromap-connect` from a projection description on disk.
//! - Write generated synaptic blocks in the device block-file format, or as
//!   JSON / bincode for offline analysis.
//!
//! Commands (see [commands]):
//! - init: write an example projection config.
//! - bounds: report per-post-slice capacity bounds as JSON.
//! - generate: build every slice pair's block, sequentially from one random
//!   cursor or in parallel from per-pair streams.
//! - inspect: decode a block file, verify its checksums and summarise it.
//!
//! The binary (src/main.rs) installs the tracing subscriber and calls
//! [`NeuromapCli::execute`]; the library surface exists so commands can be
//! exercised from tests without spawning a process.

pub mod commands;
pub mod config;
pub mod error;

pub use commands::NeuromapCli;
