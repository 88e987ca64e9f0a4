use std::path::PathBuf;

use thiserror::Error;

/// Failures of the instrumentation pass.
///
/// Every variant is local-fatal: the pass aborts the current translation
/// unit before mutating its IR, and the build system decides whether to
/// retry or fail the build.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("compile-info database `{path}` is malformed: {source}")]
    Database {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid instrumentation mode: `{0}` (expected `ignore` or `normal`)")]
    InvalidMode(String),

    #[error("module `{module}` targets a {bits}-bit pointer width, expected 64")]
    PointerWidth { module: String, bits: u32 },

    #[error("module `{module}` is big-endian, expected little-endian")]
    BigEndian { module: String },

    #[error("function `{function}` contains a prohibited `{construct}` instruction")]
    ProhibitedConstruct { function: String, construct: String },

    #[error("module declares non-leaf intrinsic `{name}`")]
    NonLeafIntrinsic { name: String },

    #[error("hook-mark sentinel `{symbol}` already appears in `{context}`")]
    SentinelPresent { symbol: String, context: String },

    #[error(transparent)]
    Ir(#[from] racer_ir::Error),
}
