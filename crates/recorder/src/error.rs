use thiserror::Error;

/// Result of applying a configuration directive.
///
/// Intentionally not a `Result<(), ConfigError>`: invalid directives are
/// reported but do not abort the remaining directives in a `trace_set`
/// call, so the caller needs the per-directive outcome rather than a single
/// pass/fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSetOutcome {
    Ok,
    InvalidName,
    InvalidValue,
}

/// Errors raised while compiling or applying one configuration directive.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("directive name {name:?} is not a valid extended regular expression: {source}")]
    InvalidName {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("directive {directive:?} has trailing garbage after its integer value")]
    InvalidValue { directive: String },
}

impl ConfigError {
    pub fn outcome(&self) -> TraceSetOutcome {
        match self {
            ConfigError::InvalidName { .. } => TraceSetOutcome::InvalidName,
            ConfigError::InvalidValue { .. } => TraceSetOutcome::InvalidValue,
        }
    }
}

/// Errors raised opening, growing, or mapping a shared-memory channel set.
///
/// None of these are fatal to the process: the emit path simply disables
/// export for the affected channel, and `chans_open`/`chans_new` return
/// this error to the caller instead of a handle.
#[derive(Debug, Error)]
pub enum ShmError {
    #[error("failed to open shared-memory backing file {path:?}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to extend shared-memory backing file to {target_len} bytes: {source}")]
    Extend {
        target_len: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("mmap failed: {source}")]
    Map {
        #[source]
        source: std::io::Error,
    },
    #[error("channel set header magic mismatch: expected {expected:#x}, found {found:#x}")]
    MagicMismatch { expected: u64, found: u64 },
    #[error("channel set header version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("no channel found matching pattern {pattern:?}")]
    ChannelNotFound { pattern: String },
}
