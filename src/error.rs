//! Error taxonomy: each kind below is non-fatal unless its doc comment
//! says otherwise. Call sites that only need to bubble an error up to a
//! `main` or a CLI layer use `anyhow::Result` with `.context(...)`
//! instead; these enums exist for the sites that must branch on *which*
//! kind of failure happened.

use thiserror::Error;

/// Fatal at startup: CLI parsing, missing directories, bad endpoint syntax.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid command line: {0}")]
    InvalidArgs(String),
    #[error("unexpected extra arguments: {0:?}")]
    ExtraArgs(Vec<String>),
    #[error("data directory does not exist: {0}")]
    MissingDataDir(String),
    #[error("invalid transport endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("failed to read config file {path:?}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    ParseFile {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Non-monotone OID, or an I/O failure while scanning a record file. Fatal
/// for the one data file it occurred in; the file is skipped.
#[derive(Debug, Error)]
pub enum IndexBuildError {
    #[error("record file is not sorted: {prev} is not less than {next} at offset {offset}")]
    NotMonotone {
        prev: String,
        next: String,
        offset: u64,
    },
    #[error("I/O error building index for {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("refinement loop exceeded {0} iterations; index may be corrupt")]
    RefinementLoopBound(usize),
}

/// Grammar or decode failure for a single record line. Logged and answered
/// with the request's default error status; never poisons the batch.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed record line: {0:?}")]
    BadRecord(String),
    #[error("value does not match tag {tag}: {value:?}")]
    BadValue { tag: u32, value: String },
    #[error("variation module {0:?} referenced but not loaded")]
    UnknownVariation(String),
}

/// Raised by a variation module (or internally) to silently drop the
/// whole in-flight request. Modeled as a typed outcome rather than a
/// thrown exception, so it is a value, not an `Error` impl used for
/// stack unwinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoDataNotification;

/// Failure sending an encoded response datagram. Logged; the dispatch
/// loop continues.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send failed on {endpoint}: {source}")]
    Send {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bind failed on {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}
