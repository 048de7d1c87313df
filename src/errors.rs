//! Telemetry Monitor Error Hierarchy
//!
//! Errors are split by the stage of the watch pipeline that produced them:
//! path resolution, transport (dial / stream open / send), and protocol
//! (malformed notifications). Timeouts and caller cancellation are not
//! errors; they are reported as [`crate::WatchOutcome`] values.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A path descriptor could not be reduced to a wire path
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Connection, stream open or request send failures
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed notifications received on a subscription
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Collector registration failures
    #[error(transparent)]
    Metrics(#[from] prometheus::Error),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// A recurring timer was given a zero period
    #[error("Zero period for recurring task {task}")]
    ZeroPeriod { task: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Path element {index} has an empty name in {path}")]
    EmptyElement { index: usize, path: String },

    #[error("Empty key name on element {elem}")]
    EmptyKeyName { elem: String },

    #[error("Duplicate key {key} on element {elem}")]
    DuplicateKey { elem: String, key: String },

    #[error("Malformed key selector {selector:?} on element {elem}")]
    MalformedKey { elem: String, selector: String },

    #[error("Unbalanced brackets in path {0:?}")]
    UnbalancedBrackets(String),

    #[error("Path {0:?} is not absolute")]
    NotAbsolute(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Dialing the device failed
    #[error("Failed to connect to {address}: {message}")]
    Connect { address: String, message: String },

    /// Malformed device address
    #[error("Invalid URI format: {0}")]
    InvalidUri(String),

    /// The device rejected or aborted an RPC
    #[error("gNMI {method} failed: {status}")]
    Rpc {
        method: &'static str,
        status: tonic::Status,
    },

    /// The subscription request could not be written to the stream
    #[error("Failed to send {request_type} request: {message}")]
    RequestSendFailure {
        request_type: &'static str,
        message: String,
    },

    /// Request metadata could not be encoded as gRPC metadata
    #[error("Invalid request metadata {key}: {message}")]
    InvalidMetadata { key: String, message: String },

    /// Receive failure on an already-open stream
    #[error("Error receiving gNMI response: {0}")]
    Receive(tonic::Status),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid nil path in update at index {index}")]
    NilUpdatePath { index: usize },

    #[error("Invalid nil value in update at path {path}")]
    NilUpdateValue { path: String },

    #[error("Unexpected delete updates: {paths:?}")]
    UnexpectedDeletes { paths: Vec<String> },

    #[error("Prefix origin {prefix:?} conflicts with path origin {path:?}")]
    OriginConflict { prefix: String, path: String },

    #[error("Unexpected response: empty SubscribeResponse")]
    EmptyResponse,
}

/// Terminal failure of one watcher, kept clonable so every caller of
/// [`crate::Watcher::outcome`] observes the same value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WatchFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The watch task ended without reporting an outcome
    #[error("Watch task aborted: {0}")]
    Aborted(String),
}

impl From<WatchFailure> for Error {
    fn from(failure: WatchFailure) -> Self {
        match failure {
            WatchFailure::Transport(e) => Error::Transport(e),
            WatchFailure::Protocol(e) => Error::Protocol(e),
            WatchFailure::Aborted(msg) => Error::TaskFailed(msg),
        }
    }
}
