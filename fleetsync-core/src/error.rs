//! Error types for fleet operations.

use std::time::Duration;

use thiserror::Error;

/// Failures of the underlying remote call.
///
/// Produced by [`FleetApi`](crate::api::FleetApi) implementations; the core
/// never retries them.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("fleet API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect, TLS, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True when the service reported the object as missing.
    pub fn is_missing(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Errors returned by resolution, convergence, waiting and composition.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The identifier matched no element of a successfully fetched collection.
    #[error("{kind} not found: {identifier}")]
    NotFound {
        kind: &'static str,
        identifier: String,
    },

    /// A remote call failed.
    #[error("transport: {0}")]
    Transport(#[from] ApiError),

    /// A polled lifecycle state was neither pending nor target.
    #[error("unexpected {kind} state: {state}")]
    UnexpectedState { kind: &'static str, state: String },

    /// The wait deadline elapsed while the state was still pending.
    #[error("timed out after {elapsed:?} waiting for {kind}, last state: {last_state}")]
    Timeout {
        kind: &'static str,
        last_state: String,
        elapsed: Duration,
    },

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// A composed operation failed at the named step.
    #[error("{step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<FleetError>,
    },
}

impl FleetError {
    /// Returns the innermost error, peeling off step wrappers.
    pub fn root(&self) -> &FleetError {
        match self {
            FleetError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), FleetError::NotFound { .. })
    }

    /// Name of the outermost failed step, if any.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            FleetError::Step { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Result type for fleet operations.
pub type Result<T> = std::result::Result<T, FleetError>;

/// Attaches the name of the failing step to an error.
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T>;
}

impl<T, E: Into<FleetError>> StepContext<T> for std::result::Result<T, E> {
    fn step(self, step: &'static str) -> Result<T> {
        self.map_err(|e| FleetError::Step {
            step,
            source: Box::new(e.into()),
        })
    }
}
