//! Typed decode errors for kernel payloads.

use thiserror::Error;

/// A kernel payload did not match the wire schema.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not a JSON object.
    #[error("comm payload is not a JSON object")]
    NotAnObject,

    /// A required envelope field is absent or not a string.
    #[error("comm payload is missing string field '{0}'")]
    MissingField(&'static str),

    /// The body of a known operation has the wrong shape.
    #[error("invalid '{operation}' payload: {source}")]
    InvalidBody {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
}
