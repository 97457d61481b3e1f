//! Error types for wire decoding.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtoError`].
pub type Result<T, E = ProtoError> = std::result::Result<T, E>;

/// Errors raised while decoding platform payloads.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The payload was not valid JSON or did not match the expected shape.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A field required by the event kind was absent or had the wrong type.
    #[error("{kind} is missing field `{field}`")]
    MissingField {
        /// Event or payload kind being decoded.
        kind: String,
        /// Name of the absent field.
        field: &'static str,
    },
}

impl ProtoError {
    pub(crate) fn missing(kind: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            kind: kind.into(),
            field,
        }
    }
}
