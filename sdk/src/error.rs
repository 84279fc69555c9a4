//! Error taxonomy for SDK operations

use thiserror::Error;

/// Comprehensive error type for schema and record operations
#[derive(Error, Debug)]
pub enum Error {
    /// Failure surfaced by the transport collaborator. Propagated unchanged
    /// and aborts the in-flight operation and any remaining plan.
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),

    /// The remote service reported one or more errors for the document.
    #[error("remote error: {0}")]
    Remote(String),

    /// A mutation payload carried non-empty user errors.
    #[error("user error: {0}")]
    User(String),

    /// Encode/decode failure in the field codec layer.
    #[error("codec error for '{field_type}': {reason}")]
    Codec {
        field_type: String,
        reason: String,
    },

    /// Schema declaration rejected at build time.
    #[error("schema error: {0}")]
    Schema(String),

    /// A requested field alias is not declared in the schema.
    #[error("unknown field \"{0}\"")]
    UnknownField(String),

    /// No schema entry is declared under the given alias.
    #[error("unknown schema alias \"{0}\"")]
    UnknownAlias(String),

    /// A projection mixed included and excluded fields.
    #[error("projection cannot mix included and excluded fields")]
    MixedProjection,

    /// An empty field selection was supplied.
    #[error("at least one field must be selected")]
    EmptySelection,

    /// An update call carried no changes.
    #[error("at least one update must be specified")]
    EmptyUpdate,

    /// The remote returned a row the SDK cannot interpret.
    #[error("malformed response: {0}")]
    Response(String),
}

impl Error {
    /// Create a Codec error
    pub fn codec<T: AsRef<str>, R: AsRef<str>>(field_type: T, reason: R) -> Self {
        Self::Codec {
            field_type: field_type.as_ref().to_string(),
            reason: reason.as_ref().to_string(),
        }
    }

    /// Create a Schema error
    pub fn schema<R: AsRef<str>>(reason: R) -> Self {
        Self::Schema(reason.as_ref().to_string())
    }

    /// Create a Response error
    pub fn response<R: AsRef<str>>(reason: R) -> Self {
        Self::Response(reason.as_ref().to_string())
    }

    /// Check whether this error was raised locally, before any network call.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::Codec { .. }
                | Self::Schema(_)
                | Self::UnknownField(_)
                | Self::UnknownAlias(_)
                | Self::MixedProjection
                | Self::EmptySelection
                | Self::EmptyUpdate
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Transport(error)
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, Error>;
