//! Error handling

use derive_builder::UninitializedFieldError;
use ocpp_json_validate::JsonValidateError;
use thiserror::Error;
use validator::ValidationErrors;

/// Wire-level error codes, exhaustive for OCPP 1.6 (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ErrorType {
    NotImplemented,
    NotSupported,
    InternalError,
    ProtocolError,
    SecurityError,
    FormationViolation,
    FormatViolation,
    PropertyConstraintViolation,
    OccurrenceConstraintViolation,
    TypeConstraintViolation,
    GenericError,
}

#[derive(Error, Debug)]
/// Errors that can occur anywhere in the session engine
pub enum OcppError {
    #[error("Field missing from builder")]
    /// Error resultant from a missing field when building an OCPP object
    BuilderError(#[from] UninitializedFieldError),
    #[error("Struct is invalid")]
    /// Error resultant from bad field when building an OCPP object
    OcppValidationError(#[from] ValidationErrors),
    #[error("{0} failed JSON schema validation")]
    /// A request or response payload failed its per-command JSON schema
    SchemaViolation(&'static str, #[source] JsonValidateError),
    /// A peer sent back a CallError for one of our Calls
    #[error("peer rejected {command} with {error_type}: {description}")]
    Rejected {
        command: &'static str,
        error_type: ErrorType,
        description: String,
    },
    /// A Call was not admitted by the registration state machine
    #[error("{command} not admitted while registration state is {state}")]
    NotAdmitted { command: &'static str, state: String },
    /// Transport-level failure: send error, handshake failure, or timeout
    #[error("transport error: {0}")]
    Transport(String),
    /// A response never arrived before the per-send timeout elapsed
    #[error("no response for {0} before timeout")]
    Timeout(&'static str),
    /// The station was stopped while a Call was outstanding
    #[error("station stopped while awaiting response")]
    Stopped,
    /// An inbound frame could not be decoded as a Call/CallResult/CallError
    #[error("malformed frame: {0}")]
    ProtocolError(String),
    /// No handler registered for an inbound command name
    #[error("no handler for command {0}")]
    NotImplemented(String),
    /// Internal invariant violation: missing template, undefined divider, etc.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OcppError {
    /// Map this error onto the wire `ErrorType` it should be reported as,
    /// when it originates from or must be reported as a CallError.
    pub fn error_type(&self) -> ErrorType {
        match self {
            OcppError::BuilderError(_) | OcppError::OcppValidationError(_) => {
                ErrorType::FormationViolation
            }
            OcppError::SchemaViolation(..) => ErrorType::FormatViolation,
            OcppError::Rejected { error_type, .. } => *error_type,
            OcppError::NotAdmitted { .. } => ErrorType::SecurityError,
            OcppError::Transport(_) | OcppError::Timeout(_) => ErrorType::GenericError,
            OcppError::Stopped => ErrorType::GenericError,
            OcppError::ProtocolError(_) => ErrorType::ProtocolError,
            OcppError::NotImplemented(_) => ErrorType::NotImplemented,
            OcppError::Internal(_) => ErrorType::InternalError,
        }
    }
}
