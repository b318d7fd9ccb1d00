//! Saga error types.

use serde::Serialize;
use thiserror::Error;

use crate::state::SagaState;

/// Body of a failed downstream response.
///
/// Downstream services answer with either a machine-readable JSON payload or
/// plain text; both are kept so the log line carries what the service said.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    Structured(serde_json::Value),
    Text(String),
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPayload::Structured(value) => write!(f, "{value}"),
            ErrorPayload::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Failures of a single call to a downstream service.
///
/// Step handlers turn these into state transitions; they never reach the
/// engine as errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service answered with a non-success status.
    #[error("{operation} returned status {status}: {payload}")]
    Status {
        operation: &'static str,
        status: u16,
        payload: ErrorPayload,
    },

    /// The call did not complete within the configured timeout.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// Connection or protocol failure before a response was received.
    #[error("{operation} failed: {reason}")]
    Transport {
        operation: &'static str,
        reason: String,
    },

    /// The response body could not be decoded.
    #[error("{operation} returned a malformed response: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
    },

    /// A field the saga depends on is absent from the response.
    #[error("{operation} response has no '{field}' field")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    /// A field is present but cannot be interpreted.
    #[error("{operation} response has an invalid '{field}' field: {value}")]
    InvalidField {
        operation: &'static str,
        field: &'static str,
        value: String,
    },

    /// The service is unavailable (used by the in-memory services).
    #[error("{operation} unavailable: {reason}")]
    Unavailable {
        operation: &'static str,
        reason: String,
    },
}

/// Errors that can occur while building or running a saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The inbound order request is missing a required field.
    #[error("Invalid order request: {0}")]
    Validation(String),

    /// No handler is registered for a non-terminal state.
    #[error("No handler registered for state {0}")]
    UnregisteredState(SagaState),

    /// Two handlers claim the same state.
    #[error("State {0} is claimed by more than one handler")]
    DuplicateHandler(SagaState),

    /// A handler declared a state of the wrong kind for its role.
    #[error("Handler '{step}' cannot be registered for state {state}")]
    InvalidRegistration { step: &'static str, state: SagaState },

    /// A handler returned a state that is not reachable from the current one.
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: SagaState, to: SagaState },

    /// The step being compensated is not the one registered for the state.
    #[error("Compensation state {state} does not belong to step '{step}'")]
    CompensationMismatch { state: SagaState, step: &'static str },

    /// A step handler panicked while executing or compensating.
    #[error("Step '{step}' panicked")]
    HandlerPanicked { step: &'static str },

    /// The compensation walk ran out of steps before reaching a terminal state.
    #[error("Compensation stopped in non-terminal state {0}")]
    StalledCompensation(SagaState),

    /// Downstream service error.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_includes_payload() {
        let err = ServiceError::Status {
            operation: "decrease stock",
            status: 409,
            payload: ErrorPayload::Structured(serde_json::json!({"error": "out of stock"})),
        };
        assert_eq!(
            err.to_string(),
            r#"decrease stock returned status 409: {"error":"out of stock"}"#
        );
    }

    #[test]
    fn test_text_payload_display() {
        let err = ServiceError::Status {
            operation: "create payment",
            status: 502,
            payload: ErrorPayload::Text("Bad Gateway".to_string()),
        };
        assert_eq!(err.to_string(), "create payment returned status 502: Bad Gateway");
    }

    #[test]
    fn test_illegal_transition_message() {
        let err = SagaError::IllegalTransition {
            from: SagaState::DecreasingStock,
            to: SagaState::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Illegal transition from DecreasingStock to Completed"
        );
    }
}
