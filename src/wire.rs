//! OCPP-J wire framing: encode/decode of Call, CallResult and CallError frames.
//!
//! Frames are JSON arrays discriminated by their first element (the
//! MessageType):
//! - Call: `[2, messageId, commandName, payload]`
//! - CallResult: `[3, messageId, payload]`
//! - CallError: `[4, messageId, errorCode, errorDescription, errorDetails]`

use crate::error::{ErrorType, OcppError};
use serde_json::Value;
use uuid::Uuid;

const MESSAGE_TYPE_CALL: u64 = 2;
const MESSAGE_TYPE_CALL_RESULT: u64 = 3;
const MESSAGE_TYPE_CALL_ERROR: u64 = 4;

/// A decoded OCPP-J frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Call {
        message_id: String,
        command: String,
        payload: Value,
    },
    CallResult {
        message_id: String,
        payload: Value,
    },
    CallError {
        message_id: String,
        error_type: String,
        error_description: String,
        error_details: Value,
    },
}

impl Frame {
    pub fn message_id(&self) -> &str {
        match self {
            Frame::Call { message_id, .. }
            | Frame::CallResult { message_id, .. }
            | Frame::CallError { message_id, .. } => message_id,
        }
    }

    /// Generate a fresh MessageId for an outbound Call (UUID v4, per §4.A).
    pub fn new_message_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn call(command: impl Into<String>, payload: Value) -> Self {
        Frame::Call {
            message_id: Self::new_message_id(),
            command: command.into(),
            payload,
        }
    }

    pub fn call_result(message_id: impl Into<String>, payload: Value) -> Self {
        Frame::CallResult {
            message_id: message_id.into(),
            payload,
        }
    }

    pub fn call_error(
        message_id: impl Into<String>,
        error_type: ErrorType,
        error_description: impl Into<String>,
    ) -> Self {
        Frame::CallError {
            message_id: message_id.into(),
            error_type: error_type.to_string(),
            error_description: error_description.into(),
            error_details: Value::Object(Default::default()),
        }
    }

    /// Encode to the JSON-array wire representation.
    pub fn encode(&self) -> Value {
        match self {
            Frame::Call {
                message_id,
                command,
                payload,
            } => Value::Array(vec![
                Value::from(MESSAGE_TYPE_CALL),
                Value::from(message_id.clone()),
                Value::from(command.clone()),
                payload.clone(),
            ]),
            Frame::CallResult {
                message_id,
                payload,
            } => Value::Array(vec![
                Value::from(MESSAGE_TYPE_CALL_RESULT),
                Value::from(message_id.clone()),
                payload.clone(),
            ]),
            Frame::CallError {
                message_id,
                error_type,
                error_description,
                error_details,
            } => Value::Array(vec![
                Value::from(MESSAGE_TYPE_CALL_ERROR),
                Value::from(message_id.clone()),
                Value::from(error_type.clone()),
                Value::from(error_description.clone()),
                error_details.clone(),
            ]),
        }
    }

    /// Encode directly to a wire string, ready to send over the socket.
    pub fn encode_to_string(&self) -> Result<String, OcppError> {
        serde_json::to_string(&self.encode())
            .map_err(|e| OcppError::ProtocolError(format!("failed to serialize frame: {e}")))
    }

    /// Decode a raw text frame into a [Frame]. Rejects anything that is not a
    /// JSON array of the arity expected for its discriminant.
    pub fn decode(text: &str) -> Result<Self, OcppError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| OcppError::ProtocolError(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, OcppError> {
        let arr = match value {
            Value::Array(a) => a,
            other => {
                return Err(OcppError::ProtocolError(format!(
                    "frame is not a JSON array: {other}"
                )))
            }
        };

        let message_type = arr
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| OcppError::ProtocolError("missing message type".into()))?;

        match message_type {
            MESSAGE_TYPE_CALL => {
                if arr.len() != 4 {
                    return Err(OcppError::ProtocolError(format!(
                        "Call frame must have 4 elements, got {}",
                        arr.len()
                    )));
                }
                let message_id = as_string(&arr[1], "messageId")?;
                let command = as_string(&arr[2], "command")?;
                Ok(Frame::Call {
                    message_id,
                    command,
                    payload: arr[3].clone(),
                })
            }
            MESSAGE_TYPE_CALL_RESULT => {
                if arr.len() != 3 {
                    return Err(OcppError::ProtocolError(format!(
                        "CallResult frame must have 3 elements, got {}",
                        arr.len()
                    )));
                }
                let message_id = as_string(&arr[1], "messageId")?;
                Ok(Frame::CallResult {
                    message_id,
                    payload: arr[2].clone(),
                })
            }
            MESSAGE_TYPE_CALL_ERROR => {
                if arr.len() != 5 {
                    return Err(OcppError::ProtocolError(format!(
                        "CallError frame must have 5 elements, got {}",
                        arr.len()
                    )));
                }
                let message_id = as_string(&arr[1], "messageId")?;
                let error_type = as_string(&arr[2], "errorCode")?;
                let error_description = as_string(&arr[3], "errorDescription")?;
                Ok(Frame::CallError {
                    message_id,
                    error_type,
                    error_description,
                    error_details: arr[4].clone(),
                })
            }
            other => Err(OcppError::ProtocolError(format!(
                "unknown message type {other}"
            ))),
        }
    }

    /// Try to recover a MessageId from a frame that otherwise failed to
    /// decode, so the dispatcher can still send back a CallError (§4.G).
    pub fn recover_message_id(text: &str) -> Option<String> {
        let value: Value = serde_json::from_str(text).ok()?;
        let arr = value.as_array()?;
        if arr.first()?.as_u64()? == MESSAGE_TYPE_CALL {
            arr.get(1)?.as_str().map(str::to_owned)
        } else {
            None
        }
    }
}

fn as_string(value: &Value, field: &str) -> Result<String, OcppError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| OcppError::ProtocolError(format!("{field} is not a string")))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_call() {
        let frame = Frame::Call {
            message_id: "abc".into(),
            command: "Heartbeat".into(),
            payload: json!({}),
        };
        let decoded = Frame::decode(&frame.encode_to_string().unwrap()).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn round_trips_call_result() {
        let frame = Frame::CallResult {
            message_id: "abc".into(),
            payload: json!({"status": "Accepted"}),
        };
        let decoded = Frame::decode(&frame.encode_to_string().unwrap()).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn round_trips_call_error() {
        let frame = Frame::call_error("abc", ErrorType::NotImplemented, "nope");
        let decoded = Frame::decode(&frame.encode_to_string().unwrap()).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(Frame::decode(r#"[2, "abc", "Heartbeat"]"#).is_err());
    }

    #[test]
    fn rejects_non_array() {
        assert!(Frame::decode(r#"{"foo":"bar"}"#).is_err());
    }

    #[test]
    fn recovers_message_id_from_malformed_call() {
        let id = Frame::recover_message_id(r#"[2, "m7", "DoesNotExist"]"#);
        assert_eq!(id.as_deref(), Some("m7"));
    }
}
