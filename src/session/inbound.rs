//! Inbound Dispatcher (§4.G): routes an incoming Call to its command
//! handler, and an incoming CallResult/CallError to the matching cache
//! entry.

use serde_json::Value;
use strum_macros::{Display, EnumString};
use tracing::{debug, warn};

use crate::cache::RequestCache;
use crate::error::OcppError;
use crate::validator::SchemaValidator;
use crate::wire::Frame;

/// The minimum command set handled inbound for 1.6-J (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum InboundCommand {
    Reset,
    ClearCache,
    ChangeAvailability,
    UnlockConnector,
    GetConfiguration,
    ChangeConfiguration,
    SetChargingProfile,
    ClearChargingProfile,
    RemoteStartTransaction,
    RemoteStopTransaction,
    GetDiagnostics,
    TriggerMessage,
}

/// The result of a command handler: either a response payload to return as
/// a CallResult, or an application-level error to return as a CallError.
pub type HandlerResult = Result<Value, OcppError>;

/// What the dispatcher decided to do with one inbound frame; the caller
/// (station actor) uses this to decide what, if anything, to send back.
pub enum DispatchOutcome {
    /// Send this encoded CallResult/CallError frame back to the peer.
    Reply(Frame),
    /// A CallResult/CallError was routed to a cache entry; nothing to send.
    Resolved,
    /// Nothing to do (e.g. a CallResult/CallError with no matching entry).
    None,
}

pub struct Dispatcher;

impl Dispatcher {
    /// Decode and route one inbound text frame.
    ///
    /// `handle` is invoked for inbound Calls with the command name and
    /// payload; it should look the command up against [InboundCommand],
    /// validate/execute it, and return the response payload.
    pub async fn dispatch<F, Fut>(
        text: &str,
        validator: &SchemaValidator,
        cache: &mut RequestCache,
        handle: F,
    ) -> DispatchOutcome
    where
        F: FnOnce(String, Value) -> Fut,
        Fut: std::future::Future<Output = HandlerResult>,
    {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(_) => {
                return match Frame::recover_message_id(text) {
                    Some(message_id) => DispatchOutcome::Reply(Frame::call_error(
                        message_id,
                        crate::error::ErrorType::ProtocolError,
                        "malformed frame",
                    )),
                    None => DispatchOutcome::None,
                };
            }
        };

        match frame {
            Frame::Call {
                message_id,
                command,
                payload,
            } => {
                if let Err(violation) = validator.validate_request(&command, &payload) {
                    return DispatchOutcome::Reply(Frame::call_error(
                        message_id,
                        violation.error_type,
                        violation.message,
                    ));
                }
                match handle(command.clone(), payload).await {
                    Ok(response) => {
                        if let Err(violation) = validator.validate_response(&command, &response) {
                            warn!(%command, error = %violation.message, "handler produced a response that fails its own schema");
                        }
                        DispatchOutcome::Reply(Frame::call_result(message_id, response))
                    }
                    Err(error) => DispatchOutcome::Reply(Frame::call_error(
                        message_id,
                        error.error_type(),
                        error.to_string(),
                    )),
                }
            }
            Frame::CallResult {
                message_id,
                payload,
            } => {
                if cache.resolve_response(&message_id, payload) {
                    DispatchOutcome::Resolved
                } else {
                    debug!(%message_id, "CallResult for unknown or already-resolved MessageId");
                    DispatchOutcome::None
                }
            }
            Frame::CallError {
                message_id,
                error_type,
                error_description,
                ..
            } => {
                let command = cache
                    .take(&message_id)
                    .map(|entry| entry.command)
                    .unwrap_or("unknown");
                let resolved = cache.resolve_error(
                    &message_id,
                    OcppError::Rejected {
                        command,
                        error_type: parse_error_type(&error_type),
                        description: error_description,
                    },
                );
                if resolved {
                    DispatchOutcome::Resolved
                } else {
                    DispatchOutcome::None
                }
            }
        }
    }
}

fn parse_error_type(name: &str) -> crate::error::ErrorType {
    use crate::error::ErrorType::*;
    match name {
        "NotImplemented" => NotImplemented,
        "NotSupported" => NotSupported,
        "ProtocolError" => ProtocolError,
        "SecurityError" => SecurityError,
        "FormationViolation" => FormationViolation,
        "FormatViolation" => FormatViolation,
        "PropertyConstraintViolation" => PropertyConstraintViolation,
        "OccurrenceConstraintViolation" => OccurrenceConstraintViolation,
        "TypeConstraintViolation" => TypeConstraintViolation,
        _ => InternalError,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unknown_command_becomes_not_implemented_call_error() {
        let validator = SchemaValidator::new(true);
        let mut cache = RequestCache::new();
        let outcome = Dispatcher::dispatch(
            r#"[2,"m7","DoesNotExist",{}]"#,
            &validator,
            &mut cache,
            |_command, _payload| async { Err(OcppError::NotImplemented("DoesNotExist".into())) },
        )
        .await;

        match outcome {
            DispatchOutcome::Reply(Frame::CallError {
                message_id,
                error_type,
                ..
            }) => {
                assert_eq!(message_id, "m7");
                assert_eq!(error_type, "NotImplemented");
            }
            _ => panic!("expected a CallError reply"),
        }
    }

    #[tokio::test]
    async fn malformed_frame_with_recoverable_id_replies_protocol_error() {
        let validator = SchemaValidator::new(true);
        let mut cache = RequestCache::new();
        let outcome = Dispatcher::dispatch(
            r#"[2,"m7","Reset"]"#,
            &validator,
            &mut cache,
            |_c, _p| async { Ok(json!({})) },
        )
        .await;

        match outcome {
            DispatchOutcome::Reply(Frame::CallError {
                message_id,
                error_type,
                ..
            }) => {
                assert_eq!(message_id, "m7");
                assert_eq!(error_type, "ProtocolError");
            }
            _ => panic!("expected a CallError reply"),
        }
    }

    #[tokio::test]
    async fn call_result_resolves_matching_cache_entry() {
        let validator = SchemaValidator::new(true);
        let mut cache = RequestCache::new();
        let (entry, rx) = crate::cache::CacheEntry::new(
            "Heartbeat",
            json!({}),
            std::time::Duration::from_secs(60),
        );
        cache.insert("m1".into(), entry).unwrap();

        let outcome = Dispatcher::dispatch(
            r#"[3,"m1",{"currentTime":"now"}]"#,
            &validator,
            &mut cache,
            |_c, _p| async { Ok(json!({})) },
        )
        .await;

        assert!(matches!(outcome, DispatchOutcome::Resolved));
        match rx.await.unwrap() {
            crate::cache::CacheResolution::Response(v) => assert_eq!(v["currentTime"], "now"),
            _ => panic!("expected response"),
        }
    }
}
