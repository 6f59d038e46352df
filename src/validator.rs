//! Schema Validator service (§4.C): validates Call and CallResult payloads
//! against the per-command JSON schemas embedded under `json_schemas/`, and
//! translates `jsonschema` validation errors onto OCPP wire `ErrorType`s.
//!
//! This is deliberately a thin, stateless, injectable service (§9 "Singleton
//! services" re-architecture note): a station holds one `SchemaValidator` and
//! passes it to the outbound pipeline and inbound dispatcher rather than
//! reaching for global state.

use std::collections::HashMap;

use jsonschema::JSONSchema;
use lazy_static::lazy_static;
use serde_json::Value;

use crate::error::ErrorType;

macro_rules! schema_map {
    ($( $command:literal => ($req_path:literal, $resp_path:literal) ),* $(,)?) => {{
        let mut m: HashMap<&'static str, (JSONSchema, JSONSchema)> = HashMap::new();
        $(
            let request_schema: Value = serde_json::from_str(include_str!($req_path))
                .expect(concat!("invalid request schema literal for ", $command));
            let response_schema: Value = serde_json::from_str(include_str!($resp_path))
                .expect(concat!("invalid response schema literal for ", $command));
            m.insert(
                $command,
                (
                    JSONSchema::compile(Box::leak(Box::new(request_schema)))
                        .expect(concat!("failed to compile request schema for ", $command)),
                    JSONSchema::compile(Box::leak(Box::new(response_schema)))
                        .expect(concat!("failed to compile response schema for ", $command)),
                ),
            );
        )*
        m
    }};
}

lazy_static! {
    static ref SCHEMAS: HashMap<&'static str, (JSONSchema, JSONSchema)> = schema_map! {
        "Authorize" => ("json_schemas/Requests/Core/Authorize.json", "json_schemas/Responses/Core/Authorize.json"),
        "BootNotification" => ("json_schemas/Requests/Core/BootNotification.json", "json_schemas/Responses/Core/BootNotification.json"),
        "ChangeAvailability" => ("json_schemas/Requests/Core/ChangeAvailability.json", "json_schemas/Responses/Core/ChangeAvailability.json"),
        "ChangeConfiguration" => ("json_schemas/Requests/Core/ChangeConfiguration.json", "json_schemas/Responses/Core/ChangeConfiguration.json"),
        "ClearCache" => ("json_schemas/Requests/Core/ClearCache.json", "json_schemas/Responses/Core/ClearCache.json"),
        "DataTransfer" => ("json_schemas/Requests/Core/DataTransfer.json", "json_schemas/Responses/Core/DataTransfer.json"),
        "GetConfiguration" => ("json_schemas/Requests/Core/GetConfiguration.json", "json_schemas/Responses/Core/GetConfiguration.json"),
        "MeterValues" => ("json_schemas/Requests/Core/MeterValues.json", "json_schemas/Responses/Core/MeterValues.json"),
        "RemoteStartTransaction" => ("json_schemas/Requests/Core/RemoteStartTransaction.json", "json_schemas/Responses/Core/RemoteStartTransaction.json"),
        "RemoteStopTransaction" => ("json_schemas/Requests/Core/RemoteStopTransaction.json", "json_schemas/Responses/Core/RemoteStopTransaction.json"),
        "Reset" => ("json_schemas/Requests/Core/Reset.json", "json_schemas/Responses/Core/Reset.json"),
        "StartTransaction" => ("json_schemas/Requests/Core/StartTransaction.json", "json_schemas/Responses/Core/StartTransaction.json"),
        "StatusNotification" => ("json_schemas/Requests/Core/StatusNotification.json", "json_schemas/Responses/Core/StatusNotification.json"),
        "StopTransaction" => ("json_schemas/Requests/Core/StopTransaction.json", "json_schemas/Responses/Core/StopTransaction.json"),
        "TriggerMessage" => ("json_schemas/Requests/Core/TriggerMessage.json", "json_schemas/Responses/Core/TriggerMessage.json"),
        "UnlockConnector" => ("json_schemas/Requests/Core/UnlockConnector.json", "json_schemas/Responses/Core/UnlockConnector.json"),
        "DiagnosticsStatusNotification" => ("json_schemas/Requests/FirmwareManagement/DiagnosticsStatusNotification.json", "json_schemas/Responses/FirmwareManagement/DiagnosticsStatusNotification.json"),
        "FirmwareStatusNotification" => ("json_schemas/Requests/FirmwareManagement/FirmwareStatusNotification.json", "json_schemas/Responses/FirmwareManagement/FirmwareStatusNotification.json"),
        "GetDiagnostics" => ("json_schemas/Requests/FirmwareManagement/GetDiagnostics.json", "json_schemas/Responses/FirmwareManagement/GetDiagnostics.json"),
        "UpdateFirmware" => ("json_schemas/Requests/FirmwareManagement/UpdateFirmware.json", "json_schemas/Responses/FirmwareManagement/UpdateFirmware.json"),
        "SetChargingProfile" => ("json_schemas/Requests/SmartCharging/SetChargingProfile.json", "json_schemas/Responses/SmartCharging/SetChargingProfile.json"),
        "ClearChargingProfile" => ("json_schemas/Requests/SmartCharging/ClearChargingProfile.json", "json_schemas/Responses/SmartCharging/ClearChargingProfile.json"),
        "GetCompositeSchedule" => ("json_schemas/Requests/SmartCharging/GetCompositeSchedule.json", "json_schemas/Responses/SmartCharging/GetCompositeSchedule.json"),
        "GetLocalListVersion" => ("json_schemas/Requests/AuthenticationListManagement/GetLocalListVersion.json", "json_schemas/Responses/AuthenticationListManagement/GetLocalListVersion.json"),
        "SendLocalList" => ("json_schemas/Requests/AuthenticationListManagement/SendLocalList.json", "json_schemas/Responses/AuthenticationListManagement/SendLocalList.json"),
    };
}

/// A single schema violation, after translation to a wire `ErrorType`.
#[derive(Debug, Clone)]
pub struct Violation {
    pub error_type: ErrorType,
    pub message: String,
}

/// Translation rule from jsonschema's validation-error keyword to an OCPP
/// `ErrorType` (§4.C), applied to the first violation encountered.
fn classify(keyword: &str) -> ErrorType {
    match keyword {
        "type" => ErrorType::TypeConstraintViolation,
        "required" | "dependencies" => ErrorType::OccurrenceConstraintViolation,
        "pattern" | "format" => ErrorType::PropertyConstraintViolation,
        _ => ErrorType::FormatViolation,
    }
}

/// Best-effort extraction of the keyword an error came from, by inspecting
/// the validator's instance path and message — `jsonschema` 0.16 doesn't
/// expose the keyword directly on `ValidationError`, so it's recovered from
/// the schema path's final segment.
fn keyword_from_schema_path(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Stateless schema validation service, shared (by reference) across a
/// station's outbound pipeline and inbound dispatcher.
#[derive(Default, Clone, Copy)]
pub struct SchemaValidator {
    /// When false, every call to validate_* is a no-op success
    /// (`ocppStrictCompliance=false`, §4.C).
    pub strict: bool,
}

impl SchemaValidator {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn validate_request(&self, command: &str, payload: &Value) -> Result<(), Violation> {
        self.validate(command, payload, true)
    }

    pub fn validate_response(&self, command: &str, payload: &Value) -> Result<(), Violation> {
        self.validate(command, payload, false)
    }

    fn validate(&self, command: &str, payload: &Value, is_request: bool) -> Result<(), Violation> {
        if !self.strict {
            return Ok(());
        }
        let Some((request_schema, response_schema)) = SCHEMAS.get(command) else {
            // No schema registered for this command: treat as NOT_IMPLEMENTED
            // territory, not a schema violation; the dispatcher handles that.
            return Ok(());
        };
        let schema = if is_request {
            request_schema
        } else {
            response_schema
        };
        match schema.validate(payload) {
            Ok(()) => Ok(()),
            Err(mut errors) => {
                let first = errors
                    .next()
                    .expect("validate() returned Err with no errors");
                let schema_path = first.schema_path.to_string();
                let keyword = keyword_from_schema_path(&schema_path);
                Err(Violation {
                    error_type: classify(keyword),
                    message: first.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_valid_heartbeat_style_empty_object() {
        let v = SchemaValidator::new(true);
        assert!(v.validate_request("ClearCache", &json!({})).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let v = SchemaValidator::new(true);
        let violation = v
            .validate_request("BootNotification", &json!({"chargePointVendor": "Acme"}))
            .unwrap_err();
        assert_eq!(violation.error_type, ErrorType::OccurrenceConstraintViolation);
    }

    #[test]
    fn non_strict_admits_anything() {
        let v = SchemaValidator::new(false);
        assert!(v.validate_request("BootNotification", &json!({})).is_ok());
    }

    #[test]
    fn unknown_command_is_admitted_by_validator() {
        let v = SchemaValidator::new(true);
        assert!(v.validate_request("DoesNotExist", &json!({})).is_ok());
    }
}
