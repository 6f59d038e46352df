//! Inbound command handlers (§4.G): one function per mandatory command,
//! each touching only the disjoint fields of [super::Station] it needs so
//! [super::Station::handle_inbound] can hold them alongside `cache` in the
//! same [crate::session::inbound::Dispatcher::dispatch] call.

use std::collections::HashMap;
use std::str::FromStr;

use serde_json::Value;

use crate::common::SimpleStatus;
use crate::core::{
    ChangeAvailabilityRequest, ChangeAvailabilityResponse, ChangeAvailabilityType, ChangeConfigurationRequest,
    ChangeConfigurationResponse, ChangeConfigurationStatus, GetConfigConfigurationKey, GetConfigurationRequest,
    GetConfigurationResponse, MessageTrigger, RemoteStartTransactionRequest, RemoteStartTransactionResponse,
    RemoteStopTransactionRequest, RemoteStopTransactionResponse, ResetRequest, ResetResponse,
    TriggerMessageRequest, TriggerMessageResponse, TriggerMessageStatus, UnlockConnectorRequest,
    UnlockConnectorResponse, UnlockConnectorStatus,
};
use crate::error::OcppError;
use crate::firmware_management::{GetDiagnosticsRequest, GetDiagnosticsResponse};
use crate::session::inbound::{HandlerResult, InboundCommand};
use crate::smart_charging::{
    ClearChargingProfileRequest, ClearChargingProfileResponse, SetChargingProfileRequest, SetChargingProfileResponse,
};
use crate::smart_charging::clear_charging_profile::ClearChargeProfileStatus;
use crate::smart_charging::set_charging_profile::SetChargingProfileStatus;
use crate::core::ClearCacheResponse;

use super::connector::ConnectorId;
use super::{Availability, Connector, ConfigurationKeyStore, PendingAction};

fn parse_request<T: serde::de::DeserializeOwned>(command: &str, payload: Value) -> Result<T, OcppError> {
    serde_json::from_value(payload).map_err(|e| OcppError::Internal(format!("{command} payload: {e}")))
}

fn response(value: impl serde::Serialize) -> HandlerResult {
    serde_json::to_value(value).map_err(|e| OcppError::Internal(e.to_string()))
}

/// Routes one parsed inbound command name to its handler (§4.G). Unknown
/// commands fall through to [OcppError::NotImplemented], matching
/// [InboundCommand]'s role as the exhaustive mandatory set.
pub async fn dispatch_command(
    command: &str,
    payload: Value,
    connectors: &mut HashMap<ConnectorId, Connector>,
    configuration: &mut ConfigurationKeyStore,
    pending_actions: &mut Vec<PendingAction>,
) -> HandlerResult {
    let parsed = InboundCommand::from_str(command).map_err(|_| OcppError::NotImplemented(command.to_string()))?;
    match parsed {
        InboundCommand::Reset => handle_reset(command, payload, connectors, pending_actions),
        InboundCommand::ClearCache => handle_clear_cache(command, payload),
        InboundCommand::ChangeAvailability => handle_change_availability(command, payload, connectors),
        InboundCommand::UnlockConnector => handle_unlock_connector(command, payload, connectors),
        InboundCommand::GetConfiguration => handle_get_configuration(command, payload, configuration),
        InboundCommand::ChangeConfiguration => handle_change_configuration(command, payload, configuration),
        InboundCommand::SetChargingProfile => handle_set_charging_profile(command, payload, connectors),
        InboundCommand::ClearChargingProfile => handle_clear_charging_profile(command, payload, connectors),
        InboundCommand::RemoteStartTransaction => {
            handle_remote_start_transaction(command, payload, connectors, pending_actions)
        }
        InboundCommand::RemoteStopTransaction => {
            handle_remote_stop_transaction(command, payload, connectors, pending_actions)
        }
        InboundCommand::GetDiagnostics => handle_get_diagnostics(command, payload, pending_actions),
        InboundCommand::TriggerMessage => handle_trigger_message(command, payload, pending_actions),
    }
}

/// Reset.req (§4.G): stops every running transaction immediately and
/// queues a reboot; the actual reconnect/re-registration cycle is driven
/// by the station actor after the CallResult has gone out.
fn handle_reset(
    command: &str,
    payload: Value,
    connectors: &mut HashMap<ConnectorId, Connector>,
    pending_actions: &mut Vec<PendingAction>,
) -> HandlerResult {
    let request: ResetRequest = parse_request(command, payload)?;
    for connector in connectors.values_mut() {
        connector.stop_transaction();
    }
    pending_actions.push(PendingAction::Reboot);
    // Hard and Soft resets are not distinguished by this simulator.
    let _ = request.r#type;
    response(ResetResponse {
        status: SimpleStatus::Accepted,
    })
}

fn handle_clear_cache(command: &str, payload: Value) -> HandlerResult {
    let _: crate::core::ClearCacheRequest = parse_request(command, payload)?;
    response(ClearCacheResponse {
        status: SimpleStatus::Accepted,
    })
}

fn handle_change_availability(
    command: &str,
    payload: Value,
    connectors: &mut HashMap<ConnectorId, Connector>,
) -> HandlerResult {
    let request: ChangeAvailabilityRequest = parse_request(command, payload)?;
    let Some(connector) = connectors.get_mut(&request.connector_id) else {
        return response(ChangeAvailabilityResponse {
            status: crate::core::ChangeAvailabilityStatus::Rejected,
        });
    };
    connector.availability = match request.r#type {
        ChangeAvailabilityType::Operative => Availability::Operative,
        ChangeAvailabilityType::Inoperative => Availability::Inoperative,
    };
    response(ChangeAvailabilityResponse {
        status: crate::core::ChangeAvailabilityStatus::Accepted,
    })
}

fn handle_unlock_connector(
    command: &str,
    payload: Value,
    connectors: &mut HashMap<ConnectorId, Connector>,
) -> HandlerResult {
    let request: UnlockConnectorRequest = parse_request(command, payload)?;
    let status = if connectors.contains_key(&request.connector_id) {
        UnlockConnectorStatus::Unlocked
    } else {
        UnlockConnectorStatus::NotSupported
    };
    response(UnlockConnectorResponse { status })
}

fn handle_get_configuration(
    command: &str,
    payload: Value,
    configuration: &ConfigurationKeyStore,
) -> HandlerResult {
    let request: GetConfigurationRequest = parse_request(command, payload)?;
    if request.key.is_empty() {
        let configuration_key = configuration
            .all()
            .iter()
            .map(to_get_config_key)
            .collect::<Vec<_>>();
        return response(GetConfigurationResponse {
            configuration_key: Some(configuration_key),
            unknown_key: None,
        });
    }

    let mut found = Vec::new();
    let mut unknown = Vec::new();
    for key in &request.key {
        match configuration.get(key) {
            Some(entry) => found.push(to_get_config_key(entry)),
            None => unknown.push(key.clone()),
        }
    }
    response(GetConfigurationResponse {
        configuration_key: (!found.is_empty()).then_some(found),
        unknown_key: (!unknown.is_empty()).then_some(unknown),
    })
}

fn to_get_config_key(entry: &super::ConfigurationKey) -> GetConfigConfigurationKey {
    GetConfigConfigurationKey {
        key: entry.key.clone(),
        readonly: entry.readonly,
        value: Some(entry.value.clone()),
    }
}

fn handle_change_configuration(
    command: &str,
    payload: Value,
    configuration: &mut ConfigurationKeyStore,
) -> HandlerResult {
    let request: ChangeConfigurationRequest = parse_request(command, payload)?;
    let status = match configuration.get(&request.key) {
        None => ChangeConfigurationStatus::NotSupported,
        Some(entry) if entry.readonly => ChangeConfigurationStatus::Rejected,
        Some(_) => {
            configuration.set(&request.key, request.value);
            ChangeConfigurationStatus::Accepted
        }
    };
    response(ChangeConfigurationResponse { status })
}

fn handle_set_charging_profile(
    command: &str,
    payload: Value,
    connectors: &mut HashMap<ConnectorId, Connector>,
) -> HandlerResult {
    let request: SetChargingProfileRequest = parse_request(command, payload)?;
    let Some(connector) = connectors.get_mut(&request.connector_id) else {
        return response(SetChargingProfileResponse {
            status: SetChargingProfileStatus::Rejected,
        });
    };
    connector
        .charging_profiles
        .retain(|p| p.charging_profile_id != request.cs_charging_profiles.charging_profile_id);
    connector.charging_profiles.push(request.cs_charging_profiles);
    response(SetChargingProfileResponse {
        status: SetChargingProfileStatus::Accepted,
    })
}

fn handle_clear_charging_profile(
    command: &str,
    payload: Value,
    connectors: &mut HashMap<ConnectorId, Connector>,
) -> HandlerResult {
    let request: ClearChargingProfileRequest = parse_request(command, payload)?;
    let mut cleared = false;
    for connector in connectors.values_mut() {
        let before = connector.charging_profiles.len();
        connector.charging_profiles.retain(|p| {
            let id_matches = request.id.map(|id| id != p.charging_profile_id).unwrap_or(true);
            let purpose_matches = request
                .charging_profile_purpose
                .as_ref()
                .map(|purpose| purpose != &p.charging_profile_purpose)
                .unwrap_or(true);
            let stack_matches = request.stack_level.map(|level| level != p.stack_level).unwrap_or(true);
            id_matches || purpose_matches || stack_matches
        });
        cleared |= connector.charging_profiles.len() != before;
    }
    let status = if cleared {
        ClearChargeProfileStatus::Accepted
    } else {
        ClearChargeProfileStatus::Unknown
    };
    response(ClearChargingProfileResponse { status })
}

fn handle_remote_start_transaction(
    command: &str,
    payload: Value,
    connectors: &HashMap<ConnectorId, Connector>,
    pending_actions: &mut Vec<PendingAction>,
) -> HandlerResult {
    let request: RemoteStartTransactionRequest = parse_request(command, payload)?;
    let connector_id = match request.connector_id {
        Some(id) => id,
        None => match connectors.iter().find(|(id, c)| **id != 0 && !c.transaction_started()) {
            Some((id, _)) => *id,
            None => {
                return response(RemoteStartTransactionResponse {
                    status: SimpleStatus::Rejected,
                })
            }
        },
    };
    let accepted = connectors
        .get(&connector_id)
        .map(|c| c.id != 0 && !c.transaction_started())
        .unwrap_or(false);
    if !accepted {
        return response(RemoteStartTransactionResponse {
            status: SimpleStatus::Rejected,
        });
    }
    pending_actions.push(PendingAction::RemoteStart {
        connector_id,
        id_tag: request.id_tag,
        charging_profile: request.charging_profile,
    });
    response(RemoteStartTransactionResponse {
        status: SimpleStatus::Accepted,
    })
}

fn handle_remote_stop_transaction(
    command: &str,
    payload: Value,
    connectors: &HashMap<ConnectorId, Connector>,
    pending_actions: &mut Vec<PendingAction>,
) -> HandlerResult {
    let request: RemoteStopTransactionRequest = parse_request(command, payload)?;
    let accepted = connectors
        .values()
        .any(|c| c.transaction_id == Some(request.transaction_id));
    if !accepted {
        return response(RemoteStopTransactionResponse {
            status: SimpleStatus::Rejected,
        });
    }
    pending_actions.push(PendingAction::RemoteStop {
        transaction_id: request.transaction_id,
    });
    response(RemoteStopTransactionResponse {
        status: SimpleStatus::Accepted,
    })
}

fn handle_get_diagnostics(
    command: &str,
    payload: Value,
    pending_actions: &mut Vec<PendingAction>,
) -> HandlerResult {
    let request: GetDiagnosticsRequest = parse_request(command, payload)?;
    let file_name = format!(
        "diag-{}.log",
        request.location.rsplit('/').next().unwrap_or("upload")
    );
    pending_actions.push(PendingAction::UploadDiagnostics {
        file_name: file_name.clone(),
    });
    response(GetDiagnosticsResponse { file_name })
}

fn handle_trigger_message(
    command: &str,
    payload: Value,
    pending_actions: &mut Vec<PendingAction>,
) -> HandlerResult {
    let request: TriggerMessageRequest = parse_request(command, payload)?;
    let supported = matches!(
        request.requested_message,
        MessageTrigger::BootNotification
            | MessageTrigger::Heartbeat
            | MessageTrigger::MeterValues
            | MessageTrigger::StatusNotification
            | MessageTrigger::DiagnosticsStatusNotification
            | MessageTrigger::FirmwareStatusNotification
    );
    if !supported {
        return response(TriggerMessageResponse {
            status: TriggerMessageStatus::NotImplemented,
        });
    }
    pending_actions.push(PendingAction::Trigger {
        message: request.requested_message,
        connector_id: request.connector_id,
    });
    response(TriggerMessageResponse {
        status: TriggerMessageStatus::Accepted,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn connectors() -> HashMap<ConnectorId, Connector> {
        let mut map = HashMap::new();
        map.insert(0, Connector::new(0));
        map.insert(1, Connector::new(1));
        map
    }

    #[tokio::test]
    async fn reset_stops_transactions_and_queues_reboot() {
        let mut connectors = connectors();
        connectors.get_mut(&1).unwrap().start_transaction(1, "TAG".into());
        let mut configuration = ConfigurationKeyStore::new();
        let mut pending = Vec::new();

        let result = dispatch_command(
            "Reset",
            json!({"type": "Hard"}),
            &mut connectors,
            &mut configuration,
            &mut pending,
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "Accepted");
        assert!(!connectors[&1].transaction_started());
        assert!(matches!(pending[0], PendingAction::Reboot));
    }

    #[tokio::test]
    async fn change_availability_updates_connector() {
        let mut connectors = connectors();
        let mut configuration = ConfigurationKeyStore::new();
        let mut pending = Vec::new();

        let result = dispatch_command(
            "ChangeAvailability",
            json!({"connectorId": 1, "type": "Inoperative"}),
            &mut connectors,
            &mut configuration,
            &mut pending,
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "Accepted");
        assert_eq!(connectors[&1].availability, Availability::Inoperative);
    }

    #[tokio::test]
    async fn get_configuration_reports_unknown_keys() {
        let mut connectors = connectors();
        let mut configuration = ConfigurationKeyStore::new();
        configuration.add(super::super::ConfigurationKey::new("HeartbeatInterval", "60", false), true);
        let mut pending = Vec::new();

        let result = dispatch_command(
            "GetConfiguration",
            json!({"key": ["HeartbeatInterval", "Bogus"]}),
            &mut connectors,
            &mut configuration,
            &mut pending,
        )
        .await
        .unwrap();

        assert_eq!(result["configurationKey"][0]["key"], "HeartbeatInterval");
        assert_eq!(result["unknownKey"][0], "Bogus");
    }

    #[tokio::test]
    async fn change_configuration_rejects_readonly_keys() {
        let mut connectors = connectors();
        let mut configuration = ConfigurationKeyStore::new();
        configuration.add(super::super::ConfigurationKey::new("NumberOfConnectors", "1", true), true);
        let mut pending = Vec::new();

        let result = dispatch_command(
            "ChangeConfiguration",
            json!({"key": "NumberOfConnectors", "value": "2"}),
            &mut connectors,
            &mut configuration,
            &mut pending,
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "Rejected");
    }

    #[tokio::test]
    async fn remote_start_rejects_unknown_connector() {
        let mut connectors = connectors();
        let mut configuration = ConfigurationKeyStore::new();
        let mut pending = Vec::new();

        let result = dispatch_command(
            "RemoteStartTransaction",
            json!({"connectorId": 99, "idTag": "TAG"}),
            &mut connectors,
            &mut configuration,
            &mut pending,
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "Rejected");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn remote_start_accepts_idle_connector_and_queues_pending_action() {
        let mut connectors = connectors();
        let mut configuration = ConfigurationKeyStore::new();
        let mut pending = Vec::new();

        let result = dispatch_command(
            "RemoteStartTransaction",
            json!({"connectorId": 1, "idTag": "TAG"}),
            &mut connectors,
            &mut configuration,
            &mut pending,
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "Accepted");
        assert!(matches!(pending[0], PendingAction::RemoteStart { connector_id: 1, .. }));
    }

    #[tokio::test]
    async fn remote_stop_rejects_unknown_transaction() {
        let mut connectors = connectors();
        let mut configuration = ConfigurationKeyStore::new();
        let mut pending = Vec::new();

        let result = dispatch_command(
            "RemoteStopTransaction",
            json!({"transactionId": 7}),
            &mut connectors,
            &mut configuration,
            &mut pending,
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "Rejected");
    }

    #[tokio::test]
    async fn trigger_message_rejects_unsupported_trigger() {
        let mut connectors = connectors();
        let mut configuration = ConfigurationKeyStore::new();
        let mut pending = Vec::new();

        let result = dispatch_command(
            "TriggerMessage",
            json!({"requestedMessage": "FirmwareStatusNotification"}),
            &mut connectors,
            &mut configuration,
            &mut pending,
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "Accepted");
        assert!(matches!(pending[0], PendingAction::Trigger { .. }));
    }

    #[tokio::test]
    async fn unknown_command_is_not_implemented() {
        let mut connectors = connectors();
        let mut configuration = ConfigurationKeyStore::new();
        let mut pending = Vec::new();

        let result = dispatch_command("DoesNotExist", json!({}), &mut connectors, &mut configuration, &mut pending).await;
        assert!(matches!(result, Err(OcppError::NotImplemented(_))));
    }
}
