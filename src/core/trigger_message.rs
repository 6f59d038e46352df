//! Central System request to trigger a message response from a charge point.
//!
//! During normal operation, the Charge Point informs the Central System of its state and any relevant occurrences.
//! If there is nothing to report, the Charge Point sends at least a Heartbeat at a predefined interval. The
//! TriggerMessage.req makes it possible for the Central System to request the Charge Point to send a Charge
//! Point-initiated message out of the regular cadence, e.g. after reconnecting to double-check the last known state.
//!
//! For every requested message the Central System MAY optionally indicate which connector the request applies to.
//! The requested message is leading: if the specified connectorId is not relevant to the message, it is ignored but
//! the requested message is still sent. If the connectorId is relevant but absent, it is interpreted as "for all
//! allowed connectorId values".

use ocpp_json_validate::json_validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum_macros::Display;

// -------------------------- REQUEST ---------------------------
#[json_validate("../json_schemas/Requests/Core/TriggerMessage.json")]
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
/// Field definition of the TriggerMessage.req PDU sent by the Central System to the Charge Point.
pub struct TriggerMessageRequest {
    pub requested_message: MessageTrigger,
    /// Only filled in when request applies to a specific connector.
    pub connector_id: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Display, Clone)]
/// Message the Central System is asking the Charge Point to (re)send.
pub enum MessageTrigger {
    BootNotification,
    DiagnosticsStatusNotification,
    FirmwareStatusNotification,
    Heartbeat,
    MeterValues,
    StatusNotification,
}

// -------------------------- RESPONSE --------------------------
#[json_validate("../json_schemas/Responses/Core/TriggerMessage.json")]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
/// Field definition of the TriggerMessage.conf PDU sent by the Charge Point to the Central System.
pub struct TriggerMessageResponse {
    pub status: TriggerMessageStatus,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Display, Clone)]
pub enum TriggerMessageStatus {
    Accepted,
    Rejected,
    NotImplemented,
}
