use crate::common::charging_profile::ChargingSchedule;
use crate::common::{ChargingRateUnit, SimpleStatus};
use ocpp_json_validate::json_validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

// -------------------------- REQUEST ---------------------------
#[json_validate("../json_schemas/Requests/SmartCharging/GetCompositeSchedule.json")]
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetCompositeScheduleRequest {
    pub connector_id: u32,
    pub duration: u32,
    pub charging_rate_unit: Option<ChargingRateUnit>,
}

// -------------------------- RESPONSE --------------------------
#[json_validate("../json_schemas/Responses/SmartCharging/GetCompositeSchedule.json")]
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetCompositeScheduleResponse {
    pub status: SimpleStatus,
    pub connector_id: u32,
    pub charging_schedule: ChargingSchedule,
}
