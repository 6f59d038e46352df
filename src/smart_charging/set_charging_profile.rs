use crate::common::charging_profile::ChargingProfile;
use ocpp_json_validate::json_validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum_macros::Display;

// -------------------------- REQUEST ---------------------------
#[json_validate("../json_schemas/Requests/SmartCharging/SetChargingProfile.json")]
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetChargingProfileRequest {
    pub connector_id: u32,
    pub cs_charging_profiles: ChargingProfile,
}

// -------------------------- RESPONSE --------------------------
#[json_validate("../json_schemas/Responses/SmartCharging/SetChargingProfile.json")]
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetChargingProfileResponse {
    pub status: SetChargingProfileStatus,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Display, Clone)]
pub enum SetChargingProfileStatus {
    Accepted,
    Rejected,
    NotSupported,
}
