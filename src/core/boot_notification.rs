//! Initialization message detailing general information about the charge point (e.g version, vendor etc.).
//!
//! # Behaviour
//! After start-up, a Charge Point SHALL send a request to the Central System with information about its
//! configuration (e.g. version, vendor, etc.). The Central System SHALL respond to indicate whether it will accept the
//! Charge Point. The Charge Point SHALL send a BootNotification.req PDU each time it boots or reboots. Between the
//! physical power-on/reboot and the successful completion of a BootNotification, where Central System returns
//! Accepted or Pending, the Charge Point SHALL NOT send any other request to the Central System.
//!
//! # Response
//! When the Central System responds with Accepted, the Charge Point adjusts the heartbeat interval to the `interval`
//! field and synchronizes its clock to `current_time`. Pending/Rejected gate outbound admission; see the session
//! registration state machine.

use crate::error::OcppError;
use crate::generate_builders;
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use ocpp_json_validate::json_validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum_macros::Display;
use validator::Validate;

#[cfg(test)]
use test_strategy::Arbitrary;

// -------------------------- REQUEST --------------------------
#[skip_serializing_none]
#[json_validate("../json_schemas/Requests/Core/BootNotification.json")]
#[derive(Serialize, Validate, Deserialize, Debug, Clone, Builder)]
#[builder(build_fn(name = "pre_build"), setter(into))]
#[serde(rename_all = "camelCase")]
#[cfg_attr(not(test), builder(setter(strip_option)))]
#[cfg_attr(test, derive(Arbitrary))]
/// Field definition of the BootNotification.req PDU sent by the Charge Point to the Central System.
pub struct BootNotificationRequest {
    /// Required. This contains a value that identifies the vendor of the ChargePoint.
    #[validate(length(max = 20))]
    pub charge_point_vendor: String,
    /// Required. This contains a value that identifies the model of the ChargePoint.
    #[validate(length(max = 20))]
    pub charge_point_model: String,
    /// Optional. This contains a value that identifies the serial number of the Charge Point.
    #[validate(length(max = 25))]
    #[builder(default)]
    pub charge_point_serial_number: Option<String>,
    /// Deprecated, will be removed in future version. Identifies serial number of Charge Box.
    #[validate(length(max = 25))]
    #[builder(default)]
    pub charge_box_serial_number: Option<String>,
    /// Identifies the firmware version on the charge point.
    #[validate(length(max = 50))]
    #[builder(default)]
    pub firmware_version: Option<String>,
    /// Identifies the ICCID of the modem's SIM card.
    #[validate(length(max = 20))]
    #[builder(default)]
    pub iccid: Option<String>,
    /// Identifies the IMSI of the modem's SIM card.
    #[validate(length(max = 20))]
    #[builder(default)]
    pub imsi: Option<String>,
    /// Identifies the type of the main electrical meter of the charge point.
    #[validate(length(max = 25))]
    #[builder(default)]
    pub meter_type: Option<String>,
    /// Identifies the serial number of the main electrical meter of the charge point.
    #[validate(length(max = 25))]
    #[builder(default)]
    pub meter_serial_number: Option<String>,
}

// -------------------------- RESPONSE --------------------------
#[skip_serializing_none]
#[json_validate("../json_schemas/Responses/Core/BootNotification.json")]
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Serialize, Validate, Deserialize, Debug, Clone, Builder)]
#[builder(build_fn(name = "pre_build"), setter(into))]
#[serde(rename_all = "camelCase")]
/// Field definition of the BootNotification.conf PDU sent by the Central System to the Charge Point.
pub struct BootNotificationResponse {
    /// Whether the Central System has registered this Charge Point.
    pub status: BootNotificationStatus,
    /// Required. This contains the current time of the Central System.
    pub current_time: DateTime<Utc>,
    /// Heartbeat interval in seconds when Accepted; minimum retry wait otherwise.
    pub interval: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Display, Clone)]
#[cfg_attr(test, derive(Arbitrary))]
pub enum BootNotificationStatus {
    /// Charge point accepted by Central System.
    Accepted,
    /// Acceptance pending; Central System may send messages to retrieve information first.
    Pending,
    /// Charge point not accepted.
    Rejected,
}

generate_builders!(BootNotification);

#[cfg(test)]
mod test {
    use ocpp_json_validate::JsonValidate;
    use test_strategy::proptest;
    use validator::Validate;

    #[proptest]
    fn test_request_builder(proptest_struct: super::BootNotificationRequest) {
        use super::BootNotificationRequestBuilder;
        let v = proptest_struct.clone();
        let built_struct = BootNotificationRequestBuilder::default()
            .charge_point_vendor(v.charge_point_vendor)
            .charge_point_model(v.charge_point_model.clone())
            .charge_point_serial_number(v.charge_point_serial_number)
            .charge_box_serial_number(v.charge_box_serial_number)
            .firmware_version(v.firmware_version)
            .iccid(v.iccid)
            .imsi(v.imsi)
            .meter_type(v.meter_type)
            .meter_serial_number(v.meter_serial_number)
            .build();

        assert_eq!(built_struct.is_ok(), Validate::validate(&proptest_struct).is_ok());
    }

    #[proptest]
    fn test_request_schema_matches_field_validation(proptest_struct: super::BootNotificationRequest) {
        let field_valid = Validate::validate(&proptest_struct).is_ok();
        let schema_valid = JsonValidate::validate(&proptest_struct).is_ok();
        assert_eq!(field_valid, schema_valid);
    }
}
