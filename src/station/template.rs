//! On-disk station template (§3): the static description a station is
//! instantiated from, plus the deterministic station hash id derived from
//! its stable identity fields (§4.H step 1).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::station::meter::MeterValuesTemplate;

/// How a station picks amongst multiple configured supervision URLs
/// (§4.H step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SupervisionUrlPolicy {
    #[default]
    Sequential,
    RoundRobin,
    Random,
}

/// Automatic Transaction Generator configuration (§4.J).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtgConfig {
    pub enabled: bool,
    pub min_delay_between_transactions_seconds: u32,
    pub max_delay_between_transactions_seconds: u32,
    pub min_duration_seconds: u32,
    pub max_duration_seconds: u32,
    /// Probability in `[0.0, 1.0]` that a cycle actually starts a
    /// transaction rather than being skipped.
    #[serde(default = "AtgConfig::default_start_probability")]
    pub start_probability: f64,
    pub id_tags: Vec<String>,
    /// Stop the generator entirely after this many hours, if set.
    pub stop_after_hours: Option<f64>,
}

impl AtgConfig {
    fn default_start_probability() -> f64 {
        1.0
    }
}

/// Template for one connector slot (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorTemplate {
    pub id: u32,
    #[serde(default = "ConnectorTemplate::default_phases")]
    pub number_of_phases: u32,
    pub max_power_w: f64,
    #[serde(default)]
    pub meter_values: Vec<MeterValuesTemplateSpec>,
}

impl ConnectorTemplate {
    fn default_phases() -> u32 {
        1
    }
}

/// Serializable form of [MeterValuesTemplate]; kept separate so the runtime
/// `rand`-facing type doesn't need to implement `Deserialize` itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterValuesTemplateSpec {
    pub measurand: String,
    pub fixed_value: Option<f64>,
    pub fluctuation_percent: Option<f64>,
    pub range_min: Option<f64>,
}

impl MeterValuesTemplateSpec {
    pub fn to_runtime(&self) -> Option<MeterValuesTemplate> {
        use crate::station::meter::SampleSource;
        use std::str::FromStr;

        let measurand = crate::common::meter_value::SampledMeasurand::from_str(&self.measurand)
            .unwrap_or(crate::common::meter_value::SampledMeasurand::EnergyActiveImportRegister);

        let source = if let Some(value) = self.fixed_value {
            SampleSource::Fixed {
                value,
                fluctuation_percent: self.fluctuation_percent.unwrap_or(0.0),
            }
        } else {
            SampleSource::Range {
                min: self.range_min.unwrap_or(0.0),
            }
        };

        Some(MeterValuesTemplate { measurand, source })
    }
}

/// The static description a [crate::station::Station] is built from (§3).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StationTemplate {
    #[validate(length(min = 1))]
    pub station_id: String,
    #[validate(length(min = 1))]
    pub charge_point_vendor: String,
    #[validate(length(min = 1))]
    pub charge_point_model: String,
    pub charge_point_serial_number: Option<String>,
    pub firmware_version: Option<String>,

    #[validate(length(min = 1))]
    pub supervision_urls: Vec<String>,
    #[serde(default)]
    pub supervision_url_policy: SupervisionUrlPolicy,
    pub basic_auth_password: Option<String>,

    #[validate(length(min = 1))]
    pub connectors: Vec<ConnectorTemplate>,
    /// Desired connector count (§4.H step 4), which may exceed the number
    /// of distinct entries in `connectors`. `None` means "exactly the
    /// template entries".
    pub desired_number_of_connectors: Option<u32>,
    /// Forces random selection among the template's connector entries when
    /// building the desired connector count. If unset and the desired count
    /// exceeds the distinct template entries, random selection is forced
    /// (§4.H step 4).
    pub random_connectors: Option<bool>,

    pub max_power_w: f64,
    /// Recompute the power divider from the count of currently running
    /// transactions rather than the connector count (§4.H step 6).
    #[serde(default)]
    pub power_shared_by_connectors: bool,

    /// Feature profile names this station supports, e.g.
    /// `LocalAuthListManagement` (§4.H step 5).
    #[serde(default)]
    pub supported_feature_profiles: Vec<String>,

    #[serde(default)]
    pub auto_register: bool,
    #[serde(default)]
    pub strict_compliance: bool,

    pub atg: Option<AtgConfig>,
}

impl StationTemplate {
    /// A deterministic id derived from vendor/model/serial and the
    /// configured station id, stable across restarts so that a persisted
    /// configuration file can be found again (§4.H step 1).
    ///
    /// This is a simulator-internal identifier, not a value ever placed on
    /// the wire.
    pub fn hash_id(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.station_id.hash(&mut hasher);
        self.charge_point_vendor.hash(&mut hasher);
        self.charge_point_model.hash(&mut hasher);
        self.charge_point_serial_number.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    pub fn power_divider(&self) -> u32 {
        self.connectors.len().max(1) as u32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn template() -> StationTemplate {
        StationTemplate {
            station_id: "CP001".into(),
            charge_point_vendor: "Acme".into(),
            charge_point_model: "Zapper".into(),
            charge_point_serial_number: Some("SN1".into()),
            firmware_version: None,
            supervision_urls: vec!["wss://example.invalid/ocpp".into()],
            supervision_url_policy: SupervisionUrlPolicy::Sequential,
            basic_auth_password: None,
            connectors: vec![ConnectorTemplate {
                id: 1,
                number_of_phases: 3,
                max_power_w: 22_000.0,
                meter_values: vec![],
            }],
            desired_number_of_connectors: None,
            random_connectors: None,
            max_power_w: 22_000.0,
            power_shared_by_connectors: false,
            supported_feature_profiles: Vec::new(),
            auto_register: false,
            strict_compliance: true,
            atg: None,
        }
    }

    #[test]
    fn hash_id_is_stable_across_calls() {
        let t = template();
        assert_eq!(t.hash_id(), t.hash_id());
    }

    #[test]
    fn hash_id_differs_when_identity_differs() {
        let a = template();
        let mut b = template();
        b.station_id = "CP002".into();
        assert_ne!(a.hash_id(), b.hash_id());
    }

    #[test]
    fn power_divider_matches_connector_count() {
        let t = template();
        assert_eq!(t.power_divider(), 1);
    }

    #[test]
    fn template_validates_required_fields() {
        let t = template();
        assert!(t.validate().is_ok());

        let mut bad = template();
        bad.connectors.clear();
        assert!(bad.validate().is_err());
    }
}
