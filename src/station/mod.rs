//! The per-station state container (§3, §4.H): a single charge point
//! simulation, holding its transport, configuration, connectors and the
//! plumbing built in [crate::session].

pub mod actor;
pub mod config;
pub mod connector;
pub mod handlers;
pub mod meter;
pub mod power;
pub mod template;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::cache::{CacheResolution, RequestCache};
use crate::common::charging_profile::ChargingProfile;
use crate::core::MessageTrigger;
use crate::error::OcppError;
use crate::session::inbound::{DispatchOutcome, Dispatcher};
use crate::session::outbound::{MessageBuffer, OutboundPipeline, SendOptions};
use crate::session::state::RegistrationState;
use crate::transport::{StationTransport, Transport, TransportConfig};
use crate::validator::SchemaValidator;

pub use config::{ConfigurationKey, ConfigurationKeyStore};
pub use connector::{Availability, Connector, ConnectorId};
pub use template::{ConnectorTemplate, StationTemplate, SupervisionUrlPolicy};

/// Something an inbound command handler wants done outside the borrow it
/// ran under (§4.G): handlers only ever see disjoint fields of [Station],
/// never the whole thing, so anything requiring `transport`/`cache` together
/// with connector/configuration state is deferred here and drained by the
/// station actor right after dispatch returns.
#[derive(Debug, Clone)]
pub enum PendingAction {
    Reboot,
    RemoteStart {
        connector_id: ConnectorId,
        id_tag: String,
        charging_profile: Option<ChargingProfile>,
    },
    RemoteStop {
        transaction_id: u32,
    },
    UploadDiagnostics {
        file_name: String,
    },
    Trigger {
        message: MessageTrigger,
        connector_id: Option<ConnectorId>,
    },
}

/// A fully assembled simulated charge point (§3), generic over its
/// transport so the same station logic can be driven by a live
/// [Transport] or, in tests, by [crate::transport::MockTransport].
pub struct Station<T: StationTransport = Transport> {
    pub hash_id: String,
    pub template: StationTemplate,
    pub state: RegistrationState,
    pub connectors: HashMap<ConnectorId, Connector>,
    /// Maps a runtime connector id to the template entry id supplying its
    /// physical specs, since `randomConnectors` (§4.H step 4) can make the
    /// two diverge.
    pub connector_specs: HashMap<ConnectorId, u32>,
    pub configuration: ConfigurationKeyStore,
    pub validator: SchemaValidator,
    pub cache: RequestCache,
    pub buffer: MessageBuffer,
    pub transport: T,
    pub pending_actions: Vec<PendingAction>,
    config_path: PathBuf,
}

impl<T: StationTransport> Station<T> {
    /// Initializes a station from its template and an already-built
    /// transport (§4.H steps 1-7): resolves connector specs, loads or
    /// derives the persisted configuration, but does not open the
    /// transport or send any message — that's [Station::start].
    pub fn with_transport(template: StationTemplate, transport: T) -> Self {
        let hash_id = template.hash_id();
        let config_path = config::default_config_path(&hash_id);
        Self::with_transport_and_config_path(template, transport, config_path)
    }

    /// As [Station::with_transport], but with an explicit configuration
    /// file path rather than the default `assets/configurations/<hashId>.json`
    /// — used by tests so they don't touch the real assets directory.
    pub fn with_transport_and_config_path(
        template: StationTemplate,
        transport: T,
        config_path: PathBuf,
    ) -> Self {
        let hash_id = template.hash_id();
        let (connectors, connector_specs) = build_connectors(&template, &hash_id);
        let number_of_connectors = connectors.len().saturating_sub(1) as u32;

        let configuration = config::load_or_derive(&config_path, &hash_id, || {
            let mut store = ConfigurationKeyStore::new();
            seed_configuration(&mut store, &template, number_of_connectors);
            store
        });

        let state = if template.auto_register {
            RegistrationState::Accepted
        } else {
            RegistrationState::Unknown
        };

        Self {
            hash_id,
            validator: SchemaValidator::new(template.strict_compliance),
            state,
            connectors,
            connector_specs,
            configuration,
            cache: RequestCache::new(),
            buffer: MessageBuffer::new(),
            transport,
            pending_actions: Vec::new(),
            config_path,
            template,
        }
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.get(&id)
    }

    pub fn connector_mut(&mut self, id: ConnectorId) -> Option<&mut Connector> {
        self.connectors.get_mut(&id)
    }

    /// The template entry supplying `connector_id`'s physical specs
    /// (phases, rated power), resolved through `connector_specs` to account
    /// for `randomConnectors` (§4.H step 4).
    pub fn connector_template_for(&self, connector_id: ConnectorId) -> Option<&ConnectorTemplate> {
        let entry_id = self.connector_specs.get(&connector_id)?;
        self.template.connectors.iter().find(|c| c.id == *entry_id)
    }

    /// Opens the transport. If the template requests `autoRegister`, the
    /// station is already `Accepted` without ever sending a
    /// BootNotification (§4.H step 7).
    pub async fn start(&mut self) -> Result<(), OcppError> {
        info!(station = %self.template.station_id, "starting station");
        self.transport.connect().await
    }

    /// Stops the station: closes the transport, clears every connector's
    /// in-flight transaction state, and fails any still-pending requests
    /// (§3 Lifecycle).
    pub async fn stop(&mut self) {
        info!(station = %self.template.station_id, "stopping station");
        self.cache.fail_all_stopped();
        for connector in self.connectors.values_mut() {
            connector.stop_transaction();
            connector.availability = Availability::Inoperative;
        }
        self.transport.close(1000, "station stopped").await;
    }

    /// Sends an outbound Call through the full admission/validate/frame/
    /// cache/transport-or-buffer pipeline (§4.F).
    pub async fn send(
        &mut self,
        command: &'static str,
        payload: Value,
        options: SendOptions,
    ) -> Result<oneshot::Receiver<CacheResolution>, OcppError> {
        OutboundPipeline::send(
            self.state,
            self.template.strict_compliance,
            &self.validator,
            &mut self.transport,
            &mut self.cache,
            &mut self.buffer,
            command,
            payload,
            options,
            Duration::from_secs(60),
        )
        .await
    }

    /// [Station::send] plus awaiting the resolution, for callers that just
    /// want a plain `Result` (the station actor, the ATG).
    pub async fn send_and_await(&mut self, command: &'static str, payload: Value) -> Result<Value, OcppError> {
        let receiver = self.send(command, payload, SendOptions::default()).await?;
        match receiver.await {
            Ok(CacheResolution::Response(value)) => Ok(value),
            Ok(CacheResolution::Error(error)) => Err(error),
            Err(_) => Err(OcppError::Stopped),
        }
    }

    /// Routes one inbound text frame to its command handler or to the
    /// matching cache entry (§4.G). Handlers only ever touch disjoint
    /// fields of `self` so the dispatcher's closure can hold them
    /// concurrently with `self.cache` — see [handlers::dispatch_command].
    pub async fn handle_inbound(&mut self, text: &str) -> DispatchOutcome {
        let validator = self.validator;
        let connectors = &mut self.connectors;
        let configuration = &mut self.configuration;
        let pending_actions = &mut self.pending_actions;

        Dispatcher::dispatch(text, &validator, &mut self.cache, |command, payload| async move {
            handlers::dispatch_command(&command, payload, connectors, configuration, pending_actions)
        })
        .await
    }

    /// Recomputes the power divider (§4.H step 6): the running-transaction
    /// count when `powerSharedByConnectors` is set, otherwise the station's
    /// connector count, exactly as provisioned.
    pub fn current_power_divider(&self) -> u32 {
        if self.template.power_shared_by_connectors {
            self.connectors
                .values()
                .filter(|c| c.id != 0 && c.transaction_started())
                .count()
                .max(1) as u32
        } else {
            self.connectors.len().saturating_sub(1).max(1) as u32
        }
    }

    /// `getConnectorMaximumAvailablePower` (§4.H): the station's rated
    /// power divided by the current divider, tightened by any ChargingProfile
    /// currently active on the connector. `None` if `connector_id` doesn't
    /// exist on this station.
    pub fn connector_maximum_available_power(&self, connector_id: ConnectorId) -> Option<f64> {
        let connector = self.connectors.get(&connector_id)?;
        let phases = self
            .connector_template_for(connector_id)
            .map(|spec| spec.number_of_phases)
            .unwrap_or(1);
        let active_limit = power::select_active_limit_w(
            &connector.charging_profiles,
            Utc::now(),
            connector.transaction_started_at,
            phases,
        );
        Some(power::connector_maximum_available_power(
            self.template.max_power_w,
            self.current_power_divider(),
            None,
            active_limit,
        ))
    }

    /// Persists the current configuration store to disk (§4.H step 2, §5):
    /// called after a ChangeConfiguration handler mutates a key.
    pub fn persist_configuration(&self) {
        if let Err(e) = config::persist(&self.config_path, &self.hash_id, &self.configuration) {
            warn!(station = %self.template.station_id, error = %e, "failed to persist station configuration");
        }
    }
}

impl Station<Transport> {
    /// Initializes a station from its template, building a live [Transport]
    /// from its supervision url policy (§4.H steps 1-7).
    pub fn new(template: StationTemplate) -> Self {
        let hash_id = template.hash_id();
        let supervision_url = resolve_supervision_url(&template, &hash_id);
        let transport = Transport::new(TransportConfig {
            supervision_url,
            station_id: template.station_id.clone(),
            subprotocol: "ocpp1.6".to_string(),
            basic_auth: template
                .basic_auth_password
                .clone()
                .map(|password| (template.station_id.clone(), password)),
            handshake_timeout: Duration::from_secs(10),
            auto_reconnect_max_retries: -1,
            reconnect_exponential_delay: true,
        });
        Self::with_transport(template, transport)
    }
}

/// Picks a supervision URL according to the template's policy (§4.H step 3).
/// `RoundRobin` degenerates to the first URL here since a station only
/// resolves its URL once, at construction; reconnection re-uses the same
/// resolved URL rather than re-rolling it.
fn resolve_supervision_url(template: &StationTemplate, hash_id: &str) -> String {
    let urls = &template.supervision_urls;
    if urls.len() == 1 {
        return urls[0].clone();
    }
    match template.supervision_url_policy {
        SupervisionUrlPolicy::Sequential | SupervisionUrlPolicy::RoundRobin => urls[0].clone(),
        SupervisionUrlPolicy::Random => {
            // Deterministic "random" seeded from the station's own hash id so
            // repeated runs against the same template pick the same url.
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed_from_hash(hash_id));
            urls.choose(&mut rng).cloned().unwrap_or_else(|| urls[0].clone())
        }
    }
}

fn seed_from_hash(hash_id: &str) -> u64 {
    u64::from_str_radix(&hash_id[..16.min(hash_id.len())], 16).unwrap_or(0)
}

/// Builds connector 0 (the station itself) plus the runtime connectors for
/// `template` (§4.H step 4). When `desiredNumberOfConnectors` is unset, the
/// template's entries are used 1:1. Otherwise the desired count is built by
/// cycling through the template's entries in order, unless `randomConnectors`
/// is set or the desired count exceeds the distinct template entries — in
/// either case entries are picked at random (seeded from the station hash
/// id, so repeated builds of the same template agree).
fn build_connectors(
    template: &StationTemplate,
    hash_id: &str,
) -> (HashMap<ConnectorId, Connector>, HashMap<ConnectorId, u32>) {
    let mut connectors = HashMap::new();
    let mut specs = HashMap::new();
    connectors.insert(0, Connector::new(0));

    let entries = &template.connectors;
    let desired = template
        .desired_number_of_connectors
        .unwrap_or(entries.len() as u32)
        .max(1);
    let force_random = template.random_connectors.unwrap_or(false) || desired as usize > entries.len();

    if template.desired_number_of_connectors.is_none() {
        for entry in entries {
            connectors.insert(entry.id, Connector::new(entry.id));
            specs.insert(entry.id, entry.id);
        }
    } else if force_random {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed_from_hash(hash_id));
        for id in 1..=desired {
            let entry = entries
                .choose(&mut rng)
                .expect("a validated template always has at least one connector entry");
            connectors.insert(id, Connector::new(id));
            specs.insert(id, entry.id);
        }
    } else {
        for (index, entry) in entries.iter().cycle().take(desired as usize).enumerate() {
            let id = index as u32 + 1;
            connectors.insert(id, Connector::new(id));
            specs.insert(id, entry.id);
        }
    }

    (connectors, specs)
}

/// Seeds the mandatory OCPP 1.6 configuration keys derived from the
/// template (§4.H step 5): NumberOfConnectors, MeterValuesSampledData,
/// ConnectorPhaseRotation, AuthorizeRemoteTxRequests, SupportedFeatureProfiles
/// (and, gated on it listing `LocalAuthListManagement`, LocalAuthListEnabled),
/// ConnectionTimeOut, and the optional supervision-url key.
fn seed_configuration(store: &mut ConfigurationKeyStore, template: &StationTemplate, number_of_connectors: u32) {
    store.add(
        ConfigurationKey::new("NumberOfConnectors", number_of_connectors.to_string(), true),
        true,
    );
    store.add(
        ConfigurationKey::new("MeterValuesSampledData", "Energy.Active.Import.Register", false),
        true,
    );
    store.add(
        ConfigurationKey::new(
            "ConnectorPhaseRotation",
            template
                .connectors
                .iter()
                .map(|c| format!("{}.RST", c.id))
                .collect::<Vec<_>>()
                .join(","),
            false,
        ),
        true,
    );
    store.add(
        ConfigurationKey::new("AuthorizeRemoteTxRequests", "false", false),
        true,
    );
    store.add(
        ConfigurationKey::new(
            "SupportedFeatureProfiles",
            template.supported_feature_profiles.join(","),
            true,
        ),
        true,
    );
    if template
        .supported_feature_profiles
        .iter()
        .any(|profile| profile == "LocalAuthListManagement")
    {
        store.add(
            ConfigurationKey::new("LocalAuthListEnabled", "false", false),
            true,
        );
    }
    store.add(ConfigurationKey::new("ConnectionTimeOut", "60", false), true);
    store.add(ConfigurationKey::new("HeartbeatInterval", "60", false), true);
    store.add(ConfigurationKey::new("MeterValueSampleInterval", "60", false), true);
    if let Some(first_url) = template.supervision_urls.first() {
        store.add(ConfigurationKey::new("SupervisionURL", first_url.clone(), true), true);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::MockTransport;

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
            connectors: vec![template::ConnectorTemplate {
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

    fn scratch_config_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "ocpp-station-mod-test-{name}-{:?}.json",
            std::thread::current().id()
        ))
    }

    fn station_with_template(name: &str, t: StationTemplate) -> Station<MockTransport> {
        let path = scratch_config_path(name);
        let _ = std::fs::remove_file(&path);
        Station::with_transport_and_config_path(t, MockTransport::new(), path)
    }

    #[test]
    fn new_station_has_connector_zero_plus_template_connectors() {
        let station = station_with_template("connector-zero", template());
        assert!(station.connectors.contains_key(&0));
        assert!(station.connectors.contains_key(&1));
        assert_eq!(station.state, RegistrationState::Unknown);
    }

    #[test]
    fn auto_register_skips_straight_to_accepted() {
        let mut t = template();
        t.auto_register = true;
        let station = station_with_template("auto-register", t);
        assert_eq!(station.state, RegistrationState::Accepted);
    }

    #[test]
    fn seeded_configuration_has_number_of_connectors() {
        let station = station_with_template("number-of-connectors", template());
        assert_eq!(station.configuration.get("NumberOfConnectors").unwrap().value, "1");
    }

    #[test]
    fn single_url_template_resolves_directly() {
        let url = resolve_supervision_url(&template(), "deadbeef");
        assert_eq!(url, "wss://example.invalid/ocpp");
    }

    #[test]
    fn local_auth_list_enabled_is_gated_on_feature_profile() {
        let mut t = template();
        let station = station_with_template("no-lalm", t.clone());
        assert!(station.configuration.get("LocalAuthListEnabled").is_none());

        t.supported_feature_profiles = vec!["LocalAuthListManagement".into()];
        let station = station_with_template("with-lalm", t);
        assert_eq!(station.configuration.get("LocalAuthListEnabled").unwrap().value, "false");
    }

    #[test]
    fn desired_connector_count_below_template_entries_is_not_forced_random() {
        let mut t = template();
        t.connectors = vec![
            template::ConnectorTemplate { id: 1, number_of_phases: 1, max_power_w: 7_000.0, meter_values: vec![] },
            template::ConnectorTemplate { id: 2, number_of_phases: 3, max_power_w: 22_000.0, meter_values: vec![] },
        ];
        t.desired_number_of_connectors = Some(1);
        let station = station_with_template("desired-below", t);
        assert_eq!(station.connectors.len(), 2); // connector 0 + connector 1
        assert_eq!(station.connector_specs.get(&1), Some(&1));
    }

    #[test]
    fn desired_connector_count_above_template_entries_forces_random_selection() {
        let mut t = template();
        t.desired_number_of_connectors = Some(3);
        let station = station_with_template("desired-above", t);
        assert_eq!(station.connectors.len(), 4); // connector 0 + 3 runtime connectors
        for id in 1..=3 {
            assert!(station.connector_specs.contains_key(&id));
        }
    }

    #[test]
    fn power_shared_by_connectors_counts_running_transactions() {
        let mut t = template();
        t.power_shared_by_connectors = true;
        t.connectors.push(template::ConnectorTemplate { id: 2, number_of_phases: 1, max_power_w: 7_000.0, meter_values: vec![] });
        let mut station = station_with_template("power-shared", t);
        assert_eq!(station.current_power_divider(), 1);
        station.connector_mut(1).unwrap().start_transaction(1, "TAG".into());
        assert_eq!(station.current_power_divider(), 1);
        station.connector_mut(2).unwrap().start_transaction(2, "TAG2".into());
        assert_eq!(station.current_power_divider(), 2);
    }
}
