//! The station actor (§4.E-§4.J): the `tokio::select!` loop that actually
//! drives a [Station] — opening the transport, running the BootNotification
//! registration loop, dispatching inbound frames, arming/ticking timers,
//! draining the queue of [super::PendingAction]s left by inbound handlers,
//! and running each connector's Automatic Transaction Generator. Everything
//! else in this crate is plumbing this function wires together.
//!
//! The loop itself never awaits a Call's response inline — only [StationHandle::send]
//! does that, from a task spawned off the loop. A response is only ever
//! delivered by this same loop's `transport.next_event()` branch dispatching
//! the matching CallResult/CallError, so blocking the loop on a response
//! would deadlock it against itself. Registration, RemoteStart and RemoteStop
//! all round-trip through `handle.send` for exactly this reason; anything
//! whose response nobody needs (Heartbeat ticks, MeterValues, status/firmware/
//! diagnostics notifications) is enqueued and its receiver dropped.

use std::time::{Duration, Instant};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::atg;
use crate::cache::CacheResolution;
use crate::core::{
    BootNotificationRequest, BootNotificationStatus, HeartbeatRequest, MessageTrigger, MeterValuesRequest,
    StatusNotificationErrorCode, StatusNotificationRequest, StatusNotificationStatus as ChargePointStatus,
};
use crate::error::OcppError;
use crate::session::inbound::DispatchOutcome;
use crate::session::outbound::SendOptions;
use crate::session::state::RegistrationState;
use crate::station::connector::ConnectorId;
use crate::station::meter;
use crate::station::template::StationTemplate;
use crate::timers::{self, StationTimers};
use crate::transport::{is_intentional_close, StationTransport, TransportEvent};

use super::{PendingAction, Station};

const BOOT_NOTIFICATION: &str = "BootNotification";
const RECONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);
const PING_PERIOD: Duration = Duration::from_secs(30);

/// A command sent to a running station actor. Only `Send` and `Stop` are
/// reachable from outside this module (via [StationHandle]); the rest are
/// how the actor talks to itself from tasks it spawned, since those tasks
/// hold no `&mut Station`.
pub enum ActorCommand {
    Send {
        command: &'static str,
        payload: Value,
        respond_to: oneshot::Sender<Result<Value, OcppError>>,
    },
    Stop,
    RegistrationOutcome(BootOutcome),
    RemoteStartOutcome {
        connector_id: ConnectorId,
        id_tag: String,
        outcome: Result<Value, OcppError>,
    },
    RemoteStopOutcome {
        transaction_id: u32,
        outcome: Result<Value, OcppError>,
    },
}

pub enum BootOutcome {
    Settled { status: BootNotificationStatus, interval: u64 },
    SendFailed,
}

#[derive(Clone)]
pub struct StationHandle {
    tx: mpsc::Sender<ActorCommand>,
}

impl StationHandle {
    /// Sends a Call through the station and awaits its CallResult/CallError,
    /// same as [Station::send_and_await] but safe to call from any task —
    /// the enqueue step runs on the actor loop, the wait runs here. This is
    /// the only way to get a Call's response without risking a deadlock: the
    /// actor loop must stay free to dispatch the inbound frame that resolves
    /// it.
    pub async fn send(&self, command: &'static str, payload: Value) -> Result<Value, OcppError> {
        let (respond_to, rx) = oneshot::channel();
        self.tx
            .send(ActorCommand::Send { command, payload, respond_to })
            .await
            .map_err(|_| OcppError::Stopped)?;
        rx.await.map_err(|_| OcppError::Stopped)?
    }

    pub async fn request_stop(&self) {
        let _ = self.tx.send(ActorCommand::Stop).await;
    }

    async fn post(&self, command: ActorCommand) {
        let _ = self.tx.send(command).await;
    }
}

pub fn spawn<T: StationTransport + 'static>(station: Station<T>) -> (StationHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(32);
    let handle = StationHandle { tx };
    let actor_handle = handle.clone();
    let join = tokio::spawn(run_actor(station, rx, actor_handle));
    (handle, join)
}

pub async fn run_actor<T: StationTransport>(
    mut station: Station<T>,
    mut command_rx: mpsc::Receiver<ActorCommand>,
    handle: StationHandle,
) {
    let mut timers = StationTimers::new();

    if let Err(e) = station.start().await {
        warn!(station = %station.template.station_id, error = %e, "initial connect failed");
        reconnect_and_register(&mut station, &mut timers, &handle).await;
    } else if station.template.auto_register {
        arm_timers(&mut station, &mut timers);
        flush_buffer(&mut station).await;
    } else {
        start_registration(&station, &handle);
    }

    maybe_start_atg(&station, &handle);

    let mut rng = StdRng::seed_from_u64(super::seed_from_hash(&station.hash_id));

    loop {
        tokio::select! {
            biased;

            command = command_rx.recv() => {
                match command {
                    None | Some(ActorCommand::Stop) => {
                        station.stop().await;
                        break;
                    }
                    Some(ActorCommand::Send { command, payload, respond_to }) => {
                        match station.send(command, payload, SendOptions::default()).await {
                            Ok(receiver) => {
                                tokio::spawn(async move {
                                    let result = match receiver.await {
                                        Ok(CacheResolution::Response(value)) => Ok(value),
                                        Ok(CacheResolution::Error(error)) => Err(error),
                                        Err(_) => Err(OcppError::Stopped),
                                    };
                                    let _ = respond_to.send(result);
                                });
                            }
                            Err(e) => {
                                let _ = respond_to.send(Err(e));
                            }
                        }
                    }
                    Some(ActorCommand::RegistrationOutcome(outcome)) => {
                        apply_registration_outcome(&mut station, &mut timers, outcome).await;
                    }
                    Some(ActorCommand::RemoteStartOutcome { connector_id, id_tag, outcome }) => {
                        apply_remote_start_outcome(&mut station, connector_id, id_tag, outcome).await;
                    }
                    Some(ActorCommand::RemoteStopOutcome { transaction_id, outcome }) => {
                        apply_remote_stop_outcome(&mut station, transaction_id, outcome).await;
                    }
                }
            }

            event = station.transport.next_event() => {
                match event {
                    Some(TransportEvent::Frame(text)) => {
                        if let DispatchOutcome::Reply(frame) = station.handle_inbound(&text).await {
                            if let Ok(encoded) = frame.encode_to_string() {
                                let _ = station.transport.send_text(encoded).await;
                            }
                        }
                        drain_pending_actions(&mut station, &mut timers, &mut rng, &handle).await;
                    }
                    Some(TransportEvent::Ping) | Some(TransportEvent::Pong) => {}
                    Some(TransportEvent::Closed(code)) => {
                        if is_intentional_close(code) {
                            info!(station = %station.template.station_id, "transport closed intentionally");
                            break;
                        }
                        reconnect_and_register(&mut station, &mut timers, &handle).await;
                    }
                    Some(TransportEvent::Error(e)) => {
                        warn!(station = %station.template.station_id, error = %e, "transport error");
                        reconnect_and_register(&mut station, &mut timers, &handle).await;
                    }
                    None => {
                        reconnect_and_register(&mut station, &mut timers, &handle).await;
                    }
                }
            }

            _ = timers.heartbeat.tick() => {
                let _ = station.send("Heartbeat", json!(HeartbeatRequest {}), SendOptions::default()).await;
            }

            _ = timers.ping.tick() => {
                let _ = station.transport.send_ping().await;
            }

            _ = timers.meter.tick() => {
                send_all_meter_values(&mut station, &mut timers, &mut rng).await;
            }
        }
    }
}

/// Kicks off the BootNotification registration loop (§4.F) as a task
/// independent of the actor loop: it round-trips through [StationHandle::send]
/// and reports back via `ActorCommand::RegistrationOutcome`, so the actor
/// loop is free to keep servicing `transport.next_event()` — including the
/// very response this task is waiting on — while it runs. A no-op for
/// `autoRegister` templates, which are already `Accepted`.
fn start_registration<T: StationTransport>(station: &Station<T>, handle: &StationHandle) {
    if station.template.auto_register {
        return;
    }
    tokio::spawn(registration_task(station.template.clone(), handle.clone()));
}

async fn registration_task(template: StationTemplate, handle: StationHandle) {
    loop {
        let request = BootNotificationRequest {
            charge_point_vendor: template.charge_point_vendor.clone(),
            charge_point_model: template.charge_point_model.clone(),
            charge_point_serial_number: template.charge_point_serial_number.clone(),
            charge_box_serial_number: None,
            firmware_version: template.firmware_version.clone(),
            iccid: None,
            imsi: None,
            meter_type: None,
            meter_serial_number: None,
        };
        let Ok(payload) = serde_json::to_value(&request) else { return };

        match handle.send(BOOT_NOTIFICATION, payload).await {
            Ok(value) => {
                let status: BootNotificationStatus =
                    serde_json::from_value(value["status"].clone()).unwrap_or(BootNotificationStatus::Rejected);
                let interval = value["interval"].as_u64().unwrap_or(60).max(1);
                let retry = matches!(status, BootNotificationStatus::Pending);
                handle
                    .post(ActorCommand::RegistrationOutcome(BootOutcome::Settled { status, interval }))
                    .await;
                if retry {
                    tokio::time::sleep(Duration::from_secs(interval)).await;
                    continue;
                }
                return;
            }
            Err(e) => {
                warn!(station = %template.station_id, error = %e, "failed to send BootNotification");
                handle.post(ActorCommand::RegistrationOutcome(BootOutcome::SendFailed)).await;
                tokio::time::sleep(RECONNECT_RETRY_DELAY).await;
            }
        }
    }
}

async fn apply_registration_outcome<T: StationTransport>(
    station: &mut Station<T>,
    timers: &mut StationTimers,
    outcome: BootOutcome,
) {
    let BootOutcome::Settled { status, interval } = outcome else {
        return;
    };
    station.state = RegistrationState::from_boot_notification_status(&status);
    if matches!(station.state, RegistrationState::Accepted) {
        station.configuration.set("HeartbeatInterval", interval.to_string());
        arm_timers(station, timers);
        flush_buffer(station).await;
    }
}

fn arm_timers<T: StationTransport>(station: &Station<T>, timers: &mut StationTimers) {
    match timers::heartbeat_period(&station.configuration) {
        Some(period) => timers.heartbeat.arm(period),
        None => timers.heartbeat.disarm(),
    }
    timers.ping.arm_if_disarmed(PING_PERIOD);

    let any_transaction_running = station.connectors.values().any(|c| c.meter_values_timer_armed);
    if any_transaction_running {
        if let Some(period) = timers::meter_values_period(&station.configuration) {
            timers.meter.arm_if_disarmed(period);
        }
    } else {
        timers.meter.disarm();
    }
}

async fn flush_buffer<T: StationTransport>(station: &mut Station<T>) {
    let transport = &mut station.transport;
    let buffer = &mut station.buffer;
    buffer.flush(|frame| transport.send_text(frame)).await;
}

async fn reconnect_and_register<T: StationTransport>(
    station: &mut Station<T>,
    timers: &mut StationTimers,
    handle: &StationHandle,
) {
    timers.clear();
    if !station.template.auto_register {
        station.state = RegistrationState::Unknown;
    }
    loop {
        match station.transport.reconnect().await {
            Ok(()) => break,
            Err(e) => {
                warn!(station = %station.template.station_id, error = %e, "reconnect attempt failed");
                tokio::time::sleep(RECONNECT_RETRY_DELAY).await;
            }
        }
    }
    if station.template.auto_register {
        arm_timers(station, timers);
        flush_buffer(station).await;
    } else {
        start_registration(station, handle);
    }
}

async fn drain_pending_actions<T: StationTransport>(
    station: &mut Station<T>,
    timers: &mut StationTimers,
    rng: &mut StdRng,
    handle: &StationHandle,
) {
    let actions = std::mem::take(&mut station.pending_actions);
    for action in actions {
        match action {
            PendingAction::Reboot => {
                for connector in station.connectors.values_mut() {
                    connector.stop_transaction();
                }
                station.transport.close(1000, "reset").await;
                reconnect_and_register(station, timers, handle).await;
            }
            PendingAction::RemoteStart { connector_id, id_tag, charging_profile } => {
                if let Some(profile) = charging_profile {
                    if let Some(connector) = station.connector_mut(connector_id) {
                        connector.charging_profiles.push(profile);
                    }
                }
                tokio::spawn(remote_start_task(connector_id, id_tag, handle.clone()));
            }
            PendingAction::RemoteStop { transaction_id } => {
                let meter_stop = station
                    .connectors
                    .values()
                    .find(|c| c.transaction_id == Some(transaction_id))
                    .map(|c| c.transaction_energy_wh.round() as i64)
                    .unwrap_or(0);
                tokio::spawn(remote_stop_task(transaction_id, meter_stop, handle.clone()));
            }
            PendingAction::UploadDiagnostics { file_name } => {
                let _ = station
                    .send("DiagnosticsStatusNotification", json!({ "status": "Uploaded" }), SendOptions::default())
                    .await;
                info!(station = %station.template.station_id, file_name, "diagnostics upload simulated");
            }
            PendingAction::Trigger { message, connector_id } => {
                send_triggered_message(station, message, connector_id, timers, rng, handle).await;
            }
        }
    }
}

/// Sends StartTransaction and reports the outcome back to the actor loop.
/// Runs independently of the loop so the loop stays free to dispatch the
/// CallResult this call is waiting on.
async fn remote_start_task(connector_id: ConnectorId, id_tag: String, handle: StationHandle) {
    let payload = json!({
        "connectorId": connector_id,
        "idTag": id_tag,
        "meterStart": 0,
        "timestamp": Utc::now().to_rfc3339(),
    });
    let outcome = handle.send("StartTransaction", payload).await;
    handle
        .post(ActorCommand::RemoteStartOutcome { connector_id, id_tag, outcome })
        .await;
}

async fn remote_stop_task(transaction_id: u32, meter_stop: i64, handle: StationHandle) {
    let payload = json!({
        "transactionId": transaction_id,
        "meterStop": meter_stop,
        "timestamp": Utc::now().to_rfc3339(),
        "reason": "Remote",
    });
    let outcome = handle.send("StopTransaction", payload).await;
    handle
        .post(ActorCommand::RemoteStopOutcome { transaction_id, outcome })
        .await;
}

async fn apply_remote_start_outcome<T: StationTransport>(
    station: &mut Station<T>,
    connector_id: ConnectorId,
    id_tag: String,
    outcome: Result<Value, OcppError>,
) {
    match outcome {
        Ok(response) => {
            let status = response["idTagInfo"]["status"].as_str().unwrap_or("Rejected");
            if status != "Accepted" {
                return;
            }
            let transaction_id = response["transactionId"].as_u64().unwrap_or(0) as u32;
            if let Some(connector) = station.connector_mut(connector_id) {
                connector.start_transaction(transaction_id, id_tag);
                connector.set_status(ChargePointStatus::Charging);
            }
            send_status_notification(station, connector_id).await;
        }
        Err(e) => warn!(connector_id, error = %e, "remote-started StartTransaction failed"),
    }
}

async fn apply_remote_stop_outcome<T: StationTransport>(
    station: &mut Station<T>,
    transaction_id: u32,
    outcome: Result<Value, OcppError>,
) {
    match outcome {
        Ok(_) => {
            let connector_id = station
                .connectors
                .iter()
                .find(|(_, c)| c.transaction_id == Some(transaction_id))
                .map(|(id, _)| *id);
            let Some(connector_id) = connector_id else { return };
            if let Some(connector) = station.connector_mut(connector_id) {
                connector.stop_transaction();
                connector.set_status(ChargePointStatus::Available);
            }
            send_status_notification(station, connector_id).await;
        }
        Err(e) => warn!(transaction_id, error = %e, "remote-stopped StopTransaction failed"),
    }
}

async fn send_triggered_message<T: StationTransport>(
    station: &mut Station<T>,
    message: MessageTrigger,
    connector_id: Option<ConnectorId>,
    timers: &mut StationTimers,
    rng: &mut StdRng,
    handle: &StationHandle,
) {
    match message {
        MessageTrigger::BootNotification => start_registration(station, handle),
        MessageTrigger::Heartbeat => {
            let _ = station.send("Heartbeat", json!(HeartbeatRequest {}), SendOptions::default()).await;
        }
        MessageTrigger::StatusNotification => {
            let ids: Vec<ConnectorId> = match connector_id {
                Some(id) => vec![id],
                None => station.connectors.keys().copied().collect(),
            };
            for id in ids {
                send_status_notification(station, id).await;
            }
        }
        MessageTrigger::MeterValues => {
            let ids: Vec<ConnectorId> = match connector_id {
                Some(id) => vec![id],
                None => station.connectors.keys().copied().filter(|id| *id != 0).collect(),
            };
            let period_seconds = timers::meter_values_period(&station.configuration)
                .map(|d| d.as_secs() as u32)
                .unwrap_or(60);
            for id in ids {
                send_meter_values(station, id, period_seconds, rng).await;
            }
        }
        MessageTrigger::DiagnosticsStatusNotification => {
            let _ = station
                .send("DiagnosticsStatusNotification", json!({ "status": "Idle" }), SendOptions::default())
                .await;
        }
        MessageTrigger::FirmwareStatusNotification => {
            let _ = station
                .send("FirmwareStatusNotification", json!({ "status": "Idle" }), SendOptions::default())
                .await;
        }
    }
}

async fn send_status_notification<T: StationTransport>(station: &mut Station<T>, connector_id: ConnectorId) {
    let Some(status) = station.connector(connector_id).map(|c| c.status) else { return };
    let request = StatusNotificationRequest {
        connector_id,
        error_code: StatusNotificationErrorCode::NoError,
        info: None,
        status,
        timestamp: Utc::now(),
        vendor_id: None,
        vendor_error_code: None,
    };
    let Ok(payload) = serde_json::to_value(&request) else { return };
    let _ = station.send("StatusNotification", payload, SendOptions::default()).await;
}

async fn send_all_meter_values<T: StationTransport>(station: &mut Station<T>, timers: &mut StationTimers, rng: &mut StdRng) {
    let period_seconds = timers.meter.period().map(|d| d.as_secs() as u32).unwrap_or(60);
    let ids: Vec<ConnectorId> = station
        .connectors
        .iter()
        .filter(|(id, c)| **id != 0 && c.meter_values_timer_armed)
        .map(|(id, _)| *id)
        .collect();
    for id in ids {
        send_meter_values(station, id, period_seconds, rng).await;
    }
}

async fn send_meter_values<T: StationTransport>(
    station: &mut Station<T>,
    connector_id: ConnectorId,
    period_seconds: u32,
    rng: &mut StdRng,
) {
    if connector_id == 0 {
        return;
    }
    let phases = station
        .connector_template_for(connector_id)
        .map(|spec| spec.number_of_phases)
        .unwrap_or(1);
    let templates: Vec<meter::MeterValuesTemplate> = station
        .connector_template_for(connector_id)
        .map(|spec| spec.meter_values.iter().filter_map(|m| m.to_runtime()).collect())
        .unwrap_or_default();
    let connector_maximum_w = station.connector_maximum_available_power(connector_id).unwrap_or(0.0);

    let Some(connector) = station.connector_mut(connector_id) else { return };
    if !connector.meter_values_timer_armed {
        return;
    }
    let transaction_id = connector.transaction_id;
    connector.accumulate_energy(meter::energy_increment_wh(connector_maximum_w, period_seconds));
    let meter_value = meter::build_meter_value(&templates, connector_maximum_w, phases, rng);

    let request = MeterValuesRequest { connector_id, transaction_id, meter_value: vec![meter_value] };
    let Ok(payload) = serde_json::to_value(&request) else { return };
    let _ = station.send("MeterValues", payload, SendOptions::default()).await;
}

fn maybe_start_atg<T: StationTransport>(station: &Station<T>, handle: &StationHandle) {
    let Some(atg_config) = station.template.atg.clone() else { return };
    if !atg_config.enabled {
        return;
    }
    let require_authorize = station
        .configuration
        .get("AuthorizeRemoteTxRequests")
        .map(|k| k.value == "true")
        .unwrap_or(false);

    for connector_id in station.connectors.keys().copied().filter(|id| *id != 0) {
        let config = atg_config.clone();
        let handle = handle.clone();
        let connector_maximum_w = station
            .connector_maximum_available_power(connector_id)
            .unwrap_or(station.template.max_power_w);
        let seed = super::seed_from_hash(&station.hash_id) ^ (connector_id as u64).wrapping_mul(0x9E37_79B9);
        tokio::spawn(run_atg_loop(connector_id, config, connector_maximum_w, require_authorize, seed, handle));
    }
}

async fn run_atg_loop(
    connector_id: ConnectorId,
    config: crate::station::template::AtgConfig,
    connector_maximum_w: f64,
    require_authorize: bool,
    seed: u64,
    handle: StationHandle,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let started_at = Instant::now();
    loop {
        if atg::should_stop(&config, started_at) {
            return;
        }
        tokio::time::sleep(atg::delay_before_start(&config, &mut rng)).await;
        if atg::should_stop(&config, started_at) {
            return;
        }
        if !atg::should_start_cycle(config.start_probability, &mut rng) {
            continue;
        }
        let result = atg::run_cycle(connector_id, &config, connector_maximum_w, require_authorize, &mut rng, |command, payload| {
            let handle = handle.clone();
            async move { handle.send(command, payload).await }
        })
        .await;
        if let Err(e) = result {
            match e {
                OcppError::Stopped => return,
                other => error!(connector_id, error = %other, "ATG cycle failed"),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::station::template::{ConnectorTemplate, SupervisionUrlPolicy};
    use crate::transport::MockTransport;
    use crate::wire::Frame;

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

    fn scratch_config_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "ocpp-station-actor-test-{name}-{:?}.json",
            std::thread::current().id()
        ))
    }

    fn message_id_of(frame_text: &str) -> String {
        let value: Value = serde_json::from_str(frame_text).unwrap();
        value[1].as_str().unwrap().to_string()
    }

    async fn recv_sent(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for a sent frame")
            .expect("sent channel closed")
    }

    #[tokio::test]
    async fn scenario_boot_accepted_then_admits_heartbeat() {
        let mut transport = MockTransport::new();
        let mut sent = transport.sent_observer();
        let injector = transport.inbound_injector();
        let path = scratch_config_path("s1-boot-accepted");
        let _ = std::fs::remove_file(&path);
        let station = Station::with_transport_and_config_path(template(), transport, path);
        let (handle, _join) = spawn(station);

        let boot_frame = recv_sent(&mut sent).await;
        assert!(boot_frame.contains("BootNotification"));
        let message_id = message_id_of(&boot_frame);

        injector
            .send(TransportEvent::Frame(format!(
                r#"[3,"{message_id}",{{"status":"Accepted","currentTime":"2026-01-01T00:00:00Z","interval":300}}]"#
            )))
            .unwrap();

        tokio::spawn({
            let handle = handle.clone();
            async move {
                let _ = handle.send("Heartbeat", json!(HeartbeatRequest {})).await;
            }
        });

        let heartbeat_frame = recv_sent(&mut sent).await;
        assert!(heartbeat_frame.contains("Heartbeat"));
    }

    #[tokio::test]
    async fn scenario_boot_pending_retries_then_accepts() {
        let mut transport = MockTransport::new();
        let mut sent = transport.sent_observer();
        let injector = transport.inbound_injector();
        let path = scratch_config_path("s2-boot-pending");
        let _ = std::fs::remove_file(&path);
        let station = Station::with_transport_and_config_path(template(), transport, path);
        let (handle, _join) = spawn(station);

        let first = recv_sent(&mut sent).await;
        let first_id = message_id_of(&first);
        injector
            .send(TransportEvent::Frame(format!(
                r#"[3,"{first_id}",{{"status":"Pending","currentTime":"2026-01-01T00:00:00Z","interval":1}}]"#
            )))
            .unwrap();

        let second = tokio::time::timeout(Duration::from_secs(3), sent.recv())
            .await
            .expect("expected a retried BootNotification")
            .expect("sent channel closed");
        assert!(second.contains("BootNotification"));
        let second_id = message_id_of(&second);
        injector
            .send(TransportEvent::Frame(format!(
                r#"[3,"{second_id}",{{"status":"Accepted","currentTime":"2026-01-01T00:00:00Z","interval":300}}]"#
            )))
            .unwrap();

        tokio::spawn({
            let handle = handle.clone();
            async move {
                let _ = handle.send("Heartbeat", json!(HeartbeatRequest {})).await;
            }
        });
        let heartbeat_frame = recv_sent(&mut sent).await;
        assert!(heartbeat_frame.contains("Heartbeat"));
    }

    #[tokio::test]
    async fn scenario_remote_start_then_remote_stop_drives_transaction_lifecycle() {
        let mut transport = MockTransport::new();
        let mut sent = transport.sent_observer();
        let injector = transport.inbound_injector();
        let mut t = template();
        t.auto_register = true;
        let path = scratch_config_path("s4-remote-start-stop");
        let _ = std::fs::remove_file(&path);
        let station = Station::with_transport_and_config_path(t, transport, path);
        let (_handle, _join) = spawn(station);

        injector
            .send(TransportEvent::Frame(
                r#"[2,"rs1","RemoteStartTransaction",{"connectorId":1,"idTag":"TAG1"}]"#.to_string(),
            ))
            .unwrap();

        let remote_start_reply = recv_sent(&mut sent).await;
        assert!(remote_start_reply.contains("\"rs1\""));

        let start_transaction_call = recv_sent(&mut sent).await;
        assert!(start_transaction_call.contains("StartTransaction"));
        let start_id = message_id_of(&start_transaction_call);
        injector
            .send(TransportEvent::Frame(format!(
                r#"[3,"{start_id}",{{"idTagInfo":{{"status":"Accepted"}},"transactionId":42}}]"#
            )))
            .unwrap();

        let status_notification = recv_sent(&mut sent).await;
        assert!(status_notification.contains("StatusNotification"));
        assert!(status_notification.contains("Charging"));

        injector
            .send(TransportEvent::Frame(
                r#"[2,"rs2","RemoteStopTransaction",{"transactionId":42}]"#.to_string(),
            ))
            .unwrap();

        let remote_stop_reply = recv_sent(&mut sent).await;
        assert!(remote_stop_reply.contains("\"rs2\""));

        let stop_transaction_call = recv_sent(&mut sent).await;
        assert!(stop_transaction_call.contains("StopTransaction"));
        let stop_id = message_id_of(&stop_transaction_call);
        injector
            .send(TransportEvent::Frame(format!(
                r#"[3,"{stop_id}",{{"idTagInfo":{{"status":"Accepted"}}}}]"#
            )))
            .unwrap();

        let final_status_notification = recv_sent(&mut sent).await;
        assert!(final_status_notification.contains("StatusNotification"));
        assert!(final_status_notification.contains("Available"));
    }

    #[tokio::test]
    async fn scenario_buffered_frame_flushes_after_reconnect() {
        let mut t = template();
        t.auto_register = true;
        let path = scratch_config_path("s3-reconnect-flush");
        let _ = std::fs::remove_file(&path);
        let mut station = Station::with_transport_and_config_path(t, MockTransport::new(), path);

        let _receiver = station
            .send("Heartbeat", json!(HeartbeatRequest {}), SendOptions::default())
            .await
            .unwrap();
        assert!(!station.buffer.is_empty());
        assert!(station.transport.sent.is_empty());

        station.transport.connect().await.unwrap();
        flush_buffer(&mut station).await;

        assert!(station.buffer.is_empty());
        assert_eq!(station.transport.sent.len(), 1);
        assert!(station.transport.sent[0].contains("Heartbeat"));
    }

    #[tokio::test]
    async fn scenario_unknown_command_replies_with_not_implemented_call_error() {
        let mut t = template();
        t.auto_register = true;
        let path = scratch_config_path("s5-unknown-command");
        let _ = std::fs::remove_file(&path);
        let mut station = Station::with_transport_and_config_path(t, MockTransport::new(), path);

        let outcome = station.handle_inbound(r#"[2,"m1","DoesNotExist",{}]"#).await;
        match outcome {
            DispatchOutcome::Reply(Frame::CallError { error_type, .. }) => {
                assert_eq!(error_type, "NotImplemented");
            }
            _ => panic!("expected a CallError reply"),
        }
    }
}
