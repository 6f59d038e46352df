//! Supervisor-facing event/control types (§6, §9): plain serializable
//! messages a future supervisor process could use to drive or observe
//! stations over a channel, rather than via a cyclic callback.

use serde::{Deserialize, Serialize};

use crate::session::state::RegistrationState;

/// Something a station wants to tell the outside world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum StationEvent {
    RegistrationChanged {
        station_id: String,
        state: RegistrationState,
    },
    ConnectorStatusChanged {
        station_id: String,
        connector_id: u32,
        status: String,
    },
    TransactionStarted {
        station_id: String,
        connector_id: u32,
        transaction_id: u32,
    },
    TransactionStopped {
        station_id: String,
        connector_id: u32,
        transaction_id: u32,
        energy_wh: f64,
    },
    TransportClosed {
        station_id: String,
        code: Option<u16>,
    },
}

/// Something the outside world wants a station to do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ControlMessage {
    StartStation { station_id: String },
    Stop { station_id: String },
    TemplateChanged { station_id: String },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn station_event_round_trips_through_json() {
        let event = StationEvent::TransactionStarted {
            station_id: "CP001".into(),
            connector_id: 1,
            transaction_id: 42,
        };
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: StationEvent = serde_json::from_str(&encoded).unwrap();
        assert!(matches!(decoded, StationEvent::TransactionStarted { transaction_id: 42, .. }));
    }

    #[test]
    fn control_message_round_trips_through_json() {
        let message = ControlMessage::Stop {
            station_id: "CP001".into(),
        };
        let encoded = serde_json::to_string(&message).unwrap();
        let decoded: ControlMessage = serde_json::from_str(&encoded).unwrap();
        assert!(matches!(decoded, ControlMessage::Stop { .. }));
    }
}
