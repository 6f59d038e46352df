//! Connector model (§3, §4.H): status, availability, active transaction,
//! energy registers and attached charging profiles.

use chrono::{DateTime, Utc};

use crate::common::charging_profile::ChargingProfile;
use crate::core::StatusNotificationStatus as ChargePointStatus;
use tracing::warn;

/// Connector id; 0 denotes the station itself (§3).
pub type ConnectorId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Operative,
    Inoperative,
}

#[derive(Debug, Clone)]
pub struct Connector {
    pub id: ConnectorId,
    pub availability: Availability,
    pub status: ChargePointStatus,
    pub transaction_id: Option<u32>,
    pub id_tag: Option<String>,
    /// When the running transaction started, for `Relative` ChargingProfile
    /// schedule anchoring (§3 Glossary: "ChargingProfile").
    pub transaction_started_at: Option<DateTime<Utc>>,
    /// Cumulative energy register, in Wh.
    pub energy_active_register_wh: f64,
    /// Per-transaction energy register, in Wh.
    pub transaction_energy_wh: f64,
    pub charging_profiles: Vec<ChargingProfile>,
    pub meter_values_timer_armed: bool,
}

impl Connector {
    pub fn new(id: ConnectorId) -> Self {
        Self {
            id,
            availability: Availability::Operative,
            status: ChargePointStatus::Available,
            transaction_id: None,
            id_tag: None,
            transaction_started_at: None,
            energy_active_register_wh: 0.0,
            transaction_energy_wh: 0.0,
            charging_profiles: Vec::new(),
            meter_values_timer_armed: false,
        }
    }

    pub fn transaction_started(&self) -> bool {
        self.transaction_id.is_some()
    }

    /// Starts a transaction on this connector (§3 invariant: a connector
    /// with `transactionStarted=true` has a `transactionId`; connector 0
    /// never holds a transaction).
    pub fn start_transaction(&mut self, transaction_id: u32, id_tag: String) {
        debug_assert!(self.id != 0, "connector 0 never holds a transaction");
        self.transaction_id = Some(transaction_id);
        self.id_tag = Some(id_tag);
        self.transaction_started_at = Some(Utc::now());
        self.transaction_energy_wh = 0.0;
        self.meter_values_timer_armed = true;
    }

    /// Stops the active transaction: resets `transactionStarted`, clears
    /// `transactionId`, zeros the per-transaction register, and disarms the
    /// meter-values timer (§3).
    pub fn stop_transaction(&mut self) {
        self.transaction_id = None;
        self.id_tag = None;
        self.transaction_started_at = None;
        self.transaction_energy_wh = 0.0;
        self.meter_values_timer_armed = false;
    }

    /// Advances both energy registers by an increment, zeroing either
    /// register first if it is uninitialized or negative (§4.H).
    pub fn accumulate_energy(&mut self, increment_wh: f64) {
        if self.energy_active_register_wh < 0.0 {
            self.energy_active_register_wh = 0.0;
        }
        if self.transaction_energy_wh < 0.0 {
            self.transaction_energy_wh = 0.0;
        }
        self.energy_active_register_wh += increment_wh;
        if self.transaction_started() {
            self.transaction_energy_wh += increment_wh;
        }
    }

    /// Attempts to move to `next`. Illegal transitions are logged and
    /// rejected by the caller, but the status is still recorded (§9: "the
    /// current status is still updated").
    pub fn set_status(&mut self, next: ChargePointStatus) {
        if !is_valid_transition(self.status, next) {
            warn!(connector = self.id, from = ?self.status, to = ?next, "illegal connector status transition");
        }
        self.status = next;
    }
}

/// Allowed-transitions table for `ChargePointStatus` (§4.H, §8 property 7).
/// Grounded on the OCPP 1.6 status lifecycle: a connector becomes
/// `Unavailable`/`Faulted`/`Reserved` from almost any state, and otherwise
/// progresses Available -> Preparing -> Charging -> (Suspended*) -> Finishing
/// -> Available.
pub fn is_valid_transition(from: ChargePointStatus, to: ChargePointStatus) -> bool {
    use ChargePointStatus::*;
    if from == to {
        return true;
    }
    // Faulted, Unavailable and Reserved are reachable from any state, and
    // every state can recover to Available.
    if matches!(to, Faulted | Unavailable | Reserved) || to == Available {
        return true;
    }
    matches!(
        (from, to),
        (Available, Preparing)
            | (Preparing, Charging)
            | (Preparing, SuspendedEV)
            | (Charging, SuspendedEVSE)
            | (Charging, SuspendedEV)
            | (Charging, Finishing)
            | (SuspendedEVSE, Charging)
            | (SuspendedEVSE, Finishing)
            | (SuspendedEV, Charging)
            | (SuspendedEV, Finishing)
            | (Finishing, Preparing)
            | (Unavailable, Preparing)
            | (Reserved, Preparing)
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn connector_zero_never_holds_transaction_by_convention() {
        let connector = Connector::new(0);
        assert!(!connector.transaction_started());
    }

    #[test]
    fn starting_then_stopping_clears_invariants() {
        let mut connector = Connector::new(1);
        connector.start_transaction(42, "TAG01".into());
        assert!(connector.transaction_started());
        assert!(connector.meter_values_timer_armed);

        connector.stop_transaction();
        assert!(!connector.transaction_started());
        assert!(!connector.meter_values_timer_armed);
        assert_eq!(connector.transaction_energy_wh, 0.0);
    }

    #[test]
    fn energy_accumulates_only_on_transaction_register_during_transaction() {
        let mut connector = Connector::new(1);
        connector.accumulate_energy(100.0);
        assert_eq!(connector.energy_active_register_wh, 100.0);
        assert_eq!(connector.transaction_energy_wh, 0.0);

        connector.start_transaction(1, "TAG".into());
        connector.accumulate_energy(50.0);
        assert_eq!(connector.transaction_energy_wh, 50.0);
        assert_eq!(connector.energy_active_register_wh, 150.0);
    }

    #[test]
    fn negative_registers_are_zeroed_before_accumulating() {
        let mut connector = Connector::new(1);
        connector.energy_active_register_wh = -5.0;
        connector.accumulate_energy(10.0);
        assert_eq!(connector.energy_active_register_wh, 10.0);
    }

    #[test]
    fn typical_lifecycle_transitions_are_valid() {
        use ChargePointStatus::*;
        assert!(is_valid_transition(Available, Preparing));
        assert!(is_valid_transition(Preparing, Charging));
        assert!(is_valid_transition(Charging, Finishing));
        assert!(is_valid_transition(Finishing, Available));
    }

    #[test]
    fn skipping_preparing_is_flagged_but_not_fatal() {
        // Illegal, but set_status still records it (§9) rather than panicking.
        let mut connector = Connector::new(1);
        connector.set_status(ChargePointStatus::Charging);
        assert_eq!(connector.status, ChargePointStatus::Charging);
    }
}
