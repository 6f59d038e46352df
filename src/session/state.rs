//! Session State Machine (§4.D): tracks registration state and gates which
//! outbound Calls are admitted.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Registration state, driven exclusively by BootNotification responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Default, Serialize, Deserialize)]
pub enum RegistrationState {
    /// Initial state; also re-entered on (re)connect and after reset.
    #[default]
    Unknown,
    Pending,
    Accepted,
    Rejected,
}

impl RegistrationState {
    pub fn from_boot_notification_status(
        status: &crate::core::BootNotificationStatus,
    ) -> Self {
        use crate::core::BootNotificationStatus as S;
        match status {
            S::Accepted => RegistrationState::Accepted,
            S::Pending => RegistrationState::Pending,
            S::Rejected => RegistrationState::Rejected,
        }
    }
}

/// Whether an outbound Call is admitted given the current registration
/// state (§4.D admission policy). `is_response` covers CallResult/CallError
/// frames answering an inbound Call, which are always admitted.
pub fn is_admitted(
    state: RegistrationState,
    command: &str,
    is_response: bool,
    trigger_message: bool,
    strict_compliance: bool,
) -> bool {
    if is_response {
        return true;
    }
    match state {
        RegistrationState::Accepted => true,
        RegistrationState::Unknown => command == "BootNotification" || !strict_compliance,
        RegistrationState::Pending => trigger_message,
        RegistrationState::Rejected => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boot_notification_only_in_unknown() {
        assert!(is_admitted(
            RegistrationState::Unknown,
            "BootNotification",
            false,
            false,
            true
        ));
        assert!(!is_admitted(
            RegistrationState::Unknown,
            "Heartbeat",
            false,
            false,
            true
        ));
    }

    #[test]
    fn non_strict_admits_anything_in_unknown() {
        assert!(is_admitted(
            RegistrationState::Unknown,
            "Heartbeat",
            false,
            false,
            false
        ));
    }

    #[test]
    fn accepted_admits_all_commands() {
        assert!(is_admitted(
            RegistrationState::Accepted,
            "MeterValues",
            false,
            false,
            true
        ));
    }

    #[test]
    fn pending_only_admits_trigger_message_opt_in() {
        assert!(!is_admitted(
            RegistrationState::Pending,
            "Heartbeat",
            false,
            false,
            true
        ));
        assert!(is_admitted(
            RegistrationState::Pending,
            "StatusNotification",
            false,
            true,
            true
        ));
    }

    #[test]
    fn rejected_never_admits_outbound_calls() {
        assert!(!is_admitted(
            RegistrationState::Rejected,
            "Heartbeat",
            false,
            true,
            true
        ));
    }

    #[test]
    fn responses_always_admitted() {
        assert!(is_admitted(
            RegistrationState::Rejected,
            "Reset",
            true,
            false,
            true
        ));
    }
}
