//! AC/DC power and amperage helpers (§4.H).

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::common::charging_profile::{
    ChargingProfile, ChargingProfileKind, ChargingRateUnit, ChargingSchedulePeriod, RecurrencyKind,
};

const DEFAULT_VOLTAGE: f64 = 230.0;

/// AC total power = nPhases × V × I × cosφ (cosφ defaults to 1).
pub fn ac_power(n_phases: u32, voltage: f64, current: f64, cos_phi: Option<f64>) -> f64 {
    n_phases as f64 * voltage * current * cos_phi.unwrap_or(1.0)
}

/// DC power = V × I.
pub fn dc_power(voltage: f64, current: f64) -> f64 {
    voltage * current
}

/// Inverse of [ac_power]: amperage per phase implied by a total power.
pub fn amperage_per_phase_from_power(
    power: f64,
    n_phases: u32,
    voltage: f64,
    cos_phi: Option<f64>,
) -> f64 {
    power / (n_phases as f64 * voltage * cos_phi.unwrap_or(1.0))
}

/// Total amperage (summed across phases) implied by a total power.
pub fn amperage_from_power(power: f64, voltage: f64, cos_phi: Option<f64>) -> f64 {
    power / (voltage * cos_phi.unwrap_or(1.0))
}

/// `getConnectorMaximumAvailablePower` (§4.H): the tightest of the station's
/// per-connector share of rated power, the amperage-limitation-derived
/// power, and the connector's active charging-profile limit (if any).
pub fn connector_maximum_available_power(
    station_max_power_w: f64,
    power_divider: u32,
    amperage_limitation_power_w: Option<f64>,
    active_profile_limit_w: Option<f64>,
) -> f64 {
    let divider = power_divider.max(1) as f64;
    let mut limit = station_max_power_w / divider;
    if let Some(amp_limit) = amperage_limitation_power_w {
        limit = limit.min(amp_limit / divider);
    }
    if let Some(profile_limit) = active_profile_limit_w {
        limit = limit.min(profile_limit);
    }
    limit
}

/// ChargingProfile application (§3 Glossary, §4.H): among the profiles
/// active at `now`, the one with the highest `stackLevel` wins; within it,
/// the period whose `[startPeriod, nextStartPeriod)` window contains the
/// elapsed time since the schedule's anchor applies. Returns the limit
/// converted to watts, or `None` if no profile currently constrains the
/// connector.
pub fn select_active_limit_w(
    profiles: &[ChargingProfile],
    now: DateTime<Utc>,
    transaction_started_at: Option<DateTime<Utc>>,
    default_number_of_phases: u32,
) -> Option<f64> {
    let mut best: Option<(u32, f32, Option<u32>, &ChargingRateUnit)> = None;
    for profile in profiles {
        if !is_profile_valid(profile, now) {
            continue;
        }
        let Some(anchor) = schedule_anchor(profile, now, transaction_started_at) else {
            continue;
        };
        if now < anchor {
            continue;
        }
        let elapsed = (now - anchor).num_seconds() as u32;
        if let Some(duration) = profile.charging_schedule.duration {
            if elapsed >= duration {
                continue;
            }
        }
        let Some(period) = period_at(&profile.charging_schedule.charging_schedule_period, elapsed) else {
            continue;
        };
        let take = match &best {
            None => true,
            Some((stack_level, ..)) => profile.stack_level > *stack_level,
        };
        if take {
            best = Some((
                profile.stack_level,
                period.limit,
                period.number_phases,
                &profile.charging_schedule.charging_rate_unit,
            ));
        }
    }

    best.map(|(_, limit, number_phases, unit)| match unit {
        ChargingRateUnit::W => limit as f64,
        ChargingRateUnit::A => {
            let phases = number_phases.unwrap_or(default_number_of_phases).max(1);
            ac_power(phases, DEFAULT_VOLTAGE, limit as f64, None)
        }
    })
}

fn is_profile_valid(profile: &ChargingProfile, now: DateTime<Utc>) -> bool {
    if let Some(from) = profile.valid_from {
        if now < from {
            return false;
        }
    }
    if let Some(to) = profile.valid_to {
        if now > to {
            return false;
        }
    }
    true
}

/// The wall-clock instant schedule-relative seconds are measured from, per
/// `chargingProfileKind`: `Relative` anchors to transaction start,
/// `Absolute` anchors to `startSchedule`, `Recurring` anchors to the most
/// recent daily/weekly occurrence of `startSchedule` at or before `now`.
fn schedule_anchor(
    profile: &ChargingProfile,
    now: DateTime<Utc>,
    transaction_started_at: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match profile.charging_profile_kind {
        ChargingProfileKind::Relative => transaction_started_at,
        ChargingProfileKind::Absolute => profile.charging_schedule.start_schedule,
        ChargingProfileKind::Recurring => {
            let start = profile.charging_schedule.start_schedule?;
            let period = match profile.recurrency_kind {
                Some(RecurrencyKind::Daily) => ChronoDuration::days(1),
                Some(RecurrencyKind::Weekly) => ChronoDuration::days(7),
                None => return Some(start),
            };
            Some(most_recent_occurrence(start, now, period))
        }
    }
}

fn most_recent_occurrence(start: DateTime<Utc>, now: DateTime<Utc>, period: ChronoDuration) -> DateTime<Utc> {
    let period_seconds = period.num_seconds();
    if period_seconds <= 0 || now <= start {
        return start;
    }
    let elapsed_seconds = (now - start).num_seconds();
    let cycles = elapsed_seconds / period_seconds;
    start + ChronoDuration::seconds(cycles * period_seconds)
}

/// The period in effect at `elapsed_seconds` into a schedule: the last
/// period whose `startPeriod` is `<= elapsed_seconds`.
fn period_at(periods: &[ChargingSchedulePeriod], elapsed_seconds: u32) -> Option<&ChargingSchedulePeriod> {
    periods
        .iter()
        .filter(|p| p.start_period <= elapsed_seconds)
        .max_by_key(|p| p.start_period)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ac_power_defaults_cos_phi_to_one() {
        assert_eq!(ac_power(3, 230.0, 16.0, None), 3.0 * 230.0 * 16.0);
    }

    #[test]
    fn dc_power_is_voltage_times_current() {
        assert_eq!(dc_power(400.0, 32.0), 400.0 * 32.0);
    }

    #[test]
    fn amperage_helpers_invert_ac_power() {
        let power = ac_power(3, 230.0, 16.0, None);
        let amps = amperage_per_phase_from_power(power, 3, 230.0, None);
        assert!((amps - 16.0).abs() < 1e-9);
    }

    #[test]
    fn connector_maximum_is_the_tightest_bound() {
        let max = connector_maximum_available_power(22_000.0, 2, Some(7_000.0), Some(3_000.0));
        assert_eq!(max, 3_000.0);
    }

    #[test]
    fn connector_maximum_without_profile_uses_station_and_amperage_bounds() {
        let max = connector_maximum_available_power(22_000.0, 2, Some(7_000.0), None);
        assert_eq!(max, (7_000.0f64 / 2.0).min(22_000.0 / 2.0));
    }

    fn profile(stack_level: u32, kind: ChargingProfileKind, periods: Vec<ChargingSchedulePeriod>) -> ChargingProfile {
        ChargingProfile {
            charging_profile_id: 1,
            transaction_id: None,
            stack_level,
            charging_profile_purpose: crate::common::charging_profile::ChargingProfilePurpose::TxProfile,
            charging_profile_kind: kind,
            recurrency_kind: None,
            valid_from: None,
            valid_to: None,
            charging_schedule: crate::common::charging_profile::ChargingSchedule {
                duration: None,
                start_schedule: None,
                charging_rate_unit: ChargingRateUnit::W,
                charging_schedule_period: periods,
                min_charging_rate: None,
            },
        }
    }

    #[test]
    fn relative_profile_limits_from_transaction_start() {
        let started = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let now = started + ChronoDuration::seconds(30);
        let profiles = vec![profile(
            0,
            ChargingProfileKind::Relative,
            vec![ChargingSchedulePeriod { start_period: 0, limit: 11_000.0, number_phases: None }],
        )];
        assert_eq!(select_active_limit_w(&profiles, now, Some(started), 3), Some(11_000.0));
    }

    #[test]
    fn highest_stack_level_wins_among_active_profiles() {
        let started = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let now = started + ChronoDuration::seconds(5);
        let profiles = vec![
            profile(
                0,
                ChargingProfileKind::Relative,
                vec![ChargingSchedulePeriod { start_period: 0, limit: 22_000.0, number_phases: None }],
            ),
            profile(
                5,
                ChargingProfileKind::Relative,
                vec![ChargingSchedulePeriod { start_period: 0, limit: 3_700.0, number_phases: None }],
            ),
        ];
        assert_eq!(select_active_limit_w(&profiles, now, Some(started), 3), Some(3_700.0));
    }

    #[test]
    fn later_period_in_schedule_is_selected_once_reached() {
        let started = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let profiles = vec![profile(
            0,
            ChargingProfileKind::Relative,
            vec![
                ChargingSchedulePeriod { start_period: 0, limit: 22_000.0, number_phases: None },
                ChargingSchedulePeriod { start_period: 60, limit: 11_000.0, number_phases: None },
            ],
        )];
        let before = started + ChronoDuration::seconds(30);
        let after = started + ChronoDuration::seconds(90);
        assert_eq!(select_active_limit_w(&profiles, before, Some(started), 3), Some(22_000.0));
        assert_eq!(select_active_limit_w(&profiles, after, Some(started), 3), Some(11_000.0));
    }

    #[test]
    fn amperage_unit_limit_is_converted_to_watts() {
        let started = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let now = started + ChronoDuration::seconds(5);
        let mut p = profile(
            0,
            ChargingProfileKind::Relative,
            vec![ChargingSchedulePeriod { start_period: 0, limit: 16.0, number_phases: Some(3) }],
        );
        p.charging_schedule.charging_rate_unit = ChargingRateUnit::A;
        assert_eq!(select_active_limit_w(&[p], now, Some(started), 1), Some(ac_power(3, DEFAULT_VOLTAGE, 16.0, None)));
    }

    #[test]
    fn expired_profile_does_not_apply() {
        let started = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let mut p = profile(
            0,
            ChargingProfileKind::Relative,
            vec![ChargingSchedulePeriod { start_period: 0, limit: 11_000.0, number_phases: None }],
        );
        p.valid_to = Some(started);
        let now = started + ChronoDuration::seconds(10);
        assert_eq!(select_active_limit_w(&[p], now, Some(started), 3), None);
    }
}
