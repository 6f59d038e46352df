//! Station timers (§4.I): heartbeat, WebSocket ping, and per-connector
//! meter-values sampling. Each is armed/disarmed independently and is a
//! no-op (never fires) while disarmed, so a station's `tokio::select!` loop
//! can poll all of them unconditionally.

use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::station::config::ConfigurationKeyStore;

/// A period-based timer that can be armed, disarmed, and re-armed with a
/// new period. While disarmed, `tick()` never resolves.
pub struct IntervalTimer {
    inner: Option<Interval>,
    period: Option<Duration>,
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self {
            inner: None,
            period: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.inner.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Arms the timer at `period`, replacing any previous period. A zero
    /// period disarms the timer instead (§4.I: "interval>0").
    pub fn arm(&mut self, period: Duration) {
        if period.is_zero() {
            self.disarm();
            return;
        }
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.inner = Some(ticker);
        self.period = Some(period);
    }

    /// Arms the timer only if it isn't already armed (§4.I heartbeat: "armed
    /// only when interval>0 and not already armed").
    pub fn arm_if_disarmed(&mut self, period: Duration) {
        if !self.is_armed() {
            self.arm(period);
        }
    }

    pub fn disarm(&mut self) {
        self.inner = None;
        self.period = None;
    }

    /// Resolves on the next tick if armed; never resolves while disarmed.
    pub async fn tick(&mut self) {
        match self.inner.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}

impl Default for IntervalTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// The heartbeat period implied by the `HeartbeatInterval` configuration
/// key, in milliseconds (§4.I).
pub fn heartbeat_period(configuration: &ConfigurationKeyStore) -> Option<Duration> {
    period_from_key(configuration, "HeartbeatInterval")
}

/// The meter-values sampling period implied by `MeterValueSampleInterval`
/// (§4.I). Armed only while the connector holds a running transaction; the
/// caller is responsible for checking that.
pub fn meter_values_period(configuration: &ConfigurationKeyStore) -> Option<Duration> {
    period_from_key(configuration, "MeterValueSampleInterval")
}

fn period_from_key(configuration: &ConfigurationKeyStore, key: &str) -> Option<Duration> {
    let seconds: u64 = configuration.get(key)?.value.parse().ok()?;
    if seconds == 0 {
        None
    } else {
        Some(Duration::from_secs(seconds))
    }
}

/// All timers owned by one station (§4.I). Connector-scoped meter-values
/// timers are kept separately per connector by the caller; this bundles the
/// two station-scoped timers.
pub struct StationTimers {
    pub heartbeat: IntervalTimer,
    pub ping: IntervalTimer,
    /// Shared tick driving every connector's meter-values sampling; armed at
    /// the station's `MeterValueSampleInterval` whenever any connector has a
    /// running transaction.
    pub meter: IntervalTimer,
}

impl StationTimers {
    pub fn new() -> Self {
        Self {
            heartbeat: IntervalTimer::new(),
            ping: IntervalTimer::new(),
            meter: IntervalTimer::new(),
        }
    }

    /// Clears every timer (§4.I: "all timers cleared on stop/abnormal
    /// close").
    pub fn clear(&mut self) {
        self.heartbeat.disarm();
        self.ping.disarm();
        self.meter.disarm();
    }
}

impl Default for StationTimers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::station::config::ConfigurationKey;

    #[tokio::test]
    async fn disarmed_timer_never_ticks() {
        let mut timer = IntervalTimer::new();
        tokio::select! {
            _ = timer.tick() => panic!("disarmed timer should never tick"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
    }

    #[tokio::test]
    async fn armed_timer_ticks() {
        let mut timer = IntervalTimer::new();
        timer.arm(Duration::from_millis(5));
        timer.tick().await;
        assert!(timer.is_armed());
    }

    #[test]
    fn zero_period_arm_disarms() {
        let mut timer = IntervalTimer::new();
        timer.arm(Duration::from_secs(1));
        assert!(timer.is_armed());
        timer.arm(Duration::ZERO);
        assert!(!timer.is_armed());
    }

    #[test]
    fn arm_if_disarmed_does_not_reset_an_armed_timer() {
        let mut timer = IntervalTimer::new();
        timer.arm(Duration::from_secs(10));
        timer.arm_if_disarmed(Duration::from_secs(20));
        assert_eq!(timer.period(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn heartbeat_period_reads_configuration_key() {
        let mut store = ConfigurationKeyStore::new();
        store.add(ConfigurationKey::new("HeartbeatInterval", "30", false), true);
        assert_eq!(heartbeat_period(&store), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_heartbeat_interval_disarms() {
        let mut store = ConfigurationKeyStore::new();
        store.add(ConfigurationKey::new("HeartbeatInterval", "0", false), true);
        assert_eq!(heartbeat_period(&store), None);
    }
}
