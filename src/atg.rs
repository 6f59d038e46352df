//! Automatic Transaction Generator (§4.J): a per-connector worker that
//! alternates idle delays with simulated transactions, independent of the
//! operator-driven RemoteStart/RemoteStop path.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};

use crate::error::OcppError;
use crate::station::template::AtgConfig;

/// Outcome of one completed charge cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub id_tag: String,
    pub transaction_id: u32,
    pub energy_wh: f64,
}

/// Whether the generator should run a transaction this cycle, or skip it
/// (§4.J "configurable start probability with a skipped-cycle counter").
pub fn should_start_cycle(start_probability: f64, rng: &mut impl Rng) -> bool {
    rng.gen::<f64>() < start_probability.clamp(0.0, 1.0)
}

/// Picks an id tag at random from the configured pool.
pub fn pick_id_tag<'a>(id_tags: &'a [String], rng: &mut impl Rng) -> Option<&'a str> {
    if id_tags.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..id_tags.len());
    Some(id_tags[index].as_str())
}

fn uniform_duration(min_seconds: u32, max_seconds: u32, rng: &mut impl Rng) -> Duration {
    let (lo, hi) = if min_seconds <= max_seconds {
        (min_seconds, max_seconds)
    } else {
        (max_seconds, min_seconds)
    };
    let seconds = if lo == hi { lo } else { rng.gen_range(lo..=hi) };
    Duration::from_secs(seconds as u64)
}

pub fn delay_before_start(config: &AtgConfig, rng: &mut impl Rng) -> Duration {
    uniform_duration(
        config.min_delay_between_transactions_seconds,
        config.max_delay_between_transactions_seconds,
        rng,
    )
}

pub fn transaction_duration(config: &AtgConfig, rng: &mut impl Rng) -> Duration {
    uniform_duration(config.min_duration_seconds, config.max_duration_seconds, rng)
}

/// Whether the generator should stop entirely, given how long it has been
/// running (§4.J "global stop after stopAfterHours").
pub fn should_stop(config: &AtgConfig, started_at: Instant) -> bool {
    match config.stop_after_hours {
        Some(hours) => started_at.elapsed() >= Duration::from_secs_f64(hours * 3600.0),
        None => false,
    }
}

/// Runs one full cycle: optional Authorize, StartTransaction, a simulated
/// charge period, then StopTransaction with accumulated energy. `send`
/// performs one OCPP Call and returns the peer's response payload — callers
/// wire this to [crate::station::Station::send] plus awaiting the resulting
/// receiver; kept generic here so the generator's decision logic can be
/// tested without a live transport.
pub async fn run_cycle<F, Fut>(
    connector_id: u32,
    config: &AtgConfig,
    connector_maximum_w: f64,
    require_authorize: bool,
    rng: &mut impl Rng,
    mut send: F,
) -> Result<CycleOutcome, OcppError>
where
    F: FnMut(&'static str, Value) -> Fut,
    Fut: Future<Output = Result<Value, OcppError>>,
{
    let id_tag = pick_id_tag(&config.id_tags, rng)
        .ok_or_else(|| OcppError::Internal("no id tags configured for ATG".into()))?
        .to_string();

    if require_authorize {
        let response = send("Authorize", json!({ "idTag": id_tag })).await?;
        let status = response["idTagInfo"]["status"].as_str().unwrap_or("Invalid");
        if status != "Accepted" {
            return Err(OcppError::Rejected {
                command: "Authorize",
                error_type: crate::error::ErrorType::GenericError,
                description: format!("idTag {id_tag} not authorized: {status}"),
            });
        }
    }

    let start_response = send(
        "StartTransaction",
        json!({
            "connectorId": connector_id,
            "idTag": id_tag,
            "meterStart": 0,
            "timestamp": Utc::now().to_rfc3339(),
        }),
    )
    .await?;

    let transaction_id = start_response["transactionId"]
        .as_u64()
        .ok_or_else(|| OcppError::ProtocolError("StartTransaction response missing transactionId".into()))?
        as u32;

    let duration = transaction_duration(config, rng);
    tokio::time::sleep(duration).await;

    let energy_wh = crate::station::meter::energy_increment_wh(connector_maximum_w, duration.as_secs() as u32);

    send(
        "StopTransaction",
        json!({
            "transactionId": transaction_id,
            "idTag": id_tag,
            "meterStop": energy_wh.round() as i64,
            "timestamp": Utc::now().to_rfc3339(),
        }),
    )
    .await?;

    Ok(CycleOutcome {
        id_tag,
        transaction_id,
        energy_wh,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    fn config() -> AtgConfig {
        AtgConfig {
            enabled: true,
            min_delay_between_transactions_seconds: 0,
            max_delay_between_transactions_seconds: 0,
            min_duration_seconds: 0,
            max_duration_seconds: 0,
            start_probability: 1.0,
            id_tags: vec!["TAG1".into(), "TAG2".into()],
            stop_after_hours: None,
        }
    }

    #[test]
    fn probability_one_always_starts() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert!(should_start_cycle(1.0, &mut rng));
        }
    }

    #[test]
    fn probability_zero_never_starts() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert!(!should_start_cycle(0.0, &mut rng));
        }
    }

    #[test]
    fn pick_id_tag_returns_none_when_pool_empty() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert!(pick_id_tag(&[], &mut rng).is_none());
    }

    #[test]
    fn uniform_duration_handles_reversed_bounds() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let d = uniform_duration(10, 5, &mut rng);
        assert!(d >= Duration::from_secs(5) && d <= Duration::from_secs(10));
    }

    #[test]
    fn stop_after_hours_none_never_stops() {
        let config = config();
        assert!(!should_stop(&config, Instant::now()));
    }

    #[tokio::test]
    async fn run_cycle_drives_authorize_start_and_stop_in_order() {
        let config = config();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut calls = Vec::new();

        let outcome = run_cycle(
            1,
            &config,
            7_000.0,
            true,
            &mut rng,
            |command, _payload| {
                calls.push(command);
                async move {
                    match command {
                        "Authorize" => Ok(json!({"idTagInfo": {"status": "Accepted"}})),
                        "StartTransaction" => {
                            Ok(json!({"transactionId": 99, "idTagInfo": {"status": "Accepted"}}))
                        }
                        "StopTransaction" => Ok(json!({"idTagInfo": {"status": "Accepted"}})),
                        other => panic!("unexpected command {other}"),
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(calls, vec!["Authorize", "StartTransaction", "StopTransaction"]);
        assert_eq!(outcome.transaction_id, 99);
    }

    #[tokio::test]
    async fn run_cycle_fails_fast_when_authorize_rejects() {
        let config = config();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        let result = run_cycle(1, &config, 7_000.0, true, &mut rng, |command, _payload| async move {
            match command {
                "Authorize" => Ok(json!({"idTagInfo": {"status": "Blocked"}})),
                other => panic!("unexpected command {other}"),
            }
        })
        .await;

        assert!(matches!(result, Err(OcppError::Rejected { .. })));
    }
}
