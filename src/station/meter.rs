//! Meter-values generation per sampling tick (§4.H).

use chrono::Utc;
use rand::Rng;

use crate::common::meter_value::{MeterValue, SampledMeasurand, SampledPhase, SampledValue};

/// How a single measurand's numeric value is produced each tick.
#[derive(Debug, Clone)]
pub enum SampleSource {
    /// A fixed baseline that fluctuates by ± `fluctuation_percent`.
    Fixed {
        value: f64,
        fluctuation_percent: f64,
    },
    /// Uniformly sampled within `[min, connector_maximum]`.
    Range { min: f64 },
}

impl SampleSource {
    fn sample(&self, connector_maximum: f64, rng: &mut impl Rng) -> f64 {
        match self {
            SampleSource::Fixed {
                value,
                fluctuation_percent,
            } => {
                let spread = value * (fluctuation_percent / 100.0);
                rng.gen_range((value - spread)..=(value + spread))
            }
            SampleSource::Range { min } => {
                if *min >= connector_maximum {
                    *min
                } else {
                    rng.gen_range(*min..=connector_maximum)
                }
            }
        }
    }
}

/// Per-measurand sample configuration, as read from the station template.
#[derive(Debug, Clone)]
pub struct MeterValuesTemplate {
    pub measurand: SampledMeasurand,
    pub source: SampleSource,
}

/// Builds one [MeterValue] for a sampling tick, producing a [SampledValue]
/// per enabled template entry, with optional per-phase entries when the
/// connector has 3 phases (§4.H).
pub fn build_meter_value(
    templates: &[MeterValuesTemplate],
    connector_maximum_w: f64,
    number_of_phases: u32,
    rng: &mut impl Rng,
) -> MeterValue {
    let mut sampled_value = Vec::new();
    for template in templates {
        let value = template.source.sample(connector_maximum_w, rng);
        sampled_value.push(SampledValue {
            value: format!("{value:.2}"),
            context: None,
            format: None,
            measurand: Some(template.measurand.clone()),
            phase: None,
            location: None,
            unit: None,
        });

        if number_of_phases == 3 {
            for phase in [SampledPhase::L1, SampledPhase::L2, SampledPhase::L3] {
                let phase_value = template.source.sample(connector_maximum_w, rng) / 3.0;
                sampled_value.push(SampledValue {
                    value: format!("{phase_value:.2}"),
                    context: None,
                    format: None,
                    measurand: Some(template.measurand.clone()),
                    phase: Some(phase),
                    location: None,
                    unit: None,
                });
            }
        }
    }

    MeterValue {
        timestamp: Utc::now(),
        sampled_value,
    }
}

/// The per-tick energy increment (Wh) implied by a power draw sampled over
/// `interval_seconds`.
pub fn energy_increment_wh(power_w: f64, interval_seconds: u32) -> f64 {
    power_w * (interval_seconds as f64 / 3600.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn fixed_source_stays_within_fluctuation_band() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let source = SampleSource::Fixed {
            value: 100.0,
            fluctuation_percent: 10.0,
        };
        for _ in 0..50 {
            let sample = source.sample(0.0, &mut rng);
            assert!((90.0..=110.0).contains(&sample));
        }
    }

    #[test]
    fn range_source_is_bounded_by_connector_maximum() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        let source = SampleSource::Range { min: 0.0 };
        for _ in 0..50 {
            let sample = source.sample(16.0, &mut rng);
            assert!((0.0..=16.0).contains(&sample));
        }
    }

    #[test]
    fn three_phase_connector_emits_per_phase_entries() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let templates = vec![MeterValuesTemplate {
            measurand: SampledMeasurand::PowerActiveImport,
            source: SampleSource::Range { min: 0.0 },
        }];
        let mv = build_meter_value(&templates, 11_000.0, 3, &mut rng);
        // One overall sample plus three per-phase samples.
        assert_eq!(mv.sampled_value.len(), 4);
    }

    #[test]
    fn energy_increment_scales_with_interval() {
        assert_eq!(energy_increment_wh(3600.0, 3600), 3600.0);
        assert_eq!(energy_increment_wh(3600.0, 60), 60.0);
    }
}
