// crates/allora-synthesis/src/variants.rs
//
// Held-out variants of the combined inference used for loss attribution.
//
// Every variant is a fresh call of `combined_inference` over a modified
// participant set with its own regret normalizer. Variants share no state,
// so the per-actor loops run on the rayon pool; results come back in
// actor-id order regardless of scheduling.

use std::collections::BTreeMap;

use rayon::prelude::*;

use allora_core::{
    ActorId, AlloraError, Decimal, Forecast, WithheldWorkerAttributedValue, WorkerAttributedValue,
};

use crate::forecast_implied::compute_forecast_implied_inferences;
use crate::weighted::{combined_inference, max_regret, OneInView, RegretSnapshot, RegretSource, Weighting};

fn combine<R: RegretSource + ?Sized>(
    inferences: &BTreeMap<ActorId, Decimal>,
    forecast_implied: &BTreeMap<ActorId, Decimal>,
    regrets: &R,
    weighting: Weighting,
) -> Result<Decimal, AlloraError> {
    let max = max_regret(regrets, inferences, forecast_implied, weighting.epsilon);
    combined_inference(inferences, forecast_implied, regrets, max, weighting)
}

/// Full network combination of all inferers and forecasters.
pub fn combined_value(
    inferences: &BTreeMap<ActorId, Decimal>,
    forecast_implied: &BTreeMap<ActorId, Decimal>,
    regrets: &RegretSnapshot,
    weighting: Weighting,
) -> Result<Decimal, AlloraError> {
    combine(inferences, forecast_implied, regrets, weighting)
}

/// Combination of inferers only.
pub fn naive_value(
    inferences: &BTreeMap<ActorId, Decimal>,
    regrets: &RegretSnapshot,
    weighting: Weighting,
) -> Result<Decimal, AlloraError> {
    combine(inferences, &BTreeMap::new(), regrets, weighting)
}

/// One value per inferer, computed with that inferer withheld.
///
/// Forecast-implied inferences are recomputed against the reduced inferer
/// set, so elements predicting the withheld inferer drop out. With a single
/// inferer nothing would remain and no values are produced.
pub fn one_out_inferer_values(
    inferences: &BTreeMap<ActorId, Decimal>,
    forecasts: &[Forecast],
    network_combined_loss: Option<Decimal>,
    regrets: &RegretSnapshot,
    weighting: Weighting,
) -> Result<Vec<WithheldWorkerAttributedValue>, AlloraError> {
    if inferences.len() < 2 {
        tracing::debug!("Skipping one-out inferer values: {} inferer(s)", inferences.len());
        return Ok(Vec::new());
    }

    let withheld: Vec<&ActorId> = inferences.keys().collect();
    withheld
        .par_iter()
        .map(|worker| -> Result<WithheldWorkerAttributedValue, AlloraError> {
            let mut remaining = inferences.clone();
            remaining.remove(*worker);
            let implied = match network_combined_loss {
                Some(loss) => compute_forecast_implied_inferences(
                    &remaining,
                    forecasts,
                    loss,
                    weighting.epsilon,
                    weighting.p_norm,
                )?,
                None => BTreeMap::new(),
            };
            let value = combine(&remaining, &implied, regrets, weighting)?;
            Ok(WithheldWorkerAttributedValue {
                worker: (*worker).clone(),
                value,
            })
        })
        .collect()
}

/// One value per forecaster, computed with that forecaster's implied
/// inference withheld.
pub fn one_out_forecaster_values(
    inferences: &BTreeMap<ActorId, Decimal>,
    forecast_implied: &BTreeMap<ActorId, Decimal>,
    regrets: &RegretSnapshot,
    weighting: Weighting,
) -> Result<Vec<WithheldWorkerAttributedValue>, AlloraError> {
    let withheld: Vec<&ActorId> = forecast_implied.keys().collect();
    withheld
        .par_iter()
        .map(|forecaster| -> Result<WithheldWorkerAttributedValue, AlloraError> {
            let mut remaining = forecast_implied.clone();
            remaining.remove(*forecaster);
            let value = combine(inferences, &remaining, regrets, weighting)?;
            Ok(WithheldWorkerAttributedValue {
                worker: (*forecaster).clone(),
                value,
            })
        })
        .collect()
}

/// One value per forecaster, combining every inferer with only that
/// forecaster's implied inference, weighted by its one-in regrets.
pub fn one_in_forecaster_values(
    inferences: &BTreeMap<ActorId, Decimal>,
    forecast_implied: &BTreeMap<ActorId, Decimal>,
    regrets: &RegretSnapshot,
    weighting: Weighting,
) -> Result<Vec<WorkerAttributedValue>, AlloraError> {
    let included: Vec<(&ActorId, &Decimal)> = forecast_implied.iter().collect();
    included
        .par_iter()
        .map(|(forecaster, implied_value)| -> Result<WorkerAttributedValue, AlloraError> {
            let single = BTreeMap::from([((*forecaster).clone(), **implied_value)]);
            let view = OneInView {
                snapshot: regrets,
                forecaster: *forecaster,
            };
            let value = combine(inferences, &single, &view, weighting)?;
            Ok(WorkerAttributedValue {
                worker: (*forecaster).clone(),
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use allora_core::ForecastElement;
    use rust_decimal_macros::dec;

    fn weighting() -> Weighting {
        Weighting {
            epsilon: dec!(0.0001),
            p_norm: dec!(2),
        }
    }

    fn values(pairs: &[(&str, Decimal)]) -> BTreeMap<ActorId, Decimal> {
        pairs.iter().map(|(a, v)| (ActorId::from(*a), *v)).collect()
    }

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000000001)
    }

    #[test]
    fn test_one_out_inferer_leaves_sole_survivor() {
        // Removing either inferer leaves the other as the only contributor,
        // so each one-out value is the other's inference (2.5 and 1.5),
        // not a shared value near 2.
        let inferences = values(&[("worker1", dec!(1.5)), ("worker2", dec!(2.5))]);
        let mut regrets = RegretSnapshot::default();
        regrets.inferer.insert(ActorId::from("worker1"), dec!(0.5));
        regrets.inferer.insert(ActorId::from("worker2"), dec!(0.25));

        let out = one_out_inferer_values(&inferences, &[], None, &regrets, weighting()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].worker, ActorId::from("worker1"));
        assert!(close(out[0].value, dec!(2.5)));
        assert_eq!(out[1].worker, ActorId::from("worker2"));
        assert!(close(out[1].value, dec!(1.5)));
    }

    #[test]
    fn test_one_out_inferer_skipped_for_single_inferer() {
        let inferences = values(&[("worker0", dec!(1))]);
        let out =
            one_out_inferer_values(&inferences, &[], None, &RegretSnapshot::default(), weighting())
                .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_one_out_inferer_recomputes_forecasts() {
        let inferences = values(&[("worker0", dec!(1)), ("worker1", dec!(2))]);
        let forecasts = vec![Forecast {
            topic_id: 1,
            block_height: 100,
            forecaster: ActorId::from("forecaster0"),
            forecast_elements: vec![
                ForecastElement { inferer: ActorId::from("worker0"), value: dec!(3) },
                ForecastElement { inferer: ActorId::from("worker1"), value: dec!(4) },
            ],
        }];
        let out = one_out_inferer_values(
            &inferences,
            &forecasts,
            Some(dec!(0.5)),
            &RegretSnapshot::default(),
            weighting(),
        )
        .unwrap();
        // Withholding worker0 leaves the forecast pointing at worker1 only,
        // so both remaining contributions equal 2.
        assert!(close(out[0].value, dec!(2)));
        assert!(close(out[1].value, dec!(1)));
    }

    #[test]
    fn test_one_out_forecaster_drops_its_implied_value() {
        let inferences = values(&[("worker0", dec!(1))]);
        let implied = values(&[("forecaster0", dec!(3)), ("forecaster1", dec!(5))]);
        let out =
            one_out_forecaster_values(&inferences, &implied, &RegretSnapshot::default(), weighting())
                .unwrap();
        assert_eq!(out.len(), 2);
        assert!(close(out[0].value, dec!(3)));
        assert!(close(out[1].value, dec!(2)));
    }

    #[test]
    fn test_one_in_uses_one_in_regrets() {
        let inferences = values(&[("worker0", dec!(0))]);
        let implied = values(&[("forecaster0", dec!(10))]);
        let f = ActorId::from("forecaster0");
        let mut regrets = RegretSnapshot::default();
        // Direct regrets would favour the inferer heavily.
        regrets.inferer.insert(ActorId::from("worker0"), dec!(1));
        regrets.forecaster.insert(f.clone(), dec!(-1));
        // One-in regrets favour the forecaster.
        regrets.one_in.insert((f.clone(), ActorId::from("worker0")), dec!(-1));
        regrets.one_in.insert((f.clone(), f.clone()), dec!(1));

        let one_in = one_in_forecaster_values(&inferences, &implied, &regrets, weighting()).unwrap();
        let full = combined_value(&inferences, &implied, &regrets, weighting()).unwrap();
        assert!(one_in[0].value > dec!(5));
        assert!(full < dec!(5));
    }

    #[test]
    fn test_naive_ignores_forecasts() {
        let inferences = values(&[("worker0", dec!(1)), ("worker1", dec!(3))]);
        let naive = naive_value(&inferences, &RegretSnapshot::default(), weighting()).unwrap();
        assert!(close(naive, dec!(2)));
    }
}
