// crates/allora-synthesis/src/network_inference.rs
//
// Assemble the network inference bundle for one topic epoch.

use std::collections::BTreeMap;

use allora_core::{
    ActorId, AlloraError, BlockHeight, Decimal, Forecast, TopicId, ValueBundle,
    WorkerAttributedValue,
};

use crate::forecast_implied::compute_forecast_implied_inferences;
use crate::variants::{
    combined_value, naive_value, one_in_forecaster_values, one_out_forecaster_values,
    one_out_inferer_values,
};
use crate::weighted::{RegretSnapshot, Weighting};

/// Run the full synthesis for one topic epoch.
///
/// # Arguments
/// * `inferences` - Accepted inferer -> inference value (must be non-empty).
/// * `forecasts` - Accepted forecasts, already restricted to accepted inferers.
/// * `network_combined_loss` - Previous epoch's raw network combined loss.
///   Without one there is no baseline to judge forecasts against, and the
///   bundle carries no forecaster values.
/// * `regrets` - Regrets of every participant, read before the epoch.
/// * `weighting` - Epsilon and gradient exponent of the topic.
pub fn synthesize(
    topic_id: TopicId,
    block_height: BlockHeight,
    inferences: &BTreeMap<ActorId, Decimal>,
    forecasts: &[Forecast],
    network_combined_loss: Option<Decimal>,
    regrets: &RegretSnapshot,
    weighting: Weighting,
) -> Result<ValueBundle, AlloraError> {
    if inferences.is_empty() {
        return Err(AlloraError::EmptyInput(format!(
            "no inferences to synthesize for topic {} at block {}",
            topic_id, block_height
        )));
    }

    // Step 1: Forecast-implied inferences
    let forecast_implied = match network_combined_loss {
        Some(loss) => compute_forecast_implied_inferences(
            inferences,
            forecasts,
            loss,
            weighting.epsilon,
            weighting.p_norm,
        )?,
        None => {
            if !forecasts.is_empty() {
                tracing::debug!(
                    "Topic {} has no prior network loss; ignoring {} forecast(s)",
                    topic_id,
                    forecasts.len()
                );
            }
            BTreeMap::new()
        }
    };

    // Step 2: Combined and naive values
    let combined = combined_value(inferences, &forecast_implied, regrets, weighting)?;
    let naive = naive_value(inferences, regrets, weighting)?;

    // Step 3: Held-out variants
    let one_out_inferers =
        one_out_inferer_values(inferences, forecasts, network_combined_loss, regrets, weighting)?;
    let one_out_forecasters =
        one_out_forecaster_values(inferences, &forecast_implied, regrets, weighting)?;
    let one_in_forecasters =
        one_in_forecaster_values(inferences, &forecast_implied, regrets, weighting)?;

    tracing::debug!(
        "Synthesized topic {} at block {}: {} inferer(s), {} forecaster(s), combined {}",
        topic_id,
        block_height,
        inferences.len(),
        forecast_implied.len(),
        combined
    );

    Ok(ValueBundle {
        topic_id,
        block_height,
        combined_value: combined,
        naive_value: naive,
        inferer_values: attributed(inferences),
        forecaster_values: attributed(&forecast_implied),
        one_out_inferer_values: one_out_inferers,
        one_out_forecaster_values: one_out_forecasters,
        one_in_forecaster_values: one_in_forecasters,
    })
}

fn attributed(values: &BTreeMap<ActorId, Decimal>) -> Vec<WorkerAttributedValue> {
    values
        .iter()
        .map(|(worker, value)| WorkerAttributedValue {
            worker: worker.clone(),
            value: *value,
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

    fn inferences() -> BTreeMap<ActorId, Decimal> {
        BTreeMap::from([
            (ActorId::from("worker0"), dec!(1)),
            (ActorId::from("worker1"), dec!(2)),
        ])
    }

    fn forecasts() -> Vec<Forecast> {
        vec![Forecast {
            topic_id: 1,
            block_height: 100,
            forecaster: ActorId::from("forecaster0"),
            forecast_elements: vec![
                ForecastElement { inferer: ActorId::from("worker0"), value: dec!(3) },
                ForecastElement { inferer: ActorId::from("worker1"), value: dec!(4) },
            ],
        }]
    }

    #[test]
    fn test_bundle_carries_every_field() {
        let bundle = synthesize(
            1,
            100,
            &inferences(),
            &forecasts(),
            Some(dec!(0.5)),
            &RegretSnapshot::default(),
            weighting(),
        )
        .unwrap();

        assert_eq!(bundle.topic_id, 1);
        assert_eq!(bundle.block_height, 100);
        assert_eq!(bundle.inferer_values.len(), 2);
        assert_eq!(bundle.forecaster_values.len(), 1);
        assert_eq!(bundle.one_out_inferer_values.len(), 2);
        assert_eq!(bundle.one_out_forecaster_values.len(), 1);
        assert_eq!(bundle.one_in_forecaster_values.len(), 1);
        assert!((bundle.naive_value - dec!(1.5)).abs() < dec!(0.000000001));

        let implied = bundle.forecaster_value(&ActorId::from("forecaster0")).unwrap();
        assert!((implied - dec!(1.4355951)).abs() < dec!(0.00001));
        // With equal regrets the combination is the plain mean of all three.
        let expected = (dec!(3) + implied) / dec!(3);
        assert!((bundle.combined_value - expected).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_no_prior_loss_ignores_forecasts() {
        let bundle = synthesize(
            1,
            100,
            &inferences(),
            &forecasts(),
            None,
            &RegretSnapshot::default(),
            weighting(),
        )
        .unwrap();
        assert!(bundle.forecaster_values.is_empty());
        assert!(bundle.one_in_forecaster_values.is_empty());
        assert_eq!(bundle.combined_value, bundle.naive_value);
    }

    #[test]
    fn test_empty_inferences_rejected() {
        let err = synthesize(
            1,
            100,
            &BTreeMap::new(),
            &[],
            None,
            &RegretSnapshot::default(),
            weighting(),
        )
        .unwrap_err();
        assert!(matches!(err, AlloraError::EmptyInput(_)));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let run = || {
            synthesize(
                1,
                100,
                &inferences(),
                &forecasts(),
                Some(dec!(0.5)),
                &RegretSnapshot::default(),
                weighting(),
            )
            .unwrap()
        };
        assert_eq!(run().digest().unwrap(), run().digest().unwrap());
    }
}
