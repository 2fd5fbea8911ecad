// crates/allora-core/src/inference.rs

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, BlockHeight, Nonce, TopicId};

/// A worker's point prediction for one topic epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    pub topic_id: TopicId,
    pub block_height: BlockHeight,
    pub inferer: ActorId,
    pub value: Decimal,
}

/// One predicted loss inside a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastElement {
    /// The inferer whose loss is being predicted.
    pub inferer: ActorId,
    /// Predicted loss of that inferer's inference.
    pub value: Decimal,
}

/// A worker's predicted losses for the other inferers of the same epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub topic_id: TopicId,
    pub block_height: BlockHeight,
    pub forecaster: ActorId,
    pub forecast_elements: Vec<ForecastElement>,
}

impl Forecast {
    /// Elements whose inferer is in `accepted`, keeping only the first
    /// element seen for each inferer.
    pub fn elements_for(&self, accepted: &BTreeSet<ActorId>) -> Vec<ForecastElement> {
        let mut seen = BTreeSet::new();
        self.forecast_elements
            .iter()
            .filter(|el| accepted.contains(&el.inferer) && seen.insert(el.inferer.clone()))
            .cloned()
            .collect()
    }

    /// A copy of this forecast restricted to `accepted` inferers, or `None`
    /// if no element survives.
    pub fn restricted_to(&self, accepted: &BTreeSet<ActorId>) -> Option<Forecast> {
        let elements = self.elements_for(accepted);
        if elements.is_empty() {
            return None;
        }
        Some(Forecast {
            topic_id: self.topic_id,
            block_height: self.block_height,
            forecaster: self.forecaster.clone(),
            forecast_elements: elements,
        })
    }
}

/// The inference and/or forecast a worker submits for one epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceForecastBundle {
    #[serde(default)]
    pub inference: Option<Inference>,
    #[serde(default)]
    pub forecast: Option<Forecast>,
}

/// A raw worker submission as it arrives from the transaction layer.
///
/// The signature is carried opaquely; verifying it belongs to the host chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerDataBundle {
    pub worker: ActorId,
    pub topic_id: TopicId,
    pub nonce: Nonce,
    pub inference_forecasts_bundle: InferenceForecastBundle,
    #[serde(default)]
    pub signature: String,
}

/// Collapse accepted inferences to the actor -> value map the synthesis
/// calculators consume.
pub fn values_by_inferer(inferences: &BTreeMap<ActorId, Inference>) -> BTreeMap<ActorId, Decimal> {
    inferences
        .iter()
        .map(|(actor, inference)| (actor.clone(), inference.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn forecast(elements: &[(&str, Decimal)]) -> Forecast {
        Forecast {
            topic_id: 1,
            block_height: 10,
            forecaster: ActorId::from("forecaster0"),
            forecast_elements: elements
                .iter()
                .map(|(inferer, value)| ForecastElement {
                    inferer: ActorId::from(*inferer),
                    value: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_elements_for_drops_unaccepted_and_repeated_inferers() {
        let f = forecast(&[
            ("worker0", dec!(1)),
            ("ghost", dec!(2)),
            ("worker0", dec!(3)),
            ("worker1", dec!(4)),
        ]);
        let accepted: BTreeSet<ActorId> =
            ["worker0", "worker1"].iter().map(|a| ActorId::from(*a)).collect();

        let elements = f.elements_for(&accepted);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].value, dec!(1));
        assert_eq!(elements[1].inferer.as_str(), "worker1");
    }

    #[test]
    fn test_restricted_to_returns_none_when_nothing_survives() {
        let f = forecast(&[("ghost", dec!(2))]);
        let accepted: BTreeSet<ActorId> = [ActorId::from("worker0")].into_iter().collect();
        assert!(f.restricted_to(&accepted).is_none());
    }

    #[test]
    fn test_bundle_deserializes_without_optional_parts() {
        let json = r#"{
            "worker": "worker0",
            "topic_id": 1,
            "nonce": { "block_height": 10 },
            "inference_forecasts_bundle": {
                "inference": { "topic_id": 1, "block_height": 10, "inferer": "worker0", "value": "1.5" }
            }
        }"#;
        let bundle: WorkerDataBundle = serde_json::from_str(json).unwrap();
        assert!(bundle.inference_forecasts_bundle.forecast.is_none());
        assert_eq!(
            bundle.inference_forecasts_bundle.inference.unwrap().value,
            dec!(1.5)
        );
        assert!(bundle.signature.is_empty());
    }
}
