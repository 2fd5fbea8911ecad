// crates/allora-core/src/bundle.rs
//
// Value bundles: the canonical per-epoch output of synthesis.
//
// The same shape carries two kinds of numbers. As a network inference
// bundle it holds inference values; as a (reputer or network) loss bundle
// it holds losses for each of those same inferences.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::actor::{ActorId, BlockHeight, TopicId};
use crate::error::AlloraError;

/// A value attributed to a single worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAttributedValue {
    pub worker: ActorId,
    pub value: Decimal,
}

/// A value computed with one worker withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithheldWorkerAttributedValue {
    pub worker: ActorId,
    pub value: Decimal,
}

/// Synthesis output for one topic epoch.
///
/// All per-actor lists are sorted by worker id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueBundle {
    pub topic_id: TopicId,
    pub block_height: BlockHeight,
    /// Value of the full network combination.
    pub combined_value: Decimal,
    /// Value of the combination of inferers only (no forecasts).
    pub naive_value: Decimal,
    /// Direct attribution per inferer.
    #[serde(default)]
    pub inferer_values: Vec<WorkerAttributedValue>,
    /// Direct attribution per forecaster (its forecast-implied inference).
    #[serde(default)]
    pub forecaster_values: Vec<WorkerAttributedValue>,
    /// Combination with one inferer left out.
    #[serde(default)]
    pub one_out_inferer_values: Vec<WithheldWorkerAttributedValue>,
    /// Combination with one forecaster left out.
    #[serde(default)]
    pub one_out_forecaster_values: Vec<WithheldWorkerAttributedValue>,
    /// Combination of all inferers plus exactly one forecaster.
    #[serde(default)]
    pub one_in_forecaster_values: Vec<WorkerAttributedValue>,
}

fn find(values: &[WorkerAttributedValue], worker: &ActorId) -> Option<Decimal> {
    values.iter().find(|v| &v.worker == worker).map(|v| v.value)
}

fn find_withheld(values: &[WithheldWorkerAttributedValue], worker: &ActorId) -> Option<Decimal> {
    values.iter().find(|v| &v.worker == worker).map(|v| v.value)
}

impl ValueBundle {
    pub fn inferer_value(&self, worker: &ActorId) -> Option<Decimal> {
        find(&self.inferer_values, worker)
    }

    pub fn forecaster_value(&self, worker: &ActorId) -> Option<Decimal> {
        find(&self.forecaster_values, worker)
    }

    pub fn one_out_inferer_value(&self, worker: &ActorId) -> Option<Decimal> {
        find_withheld(&self.one_out_inferer_values, worker)
    }

    pub fn one_out_forecaster_value(&self, worker: &ActorId) -> Option<Decimal> {
        find_withheld(&self.one_out_forecaster_values, worker)
    }

    pub fn one_in_forecaster_value(&self, worker: &ActorId) -> Option<Decimal> {
        find(&self.one_in_forecaster_values, worker)
    }

    /// Every value carried by the bundle, labelled by field, in a fixed order.
    pub fn labelled_values(&self) -> Vec<(String, Decimal)> {
        let mut out = vec![
            ("combined".to_string(), self.combined_value),
            ("naive".to_string(), self.naive_value),
        ];
        out.extend(
            self.inferer_values
                .iter()
                .map(|v| (format!("inferer:{}", v.worker), v.value)),
        );
        out.extend(
            self.forecaster_values
                .iter()
                .map(|v| (format!("forecaster:{}", v.worker), v.value)),
        );
        out.extend(
            self.one_out_inferer_values
                .iter()
                .map(|v| (format!("one_out_inferer:{}", v.worker), v.value)),
        );
        out.extend(
            self.one_out_forecaster_values
                .iter()
                .map(|v| (format!("one_out_forecaster:{}", v.worker), v.value)),
        );
        out.extend(
            self.one_in_forecaster_values
                .iter()
                .map(|v| (format!("one_in_forecaster:{}", v.worker), v.value)),
        );
        out
    }

    /// Hex SHA-256 of the canonical JSON encoding.
    ///
    /// Decimals serialize as strings, so two nodes producing the same bundle
    /// produce the same digest.
    pub fn digest(&self) -> Result<String, AlloraError> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// One reputer's loss report for an epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputerValueBundle {
    pub reputer: ActorId,
    pub value_bundle: ValueBundle,
    /// Carried opaquely; verification belongs to the host chain.
    #[serde(default)]
    pub signature: String,
}
