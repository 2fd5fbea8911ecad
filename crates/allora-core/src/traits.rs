// crates/allora-core/src/traits.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, ActorKind, Nonce, TopicId};
use crate::bundle::ValueBundle;
use crate::error::AlloraError;
use crate::params::TopicParams;
use crate::score::{RegretKey, Score, TimestampedValue};

/// Read side of the ledger the engine is parameterized by.
///
/// Implemented by allora-store (in-memory snapshot ledger and the staged
/// overlay used to make an epoch's writes all-or-nothing).
pub trait LedgerReader {
    /// Synthesis parameters of a topic. Fails with `NotFound` for an unknown topic.
    fn get_params(&self, topic_id: TopicId) -> Result<TopicParams, AlloraError>;

    /// Whether the actor may submit inferences/forecasts to the topic.
    fn is_worker_registered(&self, topic_id: TopicId, actor: &ActorId) -> Result<bool, AlloraError>;

    /// Whether the actor may submit loss reports to the topic.
    fn is_reputer_registered(&self, topic_id: TopicId, actor: &ActorId) -> Result<bool, AlloraError>;

    /// Stake a reputer has placed on the topic (zero if none).
    fn get_stake(&self, topic_id: TopicId, reputer: &ActorId) -> Result<Decimal, AlloraError>;

    /// Latest regret record for a key, if one was ever written.
    fn get_regret(&self, topic_id: TopicId, key: &RegretKey) -> Result<Option<TimestampedValue>, AlloraError>;

    /// Latest score EMA of an actor in one role.
    fn get_score(&self, topic_id: TopicId, kind: ActorKind, actor: &ActorId) -> Result<Option<Score>, AlloraError>;

    /// Most recently inserted network loss bundle of the topic.
    fn get_latest_network_loss_bundle(&self, topic_id: TopicId) -> Result<Option<ValueBundle>, AlloraError>;

    fn get_inferer_regret(&self, topic_id: TopicId, inferer: &ActorId) -> Result<Option<TimestampedValue>, AlloraError> {
        self.get_regret(topic_id, &RegretKey::Inferer(inferer.clone()))
    }

    fn get_forecaster_regret(&self, topic_id: TopicId, forecaster: &ActorId) -> Result<Option<TimestampedValue>, AlloraError> {
        self.get_regret(topic_id, &RegretKey::Forecaster(forecaster.clone()))
    }

    fn get_one_in_forecaster_regret(
        &self,
        topic_id: TopicId,
        forecaster: &ActorId,
        inferer: &ActorId,
    ) -> Result<Option<TimestampedValue>, AlloraError> {
        self.get_regret(topic_id, &RegretKey::one_in(forecaster, inferer))
    }
}

/// A single ledger mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerWrite {
    Regret {
        topic_id: TopicId,
        key: RegretKey,
        value: TimestampedValue,
    },
    Score {
        topic_id: TopicId,
        kind: ActorKind,
        score: Score,
    },
    NetworkLossBundle {
        topic_id: TopicId,
        nonce: Nonce,
        bundle: ValueBundle,
    },
    NetworkInferenceBundle {
        topic_id: TopicId,
        nonce: Nonce,
        bundle: ValueBundle,
    },
}

/// Ordered list of mutations applied together.
pub type WriteBatch = Vec<LedgerWrite>;

/// Write side of the ledger.
pub trait LedgerWriter {
    fn set_regret(&mut self, topic_id: TopicId, key: RegretKey, value: TimestampedValue) -> Result<(), AlloraError>;

    fn set_score(&mut self, topic_id: TopicId, kind: ActorKind, score: Score) -> Result<(), AlloraError>;

    fn insert_network_loss_bundle(&mut self, topic_id: TopicId, nonce: Nonce, bundle: ValueBundle) -> Result<(), AlloraError>;

    fn insert_network_inference_bundle(&mut self, topic_id: TopicId, nonce: Nonce, bundle: ValueBundle) -> Result<(), AlloraError>;

    fn set_inferer_regret(&mut self, topic_id: TopicId, inferer: &ActorId, value: TimestampedValue) -> Result<(), AlloraError> {
        self.set_regret(topic_id, RegretKey::Inferer(inferer.clone()), value)
    }

    fn set_forecaster_regret(&mut self, topic_id: TopicId, forecaster: &ActorId, value: TimestampedValue) -> Result<(), AlloraError> {
        self.set_regret(topic_id, RegretKey::Forecaster(forecaster.clone()), value)
    }

    fn set_one_in_forecaster_regret(
        &mut self,
        topic_id: TopicId,
        forecaster: &ActorId,
        inferer: &ActorId,
        value: TimestampedValue,
    ) -> Result<(), AlloraError> {
        self.set_regret(topic_id, RegretKey::one_in(forecaster, inferer), value)
    }

    /// Apply one mutation.
    fn apply(&mut self, write: LedgerWrite) -> Result<(), AlloraError> {
        match write {
            LedgerWrite::Regret { topic_id, key, value } => self.set_regret(topic_id, key, value),
            LedgerWrite::Score { topic_id, kind, score } => self.set_score(topic_id, kind, score),
            LedgerWrite::NetworkLossBundle { topic_id, nonce, bundle } => {
                self.insert_network_loss_bundle(topic_id, nonce, bundle)
            }
            LedgerWrite::NetworkInferenceBundle { topic_id, nonce, bundle } => {
                self.insert_network_inference_bundle(topic_id, nonce, bundle)
            }
        }
    }

    /// Apply a batch in order.
    fn apply_batch(&mut self, batch: WriteBatch) -> Result<(), AlloraError> {
        for write in batch {
            self.apply(write)?;
        }
        Ok(())
    }
}
