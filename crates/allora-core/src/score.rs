// crates/allora-core/src/score.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, BlockHeight, TopicId};

/// Latest EMA of an actor's relative quality in a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub topic_id: TopicId,
    pub block_height: BlockHeight,
    pub address: ActorId,
    pub score: Decimal,
}

/// A scalar stamped with the block at which it was last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedValue {
    pub block_height: BlockHeight,
    pub value: Decimal,
}

/// Selects one persisted regret record within a topic.
///
/// The one-in kind is keyed by the forecaster whose implied inference is
/// the single forecast included, and by the actor being compared; the
/// forecaster's self-comparison uses its own id in both positions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegretKey {
    Inferer(ActorId),
    Forecaster(ActorId),
    OneInForecaster { forecaster: ActorId, inferer: ActorId },
}

impl RegretKey {
    pub fn one_in(forecaster: &ActorId, inferer: &ActorId) -> Self {
        RegretKey::OneInForecaster {
            forecaster: forecaster.clone(),
            inferer: inferer.clone(),
        }
    }
}
