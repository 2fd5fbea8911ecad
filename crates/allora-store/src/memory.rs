// crates/allora-store/src/memory.rs
//
// In-memory ledger backed by BTreeMaps, persisted as a JSON snapshot.
//
// Layout: one `TopicState` per topic holding its parameters, worker and
// reputer registrations, reputer stakes, score books per actor kind, the
// three regret books, and the network inference/loss bundle of every epoch
// keyed by block height.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use allora_core::{
    ActorId, ActorKind, AlloraError, BlockHeight, Decimal, LedgerReader, LedgerWriter, Nonce,
    RegretKey, Score, TimestampedValue, TopicId, TopicParams, ValueBundle, WriteBatch,
};

/// All persisted state of one topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicState {
    pub params: TopicParams,
    #[serde(default)]
    pub workers: BTreeSet<ActorId>,
    #[serde(default)]
    pub reputers: BTreeSet<ActorId>,
    #[serde(default)]
    pub stakes: BTreeMap<ActorId, Decimal>,
    #[serde(default)]
    pub inferer_scores: BTreeMap<ActorId, Score>,
    #[serde(default)]
    pub forecaster_scores: BTreeMap<ActorId, Score>,
    #[serde(default)]
    pub reputer_scores: BTreeMap<ActorId, Score>,
    #[serde(default)]
    pub inferer_regrets: BTreeMap<ActorId, TimestampedValue>,
    #[serde(default)]
    pub forecaster_regrets: BTreeMap<ActorId, TimestampedValue>,
    /// forecaster -> compared actor -> regret.
    #[serde(default)]
    pub one_in_forecaster_regrets: BTreeMap<ActorId, BTreeMap<ActorId, TimestampedValue>>,
    #[serde(default)]
    pub network_inference_bundles: BTreeMap<BlockHeight, ValueBundle>,
    #[serde(default)]
    pub network_loss_bundles: BTreeMap<BlockHeight, ValueBundle>,
}

impl TopicState {
    pub fn new(params: TopicParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Score book for one actor kind.
    pub fn scores(&self, kind: ActorKind) -> &BTreeMap<ActorId, Score> {
        match kind {
            ActorKind::Inferer => &self.inferer_scores,
            ActorKind::Forecaster => &self.forecaster_scores,
            ActorKind::Reputer => &self.reputer_scores,
        }
    }

    fn scores_mut(&mut self, kind: ActorKind) -> &mut BTreeMap<ActorId, Score> {
        match kind {
            ActorKind::Inferer => &mut self.inferer_scores,
            ActorKind::Forecaster => &mut self.forecaster_scores,
            ActorKind::Reputer => &mut self.reputer_scores,
        }
    }

    fn regret(&self, key: &RegretKey) -> Option<TimestampedValue> {
        match key {
            RegretKey::Inferer(actor) => self.inferer_regrets.get(actor).copied(),
            RegretKey::Forecaster(actor) => self.forecaster_regrets.get(actor).copied(),
            RegretKey::OneInForecaster { forecaster, inferer } => self
                .one_in_forecaster_regrets
                .get(forecaster)
                .and_then(|row| row.get(inferer))
                .copied(),
        }
    }

    fn set_regret(&mut self, key: RegretKey, value: TimestampedValue) {
        match key {
            RegretKey::Inferer(actor) => {
                self.inferer_regrets.insert(actor, value);
            }
            RegretKey::Forecaster(actor) => {
                self.forecaster_regrets.insert(actor, value);
            }
            RegretKey::OneInForecaster { forecaster, inferer } => {
                self.one_in_forecaster_regrets
                    .entry(forecaster)
                    .or_default()
                    .insert(inferer, value);
            }
        }
    }
}

/// Ledger holding every topic in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryLedger {
    #[serde(default)]
    topics: BTreeMap<TopicId, TopicState>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a ledger snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AlloraError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            AlloraError::Storage(format!("Failed to read snapshot {}: {}", path.display(), e))
        })?;
        let ledger: InMemoryLedger = serde_json::from_slice(&bytes)?;
        tracing::debug!(
            "Loaded ledger snapshot from {} ({} topics)",
            path.display(),
            ledger.topics.len()
        );
        Ok(ledger)
    }

    /// Write the ledger snapshot as pretty JSON.
    ///
    /// Writes to a sibling temp file first and renames it over the target.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AlloraError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        tracing::debug!("Saved ledger snapshot to {}", path.display());
        Ok(())
    }

    /// Create a topic. Fails if the id is taken or the parameters are invalid.
    pub fn create_topic(&mut self, topic_id: TopicId, params: TopicParams) -> Result<(), AlloraError> {
        params.validate()?;
        if self.topics.contains_key(&topic_id) {
            return Err(AlloraError::InvalidInput(format!(
                "topic {} already exists",
                topic_id
            )));
        }
        self.topics.insert(topic_id, TopicState::new(params));
        Ok(())
    }

    /// Replace a topic's parameters.
    pub fn update_params(&mut self, topic_id: TopicId, params: TopicParams) -> Result<(), AlloraError> {
        params.validate()?;
        self.topic_mut(topic_id)?.params = params;
        Ok(())
    }

    pub fn register_worker(&mut self, topic_id: TopicId, actor: ActorId) -> Result<(), AlloraError> {
        self.topic_mut(topic_id)?.workers.insert(actor);
        Ok(())
    }

    pub fn register_reputer(&mut self, topic_id: TopicId, actor: ActorId) -> Result<(), AlloraError> {
        self.topic_mut(topic_id)?.reputers.insert(actor);
        Ok(())
    }

    pub fn set_stake(&mut self, topic_id: TopicId, reputer: ActorId, amount: Decimal) -> Result<(), AlloraError> {
        if amount < Decimal::ZERO {
            return Err(AlloraError::InvalidInput(format!(
                "stake must be non-negative, got {}",
                amount
            )));
        }
        self.topic_mut(topic_id)?.stakes.insert(reputer, amount);
        Ok(())
    }

    /// Ids of every topic, ascending.
    pub fn topic_ids(&self) -> Vec<TopicId> {
        self.topics.keys().copied().collect()
    }

    /// Read-only view of one topic.
    pub fn topic(&self, topic_id: TopicId) -> Result<&TopicState, AlloraError> {
        self.topics
            .get(&topic_id)
            .ok_or_else(|| AlloraError::NotFound(format!("topic {}", topic_id)))
    }

    fn topic_mut(&mut self, topic_id: TopicId) -> Result<&mut TopicState, AlloraError> {
        self.topics
            .get_mut(&topic_id)
            .ok_or_else(|| AlloraError::NotFound(format!("topic {}", topic_id)))
    }

    pub fn network_inference_bundle(&self, topic_id: TopicId, nonce: Nonce) -> Result<Option<&ValueBundle>, AlloraError> {
        Ok(self.topic(topic_id)?.network_inference_bundles.get(&nonce.block_height))
    }

    pub fn network_loss_bundle(&self, topic_id: TopicId, nonce: Nonce) -> Result<Option<&ValueBundle>, AlloraError> {
        Ok(self.topic(topic_id)?.network_loss_bundles.get(&nonce.block_height))
    }
}

impl LedgerReader for InMemoryLedger {
    fn get_params(&self, topic_id: TopicId) -> Result<TopicParams, AlloraError> {
        Ok(self.topic(topic_id)?.params.clone())
    }

    fn is_worker_registered(&self, topic_id: TopicId, actor: &ActorId) -> Result<bool, AlloraError> {
        Ok(self.topic(topic_id)?.workers.contains(actor))
    }

    fn is_reputer_registered(&self, topic_id: TopicId, actor: &ActorId) -> Result<bool, AlloraError> {
        Ok(self.topic(topic_id)?.reputers.contains(actor))
    }

    fn get_stake(&self, topic_id: TopicId, reputer: &ActorId) -> Result<Decimal, AlloraError> {
        Ok(self
            .topic(topic_id)?
            .stakes
            .get(reputer)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    fn get_regret(&self, topic_id: TopicId, key: &RegretKey) -> Result<Option<TimestampedValue>, AlloraError> {
        Ok(self.topic(topic_id)?.regret(key))
    }

    fn get_score(&self, topic_id: TopicId, kind: ActorKind, actor: &ActorId) -> Result<Option<Score>, AlloraError> {
        Ok(self.topic(topic_id)?.scores(kind).get(actor).cloned())
    }

    fn get_latest_network_loss_bundle(&self, topic_id: TopicId) -> Result<Option<ValueBundle>, AlloraError> {
        Ok(self
            .topic(topic_id)?
            .network_loss_bundles
            .values()
            .next_back()
            .cloned())
    }
}

impl LedgerWriter for InMemoryLedger {
    fn set_regret(&mut self, topic_id: TopicId, key: RegretKey, value: TimestampedValue) -> Result<(), AlloraError> {
        self.topic_mut(topic_id)?.set_regret(key, value);
        Ok(())
    }

    fn set_score(&mut self, topic_id: TopicId, kind: ActorKind, score: Score) -> Result<(), AlloraError> {
        self.topic_mut(topic_id)?
            .scores_mut(kind)
            .insert(score.address.clone(), score);
        Ok(())
    }

    fn insert_network_loss_bundle(&mut self, topic_id: TopicId, nonce: Nonce, bundle: ValueBundle) -> Result<(), AlloraError> {
        let topic = self.topic_mut(topic_id)?;
        if topic
            .network_loss_bundles
            .insert(nonce.block_height, bundle)
            .is_some()
        {
            tracing::debug!("Replaced network loss bundle for topic {} at {}", topic_id, nonce);
        }
        Ok(())
    }

    fn insert_network_inference_bundle(&mut self, topic_id: TopicId, nonce: Nonce, bundle: ValueBundle) -> Result<(), AlloraError> {
        let topic = self.topic_mut(topic_id)?;
        if topic
            .network_inference_bundles
            .insert(nonce.block_height, bundle)
            .is_some()
        {
            tracing::debug!("Replaced network inference bundle for topic {} at {}", topic_id, nonce);
        }
        Ok(())
    }

    /// Apply the batch to a copy of the topic map and swap it in, so a
    /// failing write leaves the ledger untouched.
    fn apply_batch(&mut self, batch: WriteBatch) -> Result<(), AlloraError> {
        let mut working = self.clone();
        for write in batch {
            working.apply(write)?;
        }
        *self = working;
        Ok(())
    }
}
