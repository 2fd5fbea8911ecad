// crates/allora-store/src/staged.rs
//
// Write-buffering overlay over a ledger reader.
//
// An epoch computation reads and writes through a `StagedLedger`. Writes
// land in an overlay (so later reads in the same epoch observe them) and
// in an ordered batch. The caller commits the batch to the real ledger only
// after the whole epoch succeeded; dropping the overlay discards it.

use std::collections::BTreeMap;

use allora_core::{
    ActorId, ActorKind, AlloraError, BlockHeight, Decimal, LedgerReader, LedgerWrite,
    LedgerWriter, Nonce, RegretKey, Score, TimestampedValue, TopicId, TopicParams, ValueBundle,
    WriteBatch,
};

pub struct StagedLedger<'a, L: LedgerReader> {
    base: &'a L,
    regrets: BTreeMap<(TopicId, RegretKey), TimestampedValue>,
    scores: BTreeMap<(TopicId, ActorKind, ActorId), Score>,
    loss_bundles: BTreeMap<TopicId, BTreeMap<BlockHeight, ValueBundle>>,
    batch: WriteBatch,
}

impl<'a, L: LedgerReader> StagedLedger<'a, L> {
    pub fn new(base: &'a L) -> Self {
        Self {
            base,
            regrets: BTreeMap::new(),
            scores: BTreeMap::new(),
            loss_bundles: BTreeMap::new(),
            batch: WriteBatch::new(),
        }
    }

    /// Number of buffered writes.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Buffered writes in the order they were made.
    pub fn into_batch(self) -> WriteBatch {
        self.batch
    }
}

impl<L: LedgerReader> LedgerReader for StagedLedger<'_, L> {
    fn get_params(&self, topic_id: TopicId) -> Result<TopicParams, AlloraError> {
        self.base.get_params(topic_id)
    }

    fn is_worker_registered(&self, topic_id: TopicId, actor: &ActorId) -> Result<bool, AlloraError> {
        self.base.is_worker_registered(topic_id, actor)
    }

    fn is_reputer_registered(&self, topic_id: TopicId, actor: &ActorId) -> Result<bool, AlloraError> {
        self.base.is_reputer_registered(topic_id, actor)
    }

    fn get_stake(&self, topic_id: TopicId, reputer: &ActorId) -> Result<Decimal, AlloraError> {
        self.base.get_stake(topic_id, reputer)
    }

    fn get_regret(&self, topic_id: TopicId, key: &RegretKey) -> Result<Option<TimestampedValue>, AlloraError> {
        match self.regrets.get(&(topic_id, key.clone())) {
            Some(staged) => Ok(Some(*staged)),
            None => self.base.get_regret(topic_id, key),
        }
    }

    fn get_score(&self, topic_id: TopicId, kind: ActorKind, actor: &ActorId) -> Result<Option<Score>, AlloraError> {
        match self.scores.get(&(topic_id, kind, actor.clone())) {
            Some(staged) => Ok(Some(staged.clone())),
            None => self.base.get_score(topic_id, kind, actor),
        }
    }

    fn get_latest_network_loss_bundle(&self, topic_id: TopicId) -> Result<Option<ValueBundle>, AlloraError> {
        let base = self.base.get_latest_network_loss_bundle(topic_id)?;
        let staged = self
            .loss_bundles
            .get(&topic_id)
            .and_then(|bundles| bundles.values().next_back());
        Ok(match (base, staged) {
            (Some(b), Some(s)) if b.block_height > s.block_height => Some(b),
            (_, Some(s)) => Some(s.clone()),
            (b, None) => b,
        })
    }
}

impl<L: LedgerReader> LedgerWriter for StagedLedger<'_, L> {
    fn set_regret(&mut self, topic_id: TopicId, key: RegretKey, value: TimestampedValue) -> Result<(), AlloraError> {
        self.regrets.insert((topic_id, key.clone()), value);
        self.batch.push(LedgerWrite::Regret { topic_id, key, value });
        Ok(())
    }

    fn set_score(&mut self, topic_id: TopicId, kind: ActorKind, score: Score) -> Result<(), AlloraError> {
        self.scores
            .insert((topic_id, kind, score.address.clone()), score.clone());
        self.batch.push(LedgerWrite::Score { topic_id, kind, score });
        Ok(())
    }

    fn insert_network_loss_bundle(&mut self, topic_id: TopicId, nonce: Nonce, bundle: ValueBundle) -> Result<(), AlloraError> {
        self.loss_bundles
            .entry(topic_id)
            .or_default()
            .insert(nonce.block_height, bundle.clone());
        self.batch
            .push(LedgerWrite::NetworkLossBundle { topic_id, nonce, bundle });
        Ok(())
    }

    fn insert_network_inference_bundle(&mut self, topic_id: TopicId, nonce: Nonce, bundle: ValueBundle) -> Result<(), AlloraError> {
        self.batch
            .push(LedgerWrite::NetworkInferenceBundle { topic_id, nonce, bundle });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryLedger;
    use rust_decimal_macros::dec;

    fn base() -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        ledger.create_topic(1, TopicParams::default()).unwrap();
        ledger
            .set_inferer_regret(
                1,
                &ActorId::from("worker0"),
                TimestampedValue { block_height: 1, value: dec!(0.5) },
            )
            .unwrap();
        ledger
    }

    #[test]
    fn test_reads_fall_through_to_base() {
        let ledger = base();
        let staged = StagedLedger::new(&ledger);
        let regret = staged
            .get_inferer_regret(1, &ActorId::from("worker0"))
            .unwrap()
            .unwrap();
        assert_eq!(regret.value, dec!(0.5));
        assert_eq!(staged.pending(), 0);
    }

    #[test]
    fn test_staged_writes_shadow_base_without_touching_it() {
        let mut ledger = base();
        let worker = ActorId::from("worker0");
        let batch = {
            let mut staged = StagedLedger::new(&ledger);
            staged
                .set_inferer_regret(1, &worker, TimestampedValue { block_height: 2, value: dec!(0.9) })
                .unwrap();
            assert_eq!(staged.get_inferer_regret(1, &worker).unwrap().unwrap().value, dec!(0.9));
            assert_eq!(staged.pending(), 1);
            staged.into_batch()
        };
        assert_eq!(batch.len(), 1);
        assert_eq!(ledger.get_inferer_regret(1, &worker).unwrap().unwrap().value, dec!(0.5));

        ledger.apply_batch(batch).unwrap();
        assert_eq!(ledger.get_inferer_regret(1, &worker).unwrap().unwrap().value, dec!(0.9));
    }

    #[test]
    fn test_staged_loss_bundle_becomes_latest() {
        let ledger = base();
        let mut staged = StagedLedger::new(&ledger);
        assert!(staged.get_latest_network_loss_bundle(1).unwrap().is_none());

        let bundle = ValueBundle {
            topic_id: 1,
            block_height: 10,
            combined_value: dec!(0.2),
            ..ValueBundle::default()
        };
        staged
            .insert_network_loss_bundle(1, Nonce::new(10), bundle.clone())
            .unwrap();
        assert_eq!(staged.get_latest_network_loss_bundle(1).unwrap(), Some(bundle));
    }
}
