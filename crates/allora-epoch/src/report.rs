// crates/allora-epoch/src/report.rs

use serde::{Deserialize, Serialize};

use allora_actors::Rejection;
use allora_core::{ActorId, Nonce, Score, TopicId, ValueBundle};

/// Outcome of a committed worker round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRoundReport {
    pub topic_id: TopicId,
    pub nonce: Nonce,
    /// The network inference bundle written to the ledger.
    pub bundle: ValueBundle,
    /// Hex SHA-256 of `bundle`.
    pub digest: String,
    pub rejections: Vec<Rejection>,
    pub selected_inferers: Vec<ActorId>,
    pub selected_forecasters: Vec<ActorId>,
    pub backfilled_inferers: Vec<Score>,
    pub backfilled_forecasters: Vec<Score>,
}

/// Outcome of a committed reputer round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputerRoundReport {
    pub topic_id: TopicId,
    pub nonce: Nonce,
    /// The network loss bundle (log10 losses) written to the ledger.
    pub bundle: ValueBundle,
    pub digest: String,
    pub rejections: Vec<Rejection>,
    pub selected_reputers: Vec<ActorId>,
    pub backfilled_reputers: Vec<Score>,
    pub regrets_updated: usize,
}
