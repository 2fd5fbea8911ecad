// crates/allora-core/src/actor.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a topic (one prediction market).
pub type TopicId = u64;

/// Block height at which an epoch's work was requested.
pub type BlockHeight = u64;

/// Address of a participant (worker or reputer).
///
/// Ordered lexicographically; every computation whose result depends on
/// visitation order walks actors in this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Role an actor plays in a topic. Selects which score book an operation
/// reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// Worker submitting a point inference.
    Inferer,
    /// Worker submitting predicted losses of other inferers.
    Forecaster,
    /// Stake-holder reporting losses of the network and of each worker.
    Reputer,
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorKind::Inferer => write!(f, "inferer"),
            ActorKind::Forecaster => write!(f, "forecaster"),
            ActorKind::Reputer => write!(f, "reputer"),
        }
    }
}

/// Identifies the epoch a submission answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nonce {
    pub block_height: BlockHeight,
}

impl Nonce {
    pub fn new(block_height: BlockHeight) -> Self {
        Self { block_height }
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nonce@{}", self.block_height)
    }
}
