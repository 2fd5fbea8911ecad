// crates/allora-core/src/error.rs

use rust_decimal::Decimal;
use thiserror::Error;

use crate::actor::{BlockHeight, TopicId};

/// Error taxonomy for the inference-synthesis engine.
///
/// Per-submission problems (`InvalidInput`, `NotRegistered`) are normally
/// collected as rejection reasons by the filters rather than returned.
/// Arithmetic failures abort the whole topic-epoch computation.
#[derive(Debug, Error)]
pub enum AlloraError {
    /// Malformed bundle, parameter, or nonce.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The actor is not registered for the topic in the required role.
    #[error("Actor {actor} is not registered for topic {topic_id}")]
    NotRegistered { topic_id: TopicId, actor: String },

    /// A running average or normalization had no weight behind it.
    #[error("Divide by zero: {0}")]
    DivideByZero(String),

    /// The regret normalizer handed to the weighted combination is degenerate.
    #[error("Max regret {max_regret} is below epsilon {epsilon}")]
    MaxRegretBelowEpsilon { max_regret: Decimal, epsilon: Decimal },

    /// Every contribution to a weighted combination had ~zero weight.
    #[error("Sum of weights {sum_weights} does not exceed epsilon {epsilon}")]
    SumWeightsBelowEpsilon { sum_weights: Decimal, epsilon: Decimal },

    /// A computation that needs at least one element received none.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Nothing survived submission filtering.
    #[error("No valid submissions for topic {topic_id} at block {block_height}")]
    NoValidSubmissions {
        topic_id: TopicId,
        block_height: BlockHeight,
    },

    /// A loss that must be strictly positive (it is fed through log10) was not.
    #[error("Invalid loss {value} for {context}")]
    InvalidLoss { context: String, value: Decimal },

    /// Decimal overflow or a transcendental function outside its domain.
    #[error("Math error: {0}")]
    Math(String),

    /// Storage layer error (snapshot I/O).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for AlloraError {
    fn from(e: serde_json::Error) -> Self {
        AlloraError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for AlloraError {
    fn from(e: std::io::Error) -> Self {
        AlloraError::Storage(e.to_string())
    }
}
