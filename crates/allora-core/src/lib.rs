// crates/allora-core/src/lib.rs
//
// allora-core: Core types, ledger traits, and decimal math for Allora
// inference synthesis.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the per-epoch data model (inferences, forecasts, value bundles,
// scores, regrets), the error taxonomy, the ledger read/write interfaces the
// synthesis engine is parameterized by, and the deterministic decimal
// helpers every computation routes through.

pub mod actor;
pub mod bundle;
pub mod error;
pub mod inference;
pub mod math;
pub mod params;
pub mod score;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use allora_core::ValueBundle;`

// Decimal type used for every value in the engine.
pub use rust_decimal::Decimal;

// Actor identity types
pub use actor::{ActorId, ActorKind, BlockHeight, Nonce, TopicId};

// Submission types
pub use inference::{
    Forecast, ForecastElement, Inference, InferenceForecastBundle, WorkerDataBundle,
};

// Bundle types
pub use bundle::{
    ReputerValueBundle, ValueBundle, WithheldWorkerAttributedValue, WorkerAttributedValue,
};

// Score and regret types
pub use score::{RegretKey, Score, TimestampedValue};

// Parameters
pub use params::{TopNStrategy, TopicParams};

// Error type
pub use error::AlloraError;

// Traits
pub use traits::{LedgerReader, LedgerWrite, LedgerWriter, WriteBatch};
