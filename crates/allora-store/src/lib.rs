// crates/allora-store/src/lib.rs
//
// allora-store: Ledger implementations for Allora inference synthesis.
//
// Provides an in-memory ledger that persists itself as a JSON snapshot
// (topics, registrations, stakes, scores, regrets, and the network bundles
// of every epoch), and a staged overlay that buffers an epoch's writes so
// they reach the underlying ledger all together or not at all.

pub mod memory;
pub mod staged;

// Re-export key types for ergonomic access from downstream crates.
pub use memory::{InMemoryLedger, TopicState};
pub use staged::StagedLedger;
