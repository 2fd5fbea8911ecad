// crates/allora-epoch/src/lib.rs
//
// allora-epoch: one topic epoch, end to end.
//
// The worker round turns raw worker submissions into the network inference
// bundle; the reputer round turns loss reports into the network loss bundle
// and advances regrets. Each round runs against a staged overlay of the
// ledger and commits its writes only if every step succeeded.

pub mod report;
pub mod reputer_round;
pub mod worker_round;

pub use report::{ReputerRoundReport, WorkerRoundReport};
pub use reputer_round::run_reputer_round;
pub use worker_round::run_worker_round;
