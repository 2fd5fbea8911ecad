// crates/allora-actors/src/lib.rs
//
// allora-actors: who takes part in an epoch, and how the rest keep moving.
//
// Validates raw worker submissions and reputer reports, picks the top-N
// actors of each kind by score, and advances the score EMA of submitters
// left outside the top-N from a quantile of the selected actors' scores.

pub mod backfill;
pub mod filter;
pub mod reputer_filter;
pub mod scores;
pub mod top_n;

pub use backfill::{backfill_scores, BackfillParams};
pub use filter::{filter_worker_submissions, FilteredSubmissions, Rejection, RejectionReason};
pub use reputer_filter::{filter_reputer_reports, FilteredReports};
pub use scores::{load_scores, score_ema};
pub use top_n::{select_top_n, TopNSelection};
