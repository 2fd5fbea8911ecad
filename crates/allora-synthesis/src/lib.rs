// crates/allora-synthesis/src/lib.rs
//
// allora-synthesis: the numerical core of Allora inference synthesis.
//
// Turns one epoch's accepted inferences and forecasts into a network
// inference bundle (combined, naive, one-out and one-in variants), folds
// reputers' loss reports into a stake-weighted network loss bundle, and
// advances every actor's regret from that loss bundle.

pub mod forecast_implied;
pub mod network_inference;
pub mod network_loss;
pub mod regret;
pub mod variants;
pub mod weighted;

pub use forecast_implied::compute_forecast_implied_inferences;
pub use network_inference::synthesize;
pub use network_loss::aggregate_network_losses;
pub use regret::update_regrets;
pub use weighted::{combined_inference, max_regret, OneInView, RegretSnapshot, RegretSource, Weighting};
