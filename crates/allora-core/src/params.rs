// crates/allora-core/src/params.rs
//
// Per-topic parameters for inference synthesis.
// Deserializable from TOML/JSON with per-field defaults, then validated.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AlloraError;

/// How top-N actors are chosen when scores tie at the selection boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopNStrategy {
    /// Linear pass in actor-id order keeping a running minimum; ties at the
    /// boundary keep the actor seen first.
    #[default]
    RunningMinimum,
    /// Binary heap with a random tiebreak drawn from an RNG seeded by the
    /// block height.
    RandomTiebreakHeap,
}

/// Synthesis parameters for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicParams {
    /// Smallest weight total / normalizer treated as non-zero.
    #[serde(default = "default_epsilon")]
    pub epsilon: Decimal,

    /// Exponent of the potential function whose gradient turns normalized
    /// regret into a weight.
    #[serde(default = "default_p_norm")]
    pub p_norm: Decimal,

    /// EMA rate for regret updates.
    #[serde(default = "default_alpha_regret")]
    pub alpha_regret: Decimal,

    /// EMA rate for score updates (including quantile backfill).
    #[serde(default = "default_alpha_score")]
    pub alpha_score: Decimal,

    /// Quantile of the selected actors' scores handed to non-selected actors.
    #[serde(default = "default_active_quantile")]
    pub active_quantile: Decimal,

    /// Maximum number of actors of each kind admitted to an epoch.
    #[serde(default = "default_max_top_actors")]
    pub max_top_actors: usize,

    /// Tie-breaking strategy for top-N selection.
    #[serde(default)]
    pub top_n_strategy: TopNStrategy,
}

fn default_epsilon() -> Decimal {
    dec!(0.0001)
}

fn default_p_norm() -> Decimal {
    dec!(3.0)
}

fn default_alpha_regret() -> Decimal {
    dec!(0.1)
}

fn default_alpha_score() -> Decimal {
    dec!(0.1)
}

fn default_active_quantile() -> Decimal {
    dec!(0.25)
}

fn default_max_top_actors() -> usize {
    16
}

impl Default for TopicParams {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            p_norm: default_p_norm(),
            alpha_regret: default_alpha_regret(),
            alpha_score: default_alpha_score(),
            active_quantile: default_active_quantile(),
            max_top_actors: default_max_top_actors(),
            top_n_strategy: TopNStrategy::default(),
        }
    }
}

fn check_unit_interval(name: &str, value: Decimal) -> Result<(), AlloraError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(AlloraError::InvalidInput(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

impl TopicParams {
    /// Reject parameter sets the engine cannot run with.
    pub fn validate(&self) -> Result<(), AlloraError> {
        if self.epsilon <= Decimal::ZERO {
            return Err(AlloraError::InvalidInput(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if self.p_norm < Decimal::ONE {
            return Err(AlloraError::InvalidInput(format!(
                "p_norm must be at least 1, got {}",
                self.p_norm
            )));
        }
        check_unit_interval("alpha_regret", self.alpha_regret)?;
        check_unit_interval("alpha_score", self.alpha_score)?;
        check_unit_interval("active_quantile", self.active_quantile)?;
        if self.max_top_actors == 0 {
            return Err(AlloraError::InvalidInput(
                "max_top_actors must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
