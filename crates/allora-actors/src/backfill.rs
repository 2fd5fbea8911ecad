// crates/allora-actors/src/backfill.rs
//
// Quantile backfill for actors left outside the top-N.
//
// Non-selected actors still advance their score EMA, using one uniform
// input: the interpolated score at the active quantile of the selected
// actors' scores.

use std::collections::BTreeMap;

use allora_core::math::{self, quantile_of_descending};
use allora_core::{
    ActorId, ActorKind, AlloraError, BlockHeight, Decimal, LedgerWriter, Score, TopicId,
    TopicParams,
};

use crate::scores::score_ema;
use crate::top_n::TopNSelection;

/// Knobs of the backfill, normally taken from the topic parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillParams {
    pub quantile: Decimal,
    pub max_n: usize,
    pub alpha: Decimal,
}

impl From<&TopicParams> for BackfillParams {
    fn from(params: &TopicParams) -> Self {
        Self {
            quantile: params.active_quantile,
            max_n: params.max_top_actors,
            alpha: params.alpha_score,
        }
    }
}

impl BackfillParams {
    /// `max(quantile, 1 / max_n)`.
    pub fn effective_quantile(&self) -> Result<Decimal, AlloraError> {
        if self.max_n == 0 {
            return Err(AlloraError::InvalidInput(
                "max_n must be at least 1".to_string(),
            ));
        }
        let floor = math::div(Decimal::ONE, Decimal::from(self.max_n))?;
        Ok(self.quantile.max(floor))
    }
}

/// Advance the score of every observed-but-not-selected actor.
///
/// # Arguments
/// * `scores` - Actor -> prior score, for every actor in the selection.
/// * `selection` - Output of `select_top_n` over the same scores.
///
/// Returns the score records written. Fails with `EmptyInput` when nobody
/// was selected.
pub fn backfill_scores<L>(
    ledger: &mut L,
    topic_id: TopicId,
    block_height: BlockHeight,
    kind: ActorKind,
    scores: &BTreeMap<ActorId, Decimal>,
    selection: &TopNSelection,
    params: BackfillParams,
) -> Result<Vec<Score>, AlloraError>
where
    L: LedgerWriter + ?Sized,
{
    if selection.selected.is_empty() {
        return Err(AlloraError::EmptyInput(format!(
            "no selected {}s to backfill from in topic {}",
            kind, topic_id
        )));
    }

    let score_of = |a: &ActorId| scores.get(a).copied().unwrap_or(Decimal::ZERO);
    let mut selected_scores: Vec<Decimal> = selection.selected.iter().map(score_of).collect();
    selected_scores.sort_by(|a, b| b.cmp(a));

    let quantile = params.effective_quantile()?;
    let fill = quantile_of_descending(&selected_scores, quantile)?;

    let mut written = Vec::new();
    for actor in selection.not_selected() {
        let score = score_ema(topic_id, block_height, actor, params.alpha, fill, score_of(actor))?;
        ledger.set_score(topic_id, kind, score.clone())?;
        written.push(score);
    }

    if !written.is_empty() {
        tracing::debug!(
            "Backfilled {} {}(s) in topic {} with quantile score {}",
            written.len(),
            kind,
            topic_id,
            fill
        );
    }
    Ok(written)
}
