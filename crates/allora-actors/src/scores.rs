// crates/allora-actors/src/scores.rs

use std::collections::BTreeMap;

use allora_core::math::ema;
use allora_core::{ActorId, ActorKind, AlloraError, BlockHeight, Decimal, LedgerReader, Score, TopicId};

/// Current scores of `actors` in one role. Actors with no score read as zero.
pub fn load_scores<'a, L, I>(
    ledger: &L,
    topic_id: TopicId,
    kind: ActorKind,
    actors: I,
) -> Result<BTreeMap<ActorId, Decimal>, AlloraError>
where
    L: LedgerReader + ?Sized,
    I: IntoIterator<Item = &'a ActorId>,
{
    let mut out = BTreeMap::new();
    for actor in actors {
        let score = ledger
            .get_score(topic_id, kind, actor)?
            .map(|s| s.score)
            .unwrap_or(Decimal::ZERO);
        out.insert(actor.clone(), score);
    }
    Ok(out)
}

/// Next score record: `alpha · current + (1 − alpha) · previous`.
pub fn score_ema(
    topic_id: TopicId,
    block_height: BlockHeight,
    actor: &ActorId,
    alpha: Decimal,
    current: Decimal,
    previous: Decimal,
) -> Result<Score, AlloraError> {
    Ok(Score {
        topic_id,
        block_height,
        address: actor.clone(),
        score: ema(alpha, current, previous)?,
    })
}
