// crates/allora-synthesis/src/regret.rs
//
// Regret updates from a network loss bundle.
//
// regret ← (1 − α) · regret + α · (reference_loss − actor_loss)
//
// For inferers and forecasters the reference is the network combined loss.
// For the one-in kind the reference is the forecaster's one-in loss,
// compared against every inferer's loss and against the forecaster's own
// forecaster loss. Regrets are never clamped.

use allora_core::math::{ema, sub};
use allora_core::{
    ActorId, AlloraError, BlockHeight, Decimal, LedgerReader, LedgerWriter, RegretKey,
    TimestampedValue, TopicId, ValueBundle,
};

fn advance<L>(
    ledger: &mut L,
    topic_id: TopicId,
    key: RegretKey,
    reference: Decimal,
    loss: Decimal,
    block_height: BlockHeight,
    alpha: Decimal,
) -> Result<(), AlloraError>
where
    L: LedgerReader + LedgerWriter + ?Sized,
{
    let previous = ledger
        .get_regret(topic_id, &key)?
        .map(|r| r.value)
        .unwrap_or(Decimal::ZERO);
    let value = ema(alpha, sub(reference, loss)?, previous)?;
    ledger.set_regret(topic_id, key, TimestampedValue { block_height, value })
}

/// Advance every regret the loss bundle has a loss for.
///
/// Returns the number of regret records written.
pub fn update_regrets<L>(
    ledger: &mut L,
    topic_id: TopicId,
    loss_bundle: &ValueBundle,
    block_height: BlockHeight,
    alpha: Decimal,
) -> Result<usize, AlloraError>
where
    L: LedgerReader + LedgerWriter + ?Sized,
{
    let network_loss = loss_bundle.combined_value;
    let mut written = 0;

    for v in &loss_bundle.inferer_values {
        let key = RegretKey::Inferer(v.worker.clone());
        advance(ledger, topic_id, key, network_loss, v.value, block_height, alpha)?;
        written += 1;
    }

    for v in &loss_bundle.forecaster_values {
        let key = RegretKey::Forecaster(v.worker.clone());
        advance(ledger, topic_id, key, network_loss, v.value, block_height, alpha)?;
        written += 1;
    }

    for one_in in &loss_bundle.one_in_forecaster_values {
        let forecaster: &ActorId = &one_in.worker;
        for inferer in &loss_bundle.inferer_values {
            let key = RegretKey::one_in(forecaster, &inferer.worker);
            advance(ledger, topic_id, key, one_in.value, inferer.value, block_height, alpha)?;
            written += 1;
        }
        match loss_bundle.forecaster_value(forecaster) {
            Some(own_loss) => {
                let key = RegretKey::one_in(forecaster, forecaster);
                advance(ledger, topic_id, key, one_in.value, own_loss, block_height, alpha)?;
                written += 1;
            }
            None => tracing::debug!(
                "No forecaster loss for {}; skipping one-in self regret",
                forecaster
            ),
        }
    }

    tracing::debug!(
        "Updated {} regret(s) for topic {} at block {}",
        written,
        topic_id,
        block_height
    );
    Ok(written)
}
