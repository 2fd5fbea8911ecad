// crates/allora-epoch/src/reputer_round.rs
//
// Reputer round: loss reports -> network loss bundle -> regrets.

use std::collections::BTreeMap;

use allora_actors::{
    backfill_scores, filter_reputer_reports, load_scores, select_top_n, BackfillParams,
};
use allora_core::{
    ActorId, ActorKind, AlloraError, Decimal, LedgerReader, LedgerWriter, Nonce,
    ReputerValueBundle, TopicId, TopicParams,
};
use allora_store::StagedLedger;
use allora_synthesis::{aggregate_network_losses, update_regrets};

use crate::report::ReputerRoundReport;

/// Run the reputer round for the epoch identified by `nonce` and commit
/// its writes.
///
/// Steps:
/// 1. Filter reports (structure, nonce, registration, stake, duplicates)
/// 2. Select top-N reputers by stored score and backfill the rest
/// 3. Aggregate the selected reports into the network loss bundle
/// 4. Insert the bundle and advance every regret it covers
///
/// Nothing is written to `ledger` unless every step succeeds, so a failed
/// aggregation leaves the previous regrets in place.
pub fn run_reputer_round<L>(
    ledger: &mut L,
    topic_id: TopicId,
    nonce: Nonce,
    reports: &[ReputerValueBundle],
) -> Result<ReputerRoundReport, AlloraError>
where
    L: LedgerReader + LedgerWriter,
{
    let params = ledger.get_params(topic_id)?;

    let (report, batch) = {
        let mut staged = StagedLedger::new(&*ledger);
        let report = reputer_round(&mut staged, topic_id, nonce, reports, &params)?;
        (report, staged.into_batch())
    };

    let writes = batch.len();
    ledger.apply_batch(batch)?;

    tracing::info!(
        "Topic {} {}: reputer round committed ({} writes, {} regret(s), digest {})",
        topic_id,
        nonce,
        writes,
        report.regrets_updated,
        report.digest
    );
    Ok(report)
}

fn reputer_round<L: LedgerReader>(
    staged: &mut StagedLedger<'_, L>,
    topic_id: TopicId,
    nonce: Nonce,
    reports: &[ReputerValueBundle],
    params: &TopicParams,
) -> Result<ReputerRoundReport, AlloraError> {
    let block_height = nonce.block_height;

    // Step 1: Filter reports
    let filtered = filter_reputer_reports(&*staged, topic_id, nonce, reports)?;

    // Step 2: Top-N reputers
    let scores = load_scores(&*staged, topic_id, ActorKind::Reputer, filtered.stakes.keys())?;
    let selection = select_top_n(params.max_top_actors, &scores, params.top_n_strategy, block_height);
    let backfilled_reputers = backfill_scores(
        staged,
        topic_id,
        block_height,
        ActorKind::Reputer,
        &scores,
        &selection,
        BackfillParams::from(params),
    )?;

    let selected_reports: Vec<ReputerValueBundle> = filtered
        .reports
        .iter()
        .filter(|r| selection.selected_set.contains(&r.reputer))
        .cloned()
        .collect();
    let stakes: BTreeMap<ActorId, Decimal> = filtered
        .stakes
        .iter()
        .filter(|(r, _)| selection.selected_set.contains(*r))
        .map(|(r, s)| (r.clone(), *s))
        .collect();

    // Step 3: Aggregate
    let bundle = aggregate_network_losses(&stakes, &selected_reports, topic_id, block_height, params.epsilon)?;

    // Step 4: Insert and update regrets
    staged.insert_network_loss_bundle(topic_id, nonce, bundle.clone())?;
    let regrets_updated = update_regrets(staged, topic_id, &bundle, block_height, params.alpha_regret)?;
    let digest = bundle.digest()?;

    Ok(ReputerRoundReport {
        topic_id,
        nonce,
        bundle,
        digest,
        rejections: filtered.rejections,
        selected_reputers: selection.selected,
        backfilled_reputers,
        regrets_updated,
    })
}
