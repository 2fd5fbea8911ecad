// crates/allora-epoch/src/worker_round.rs
//
// Worker round: raw worker submissions -> network inference bundle.

use std::collections::{BTreeMap, BTreeSet};

use allora_actors::{
    backfill_scores, filter_worker_submissions, load_scores, select_top_n, BackfillParams,
};
use allora_core::inference::values_by_inferer;
use allora_core::math::pow10;
use allora_core::{
    ActorId, ActorKind, AlloraError, Forecast, LedgerReader, LedgerWriter, Nonce, TopicId,
    TopicParams, WorkerDataBundle,
};
use allora_store::StagedLedger;
use allora_synthesis::{synthesize, RegretSnapshot, Weighting};

use crate::report::WorkerRoundReport;

/// Run the worker round of one topic epoch and commit its writes.
///
/// Steps:
/// 1. Filter submissions (structure, nonce, registration, duplicates)
/// 2. Select top-N inferers and forecasters by stored score
/// 3. Backfill the scores of submitters left out
/// 4. Restrict forecasts to the selected inferers
/// 5. Read the previous network loss and the participants' regrets
/// 6. Synthesize and insert the network inference bundle
///
/// Nothing is written to `ledger` unless every step succeeds.
pub fn run_worker_round<L>(
    ledger: &mut L,
    topic_id: TopicId,
    nonce: Nonce,
    submissions: &[WorkerDataBundle],
) -> Result<WorkerRoundReport, AlloraError>
where
    L: LedgerReader + LedgerWriter,
{
    let params = ledger.get_params(topic_id)?;

    let (report, batch) = {
        let mut staged = StagedLedger::new(&*ledger);
        let report = worker_round(&mut staged, topic_id, nonce, submissions, &params)?;
        (report, staged.into_batch())
    };

    let writes = batch.len();
    ledger.apply_batch(batch)?;

    tracing::info!(
        "Topic {} {}: worker round committed ({} writes, {} rejection(s), digest {})",
        topic_id,
        nonce,
        writes,
        report.rejections.len(),
        report.digest
    );
    Ok(report)
}

fn worker_round<L: LedgerReader>(
    staged: &mut StagedLedger<'_, L>,
    topic_id: TopicId,
    nonce: Nonce,
    submissions: &[WorkerDataBundle],
    params: &TopicParams,
) -> Result<WorkerRoundReport, AlloraError> {
    let block_height = nonce.block_height;

    // Step 1: Filter submissions
    let filtered = filter_worker_submissions(&*staged, topic_id, nonce, submissions)?;

    // Step 2: Top-N inferers and forecasters
    let inferer_scores = load_scores(&*staged, topic_id, ActorKind::Inferer, filtered.inferences.keys())?;
    let inferer_selection = select_top_n(
        params.max_top_actors,
        &inferer_scores,
        params.top_n_strategy,
        block_height,
    );
    let forecaster_scores =
        load_scores(&*staged, topic_id, ActorKind::Forecaster, filtered.forecasts.keys())?;
    let forecaster_selection = select_top_n(
        params.max_top_actors,
        &forecaster_scores,
        params.top_n_strategy,
        block_height,
    );

    // Step 3: Backfill non-selected submitters
    let backfill = BackfillParams::from(params);
    let backfilled_inferers = backfill_scores(
        staged,
        topic_id,
        block_height,
        ActorKind::Inferer,
        &inferer_scores,
        &inferer_selection,
        backfill,
    )?;
    let backfilled_forecasters = if forecaster_selection.selected.is_empty() {
        Vec::new()
    } else {
        backfill_scores(
            staged,
            topic_id,
            block_height,
            ActorKind::Forecaster,
            &forecaster_scores,
            &forecaster_selection,
            backfill,
        )?
    };

    // Step 4: Restrict to the selected actors
    let inferences: BTreeMap<ActorId, _> = values_by_inferer(&filtered.inferences)
        .into_iter()
        .filter(|(actor, _)| inferer_selection.selected_set.contains(actor))
        .collect();
    let selected_inferers: BTreeSet<ActorId> = inferences.keys().cloned().collect();
    let forecasts: Vec<Forecast> = forecaster_selection
        .selected
        .iter()
        .filter_map(|f| filtered.forecasts.get(f))
        .filter_map(|f| f.restricted_to(&selected_inferers))
        .collect();

    // Step 5: Previous network loss and regrets
    let network_combined_loss = staged
        .get_latest_network_loss_bundle(topic_id)?
        .map(|b| pow10(b.combined_value))
        .transpose()?;
    if network_combined_loss.is_none() && !forecasts.is_empty() {
        tracing::warn!(
            "Topic {} {}: no network loss yet, forecasts will not be used",
            topic_id,
            nonce
        );
    }
    let forecasters: Vec<&ActorId> = forecasts.iter().map(|f| &f.forecaster).collect();
    let regrets = RegretSnapshot::load(&*staged, topic_id, inferences.keys(), forecasters)?;

    // Step 6: Synthesize and insert
    let bundle = synthesize(
        topic_id,
        block_height,
        &inferences,
        &forecasts,
        network_combined_loss,
        &regrets,
        Weighting::from(params),
    )?;
    staged.insert_network_inference_bundle(topic_id, nonce, bundle.clone())?;
    let digest = bundle.digest()?;

    tracing::debug!(
        "Topic {} {}: {} inferer(s) and {} forecaster(s) selected",
        topic_id,
        nonce,
        inferences.len(),
        forecasts.len()
    );

    Ok(WorkerRoundReport {
        topic_id,
        nonce,
        bundle,
        digest,
        rejections: filtered.rejections,
        selected_inferers: inferer_selection.selected,
        selected_forecasters: forecaster_selection.selected,
        backfilled_inferers,
        backfilled_forecasters,
    })
}
