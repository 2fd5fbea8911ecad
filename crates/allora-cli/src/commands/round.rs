// crates/allora-cli/src/commands/round.rs
//
// `allora infer` and `allora report-losses`: run one epoch round from a
// JSON file of submissions and commit it to the ledger snapshot.

use serde::Serialize;
use tabled::Tabled;

use allora_actors::Rejection;
use allora_core::{Nonce, ReputerValueBundle, TopicId, ValueBundle, WorkerDataBundle};
use allora_epoch::{run_reputer_round, run_worker_round};

use super::{read_json, Context};
use crate::output::{emit, format_table, OutputFormat};

#[derive(Tabled, Serialize)]
pub(crate) struct ValueRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
struct RejectionRow {
    #[tabled(rename = "Actor")]
    actor: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

pub(crate) fn value_rows(bundle: &ValueBundle) -> Vec<ValueRow> {
    bundle
        .labelled_values()
        .into_iter()
        .map(|(field, value)| ValueRow {
            field,
            value: value.to_string(),
        })
        .collect()
}

fn print_rejections(rejections: &[Rejection]) {
    if rejections.is_empty() {
        return;
    }
    let rows: Vec<RejectionRow> = rejections
        .iter()
        .map(|r| RejectionRow {
            actor: r.actor.to_string(),
            reason: r.reason.to_string(),
        })
        .collect();
    println!();
    println!("Rejected submissions:");
    println!("{}", format_table(&rows));
}

/// Run `allora infer`: the worker round for `topic` at `block`.
pub fn run_infer(
    ctx: &Context,
    topic: TopicId,
    block: u64,
    submissions: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = ctx.load_ledger()?;
    let bundles: Vec<WorkerDataBundle> = read_json(submissions)?;
    tracing::info!("Read {} worker submission(s) from {}", bundles.len(), submissions);

    let report = run_worker_round(&mut ledger, topic, Nonce::new(block), &bundles)?;
    ctx.save_ledger(&ledger)?;

    emit(ctx.format, &value_rows(&report.bundle), &report);
    if ctx.format == OutputFormat::Table {
        println!("Digest: {}", report.digest);
        println!(
            "Selected: {} inferer(s), {} forecaster(s); backfilled {} score(s)",
            report.selected_inferers.len(),
            report.selected_forecasters.len(),
            report.backfilled_inferers.len() + report.backfilled_forecasters.len()
        );
        print_rejections(&report.rejections);
    }
    Ok(())
}

/// Run `allora report-losses`: the reputer round for `topic` at `block`.
pub fn run_report_losses(
    ctx: &Context,
    topic: TopicId,
    block: u64,
    reports: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = ctx.load_ledger()?;
    let bundles: Vec<ReputerValueBundle> = read_json(reports)?;
    tracing::info!("Read {} reputer report(s) from {}", bundles.len(), reports);

    let report = run_reputer_round(&mut ledger, topic, Nonce::new(block), &bundles)?;
    ctx.save_ledger(&ledger)?;

    emit(ctx.format, &value_rows(&report.bundle), &report);
    if ctx.format == OutputFormat::Table {
        println!("Digest: {}", report.digest);
        println!(
            "Selected {} reputer(s); updated {} regret(s)",
            report.selected_reputers.len(),
            report.regrets_updated
        );
        print_rejections(&report.rejections);
    }
    Ok(())
}
