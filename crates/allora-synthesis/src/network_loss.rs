// crates/allora-synthesis/src/network_loss.rs
//
// Stake-weighted aggregation of reputer loss reports.
//
// Every field of the output bundle (combined, naive, and each per-actor
// entry of every attribution list) is an independent running weighted
// average of log10 losses, weighted by the reporting reputer's stake.
// A report that omits an actor does not move that actor's average.

use std::collections::BTreeMap;

use allora_core::math::{log10, RunningWeightedAverage};
use allora_core::{
    ActorId, AlloraError, BlockHeight, Decimal, ReputerValueBundle, TopicId, ValueBundle,
    WithheldWorkerAttributedValue, WorkerAttributedValue,
};

/// Running averages for every field of a loss bundle.
#[derive(Debug, Default)]
struct LossAccumulator {
    combined: RunningWeightedAverage,
    naive: RunningWeightedAverage,
    inferer: BTreeMap<ActorId, RunningWeightedAverage>,
    forecaster: BTreeMap<ActorId, RunningWeightedAverage>,
    one_out_inferer: BTreeMap<ActorId, RunningWeightedAverage>,
    one_out_forecaster: BTreeMap<ActorId, RunningWeightedAverage>,
    one_in_forecaster: BTreeMap<ActorId, RunningWeightedAverage>,
}

fn fold(
    field: &mut BTreeMap<ActorId, RunningWeightedAverage>,
    worker: &ActorId,
    stake: Decimal,
    loss: Decimal,
    context: &str,
) -> Result<(), AlloraError> {
    field
        .entry(worker.clone())
        .or_default()
        .update(stake, log10(loss, context)?)
}

impl LossAccumulator {
    fn add_report(&mut self, stake: Decimal, report: &ReputerValueBundle) -> Result<(), AlloraError> {
        let bundle = &report.value_bundle;
        let context = format!("report of {}", report.reputer);

        self.combined
            .update(stake, log10(bundle.combined_value, &context)?)?;
        self.naive.update(stake, log10(bundle.naive_value, &context)?)?;

        for v in &bundle.inferer_values {
            fold(&mut self.inferer, &v.worker, stake, v.value, &context)?;
        }
        for v in &bundle.forecaster_values {
            fold(&mut self.forecaster, &v.worker, stake, v.value, &context)?;
        }
        for v in &bundle.one_out_inferer_values {
            fold(&mut self.one_out_inferer, &v.worker, stake, v.value, &context)?;
        }
        for v in &bundle.one_out_forecaster_values {
            fold(&mut self.one_out_forecaster, &v.worker, stake, v.value, &context)?;
        }
        for v in &bundle.one_in_forecaster_values {
            fold(&mut self.one_in_forecaster, &v.worker, stake, v.value, &context)?;
        }
        Ok(())
    }
}

fn settle(field: &str, acc: &RunningWeightedAverage, epsilon: Decimal) -> Result<Decimal, AlloraError> {
    if acc.sum_weights <= epsilon {
        return Err(AlloraError::DivideByZero(format!(
            "{} has total reputer weight {}",
            field, acc.sum_weights
        )));
    }
    Ok(acc.average)
}

fn settle_attributed(
    label: &str,
    field: &BTreeMap<ActorId, RunningWeightedAverage>,
    epsilon: Decimal,
) -> Result<Vec<WorkerAttributedValue>, AlloraError> {
    field
        .iter()
        .map(|(worker, acc)| -> Result<WorkerAttributedValue, AlloraError> {
            Ok(WorkerAttributedValue {
                worker: worker.clone(),
                value: settle(&format!("{} loss of {}", label, worker), acc, epsilon)?,
            })
        })
        .collect()
}

fn settle_withheld(
    label: &str,
    field: &BTreeMap<ActorId, RunningWeightedAverage>,
    epsilon: Decimal,
) -> Result<Vec<WithheldWorkerAttributedValue>, AlloraError> {
    field
        .iter()
        .map(|(worker, acc)| -> Result<WithheldWorkerAttributedValue, AlloraError> {
            Ok(WithheldWorkerAttributedValue {
                worker: worker.clone(),
                value: settle(&format!("{} loss of {}", label, worker), acc, epsilon)?,
            })
        })
        .collect()
}

/// Combine reputers' loss reports into the network loss bundle.
///
/// Reports are folded in reputer-id order; a reputer missing from `stakes`
/// weighs nothing. Output values are log10 losses. Any field whose
/// accumulated stake does not exceed `epsilon` fails with `DivideByZero`,
/// including the combined loss when `bundles` is empty.
pub fn aggregate_network_losses(
    stakes: &BTreeMap<ActorId, Decimal>,
    bundles: &[ReputerValueBundle],
    topic_id: TopicId,
    block_height: BlockHeight,
    epsilon: Decimal,
) -> Result<ValueBundle, AlloraError> {
    let mut ordered: Vec<&ReputerValueBundle> = bundles.iter().collect();
    ordered.sort_by(|a, b| a.reputer.cmp(&b.reputer));

    let mut acc = LossAccumulator::default();
    for report in ordered {
        let stake = stakes.get(&report.reputer).copied().unwrap_or(Decimal::ZERO);
        acc.add_report(stake, report)?;
    }

    let bundle = ValueBundle {
        topic_id,
        block_height,
        combined_value: settle("combined loss", &acc.combined, epsilon)?,
        naive_value: settle("naive loss", &acc.naive, epsilon)?,
        inferer_values: settle_attributed("inferer", &acc.inferer, epsilon)?,
        forecaster_values: settle_attributed("forecaster", &acc.forecaster, epsilon)?,
        one_out_inferer_values: settle_withheld("one-out inferer", &acc.one_out_inferer, epsilon)?,
        one_out_forecaster_values: settle_withheld(
            "one-out forecaster",
            &acc.one_out_forecaster,
            epsilon,
        )?,
        one_in_forecaster_values: settle_attributed(
            "one-in forecaster",
            &acc.one_in_forecaster,
            epsilon,
        )?,
    };

    tracing::debug!(
        "Aggregated {} loss report(s) for topic {} at block {}: combined log10 loss {}",
        bundles.len(),
        topic_id,
        block_height,
        bundle.combined_value
    );
    Ok(bundle)
}
