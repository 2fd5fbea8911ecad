// crates/allora-actors/src/reputer_filter.rs
//
// Reputer report filtering. Same shape as the worker filter, plus a stake
// check: a reputer with nothing staked has no say in the network loss.

use std::collections::{BTreeMap, BTreeSet};

use allora_core::{
    ActorId, AlloraError, Decimal, LedgerReader, Nonce, ReputerValueBundle, TopicId, ValueBundle,
};

use crate::filter::{check_positive, Rejection, RejectionReason};

/// Accepted reputer reports for one epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredReports {
    /// Accepted reports in reputer-id order.
    pub reports: Vec<ReputerValueBundle>,
    /// Stake of every accepted reputer.
    pub stakes: BTreeMap<ActorId, Decimal>,
    pub rejections: Vec<Rejection>,
}

fn validate_losses(bundle: &ValueBundle) -> Result<(), RejectionReason> {
    check_positive(bundle.combined_value, "combined loss")?;
    check_positive(bundle.naive_value, "naive loss")?;
    let attributed = bundle
        .inferer_values
        .iter()
        .chain(&bundle.forecaster_values)
        .chain(&bundle.one_in_forecaster_values)
        .map(|v| (&v.worker, v.value));
    let withheld = bundle
        .one_out_inferer_values
        .iter()
        .chain(&bundle.one_out_forecaster_values)
        .map(|v| (&v.worker, v.value));
    for (worker, value) in attributed.chain(withheld) {
        if worker.is_empty() {
            return Err(RejectionReason::InvalidBundle(
                "loss attributed to empty worker id".to_string(),
            ));
        }
        check_positive(value, &format!("loss of {}", worker))?;
    }
    Ok(())
}

/// Filter one epoch's reputer reports.
///
/// Per report, in order: structure (non-empty reputer, strictly positive
/// losses), nonce, registration, stake, then duplicates (first valid
/// report of a reputer wins). Fails with `NoValidSubmissions` if nothing
/// survives.
pub fn filter_reputer_reports<L>(
    ledger: &L,
    topic_id: TopicId,
    nonce: Nonce,
    reports: &[ReputerValueBundle],
) -> Result<FilteredReports, AlloraError>
where
    L: LedgerReader + ?Sized,
{
    let mut out = FilteredReports::default();
    let mut accepted: BTreeMap<ActorId, ReputerValueBundle> = BTreeMap::new();
    let mut seen = BTreeSet::new();

    for report in reports {
        let reputer = &report.reputer;
        let verdict = if reputer.is_empty() {
            Err(RejectionReason::InvalidBundle("empty reputer id".to_string()))
        } else if let Err(reason) = validate_losses(&report.value_bundle) {
            Err(reason)
        } else if report.value_bundle.topic_id != topic_id
            || report.value_bundle.block_height != nonce.block_height
        {
            Err(RejectionReason::NonceMismatch {
                topic_id: report.value_bundle.topic_id,
                block_height: report.value_bundle.block_height,
            })
        } else if !ledger.is_reputer_registered(topic_id, reputer)? {
            Err(RejectionReason::NotRegistered)
        } else if seen.contains(reputer) {
            Err(RejectionReason::Duplicate)
        } else {
            Ok(())
        };

        if let Err(reason) = verdict {
            tracing::debug!("Rejected loss report from {}: {}", reputer, reason);
            out.rejections.push(Rejection {
                actor: reputer.clone(),
                reason,
            });
            continue;
        }

        let stake = ledger.get_stake(topic_id, reputer)?;
        if stake <= Decimal::ZERO {
            tracing::debug!("Rejected loss report from {}: no stake", reputer);
            out.rejections.push(Rejection {
                actor: reputer.clone(),
                reason: RejectionReason::NoStake,
            });
            continue;
        }

        seen.insert(reputer.clone());
        out.stakes.insert(reputer.clone(), stake);
        accepted.insert(reputer.clone(), report.clone());
    }

    if accepted.is_empty() {
        return Err(AlloraError::NoValidSubmissions {
            topic_id,
            block_height: nonce.block_height,
        });
    }
    out.reports = accepted.into_values().collect();
    Ok(out)
}
