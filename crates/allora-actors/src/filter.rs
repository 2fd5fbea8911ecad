// crates/allora-actors/src/filter.rs
//
// Worker submission filtering.
//
// Checks every raw bundle independently and records why a bundle was
// dropped instead of failing the batch. Only a batch with no surviving
// inference fails.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use allora_core::{
    ActorId, AlloraError, Decimal, Forecast, Inference, LedgerReader, Nonce, TopicId,
    WorkerDataBundle,
};

/// Why a submission was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    InvalidBundle(String),
    NonceMismatch { topic_id: TopicId, block_height: u64 },
    NotRegistered,
    Duplicate,
    EmptyForecast,
    NoStake,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::InvalidBundle(why) => write!(f, "invalid bundle: {}", why),
            RejectionReason::NonceMismatch { topic_id, block_height } => {
                write!(f, "nonce mismatch: topic {} block {}", topic_id, block_height)
            }
            RejectionReason::NotRegistered => write!(f, "not registered"),
            RejectionReason::Duplicate => write!(f, "duplicate submission"),
            RejectionReason::EmptyForecast => write!(f, "forecast has no accepted inferer"),
            RejectionReason::NoStake => write!(f, "no stake"),
        }
    }
}

/// A dropped submission and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub actor: ActorId,
    pub reason: RejectionReason,
}

/// Accepted worker data for one epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredSubmissions {
    pub inferences: BTreeMap<ActorId, Inference>,
    /// Forecasts with elements restricted to accepted inferers.
    pub forecasts: BTreeMap<ActorId, Forecast>,
    pub rejections: Vec<Rejection>,
}

pub(crate) fn check_positive(value: Decimal, what: &str) -> Result<(), RejectionReason> {
    if value <= Decimal::ZERO {
        return Err(RejectionReason::InvalidBundle(format!(
            "{} must be positive, got {}",
            what, value
        )));
    }
    Ok(())
}

fn validate_structure(bundle: &WorkerDataBundle) -> Result<(), RejectionReason> {
    let invalid = |why: String| Err(RejectionReason::InvalidBundle(why));

    if bundle.worker.is_empty() {
        return invalid("empty worker id".to_string());
    }
    let inner = &bundle.inference_forecasts_bundle;
    if inner.inference.is_none() && inner.forecast.is_none() {
        return invalid("carries neither inference nor forecast".to_string());
    }

    if let Some(inference) = &inner.inference {
        if inference.inferer != bundle.worker {
            return invalid(format!("inference names inferer {}", inference.inferer));
        }
        if inference.topic_id != bundle.topic_id
            || inference.block_height != bundle.nonce.block_height
        {
            return invalid("inference topic/block differs from envelope".to_string());
        }
    }

    if let Some(forecast) = &inner.forecast {
        if forecast.forecaster != bundle.worker {
            return invalid(format!("forecast names forecaster {}", forecast.forecaster));
        }
        if forecast.topic_id != bundle.topic_id
            || forecast.block_height != bundle.nonce.block_height
        {
            return invalid("forecast topic/block differs from envelope".to_string());
        }
        if forecast.forecast_elements.is_empty() {
            return invalid("forecast has no elements".to_string());
        }
        for element in &forecast.forecast_elements {
            if element.inferer.is_empty() {
                return invalid("forecast element with empty inferer".to_string());
            }
            check_positive(element.value, "predicted loss")?;
        }
    }
    Ok(())
}

/// Filter one epoch's worker submissions.
///
/// Per bundle, in order: structure, nonce, registration, then duplicates
/// (the first valid bundle of an actor wins). Forecasts are then
/// restricted to the accepted inferers; one with nothing left is dropped.
/// Fails with `NoValidSubmissions` if no inference survives.
pub fn filter_worker_submissions<L>(
    ledger: &L,
    topic_id: TopicId,
    nonce: Nonce,
    submissions: &[WorkerDataBundle],
) -> Result<FilteredSubmissions, AlloraError>
where
    L: LedgerReader + ?Sized,
{
    let mut out = FilteredSubmissions::default();
    let mut seen = BTreeSet::new();
    let mut pending_forecasts = Vec::new();

    for bundle in submissions {
        let verdict = check_submission(ledger, topic_id, nonce, bundle, &seen)?;
        if let Err(reason) = verdict {
            tracing::debug!("Rejected submission from {}: {}", bundle.worker, reason);
            out.rejections.push(Rejection {
                actor: bundle.worker.clone(),
                reason,
            });
            continue;
        }

        seen.insert(bundle.worker.clone());
        let inner = &bundle.inference_forecasts_bundle;
        if let Some(inference) = &inner.inference {
            out.inferences.insert(bundle.worker.clone(), inference.clone());
        }
        if let Some(forecast) = &inner.forecast {
            pending_forecasts.push(forecast);
        }
    }

    let accepted: BTreeSet<ActorId> = out.inferences.keys().cloned().collect();
    for forecast in pending_forecasts {
        match forecast.restricted_to(&accepted) {
            Some(restricted) => {
                out.forecasts.insert(forecast.forecaster.clone(), restricted);
            }
            None => {
                tracing::debug!("Dropped forecast of {}: no accepted inferer", forecast.forecaster);
                out.rejections.push(Rejection {
                    actor: forecast.forecaster.clone(),
                    reason: RejectionReason::EmptyForecast,
                });
            }
        }
    }

    if out.inferences.is_empty() {
        return Err(AlloraError::NoValidSubmissions {
            topic_id,
            block_height: nonce.block_height,
        });
    }
    Ok(out)
}

/// Outer error is a ledger failure; inner error is a rejection.
fn check_submission<L>(
    ledger: &L,
    topic_id: TopicId,
    nonce: Nonce,
    bundle: &WorkerDataBundle,
    seen: &BTreeSet<ActorId>,
) -> Result<Result<(), RejectionReason>, AlloraError>
where
    L: LedgerReader + ?Sized,
{
    if let Err(reason) = validate_structure(bundle) {
        return Ok(Err(reason));
    }
    if bundle.topic_id != topic_id || bundle.nonce != nonce {
        return Ok(Err(RejectionReason::NonceMismatch {
            topic_id: bundle.topic_id,
            block_height: bundle.nonce.block_height,
        }));
    }
    if !ledger.is_worker_registered(topic_id, &bundle.worker)? {
        return Ok(Err(RejectionReason::NotRegistered));
    }
    if seen.contains(&bundle.worker) {
        return Ok(Err(RejectionReason::Duplicate));
    }
    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use allora_core::{ForecastElement, InferenceForecastBundle, TopicParams};
    use allora_store::InMemoryLedger;
    use rust_decimal_macros::dec;

    fn ledger() -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        ledger.create_topic(1, TopicParams::default()).unwrap();
        for w in ["worker0", "worker1", "forecaster0"] {
            ledger.register_worker(1, ActorId::from(w)).unwrap();
        }
        ledger
    }

    fn inference_bundle(worker: &str, value: Decimal) -> WorkerDataBundle {
        WorkerDataBundle {
            worker: ActorId::from(worker),
            topic_id: 1,
            nonce: Nonce::new(100),
            inference_forecasts_bundle: InferenceForecastBundle {
                inference: Some(Inference {
                    topic_id: 1,
                    block_height: 100,
                    inferer: ActorId::from(worker),
                    value,
                }),
                forecast: None,
            },
            signature: String::new(),
        }
    }

    fn forecast_bundle(worker: &str, elements: &[(&str, Decimal)]) -> WorkerDataBundle {
        WorkerDataBundle {
            worker: ActorId::from(worker),
            topic_id: 1,
            nonce: Nonce::new(100),
            inference_forecasts_bundle: InferenceForecastBundle {
                inference: None,
                forecast: Some(Forecast {
                    topic_id: 1,
                    block_height: 100,
                    forecaster: ActorId::from(worker),
                    forecast_elements: elements
                        .iter()
                        .map(|(i, v)| ForecastElement { inferer: ActorId::from(*i), value: *v })
                        .collect(),
                }),
            },
            signature: String::new(),
        }
    }

    fn reasons(filtered: &FilteredSubmissions) -> Vec<(&str, &RejectionReason)> {
        filtered
            .rejections
            .iter()
            .map(|r| (r.actor.as_str(), &r.reason))
            .collect()
    }

    #[test]
    fn test_accepts_clean_batch() {
        let batch = vec![
            inference_bundle("worker0", dec!(1)),
            inference_bundle("worker1", dec!(2)),
            forecast_bundle("forecaster0", &[("worker0", dec!(3)), ("worker1", dec!(4))]),
        ];
        let filtered = filter_worker_submissions(&ledger(), 1, Nonce::new(100), &batch).unwrap();
        assert_eq!(filtered.inferences.len(), 2);
        assert_eq!(filtered.forecasts.len(), 1);
        assert!(filtered.rejections.is_empty());
    }

    #[test]
    fn test_all_unregistered_is_no_valid_submissions() {
        let batch = vec![inference_bundle("stranger0", dec!(1)), inference_bundle("stranger1", dec!(2))];
        let err = filter_worker_submissions(&ledger(), 1, Nonce::new(100), &batch).unwrap_err();
        assert!(matches!(err, AlloraError::NoValidSubmissions { topic_id: 1, block_height: 100 }));
    }

    #[test]
    fn test_first_valid_submission_wins() {
        let mut wrong_nonce = inference_bundle("worker0", dec!(9));
        wrong_nonce.nonce = Nonce::new(99);
        let batch = vec![
            wrong_nonce,
            inference_bundle("worker0", dec!(1)),
            inference_bundle("worker0", dec!(2)),
        ];
        let filtered = filter_worker_submissions(&ledger(), 1, Nonce::new(100), &batch).unwrap();
        assert_eq!(filtered.inferences[&ActorId::from("worker0")].value, dec!(1));
        assert_eq!(
            reasons(&filtered),
            vec![
                ("worker0", &RejectionReason::NonceMismatch { topic_id: 1, block_height: 99 }),
                ("worker0", &RejectionReason::Duplicate),
            ]
        );
    }

    #[test]
    fn test_forecast_elements_restricted_to_accepted_inferers() {
        let batch = vec![
            inference_bundle("worker0", dec!(1)),
            forecast_bundle("forecaster0", &[("worker0", dec!(3)), ("worker9", dec!(4))]),
        ];
        let filtered = filter_worker_submissions(&ledger(), 1, Nonce::new(100), &batch).unwrap();
        let forecast = &filtered.forecasts[&ActorId::from("forecaster0")];
        assert_eq!(forecast.forecast_elements.len(), 1);
        assert_eq!(forecast.forecast_elements[0].inferer, ActorId::from("worker0"));
    }

    #[test]
    fn test_forecast_without_accepted_inferer_dropped() {
        let batch = vec![
            inference_bundle("worker0", dec!(1)),
            forecast_bundle("forecaster0", &[("worker9", dec!(4))]),
        ];
        let filtered = filter_worker_submissions(&ledger(), 1, Nonce::new(100), &batch).unwrap();
        assert!(filtered.forecasts.is_empty());
        assert_eq!(reasons(&filtered), vec![("forecaster0", &RejectionReason::EmptyForecast)]);
    }

    #[test]
    fn test_malformed_bundles_rejected() {
        let mut impostor = inference_bundle("worker1", dec!(1));
        impostor.worker = ActorId::from("worker0");
        let batch = vec![
            impostor,
            forecast_bundle("forecaster0", &[("worker1", dec!(-1))]),
            inference_bundle("worker1", dec!(2)),
        ];
        let filtered = filter_worker_submissions(&ledger(), 1, Nonce::new(100), &batch).unwrap();
        assert_eq!(filtered.inferences.len(), 1);
        assert_eq!(filtered.rejections.len(), 2);
        assert!(filtered
            .rejections
            .iter()
            .all(|r| matches!(r.reason, RejectionReason::InvalidBundle(_))));
    }
}
