// crates/allora-epoch/tests/epoch_flow.rs
//
// End-to-end epochs against the in-memory ledger: worker round, reputer
// round, then a second worker round that uses the stored network loss and
// the updated regrets. Also checks that failing rounds commit nothing.

use allora_core::{
    ActorId, ActorKind, AlloraError, Decimal, Forecast, ForecastElement, Inference,
    InferenceForecastBundle, LedgerReader, LedgerWriter, Nonce, ReputerValueBundle, TopicParams,
    ValueBundle, WorkerAttributedValue, WorkerDataBundle,
};
use allora_epoch::{run_reputer_round, run_worker_round};
use allora_store::InMemoryLedger;
use rust_decimal_macros::dec;

const TOPIC: u64 = 1;

fn setup(params: TopicParams) -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new();
    ledger.create_topic(TOPIC, params).unwrap();
    for w in ["worker0", "worker1", "forecaster0"] {
        ledger.register_worker(TOPIC, ActorId::from(w)).unwrap();
    }
    for (r, stake) in [("reputer0", dec!(100)), ("reputer1", dec!(50))] {
        ledger.register_reputer(TOPIC, ActorId::from(r)).unwrap();
        ledger.set_stake(TOPIC, ActorId::from(r), stake).unwrap();
    }
    ledger
}

fn inference(worker: &str, block: u64, value: Decimal) -> WorkerDataBundle {
    WorkerDataBundle {
        worker: ActorId::from(worker),
        topic_id: TOPIC,
        nonce: Nonce::new(block),
        inference_forecasts_bundle: InferenceForecastBundle {
            inference: Some(Inference {
                topic_id: TOPIC,
                block_height: block,
                inferer: ActorId::from(worker),
                value,
            }),
            forecast: None,
        },
        signature: String::new(),
    }
}

fn forecast(worker: &str, block: u64, losses: &[(&str, Decimal)]) -> WorkerDataBundle {
    WorkerDataBundle {
        worker: ActorId::from(worker),
        topic_id: TOPIC,
        nonce: Nonce::new(block),
        inference_forecasts_bundle: InferenceForecastBundle {
            inference: None,
            forecast: Some(Forecast {
                topic_id: TOPIC,
                block_height: block,
                forecaster: ActorId::from(worker),
                forecast_elements: losses
                    .iter()
                    .map(|(i, v)| ForecastElement { inferer: ActorId::from(*i), value: *v })
                    .collect(),
            }),
        },
        signature: String::new(),
    }
}

fn attributed(pairs: &[(&str, Decimal)]) -> Vec<WorkerAttributedValue> {
    pairs
        .iter()
        .map(|(w, v)| WorkerAttributedValue { worker: ActorId::from(*w), value: *v })
        .collect()
}

fn loss_report(reputer: &str, block: u64, combined: Decimal, w0: Decimal, w1: Decimal) -> ReputerValueBundle {
    ReputerValueBundle {
        reputer: ActorId::from(reputer),
        value_bundle: ValueBundle {
            topic_id: TOPIC,
            block_height: block,
            combined_value: combined,
            naive_value: combined,
            inferer_values: attributed(&[("worker0", w0), ("worker1", w1)]),
            ..ValueBundle::default()
        },
        signature: String::new(),
    }
}

#[test]
fn test_two_epochs_feed_regrets_forward() {
    let mut ledger = setup(TopicParams::default());

    // Epoch 1: no prior loss, forecasts are ignored.
    let batch = vec![
        inference("worker0", 100, dec!(1)),
        inference("worker1", 100, dec!(2)),
        forecast("forecaster0", 100, &[("worker0", dec!(3)), ("worker1", dec!(4))]),
    ];
    let first = run_worker_round(&mut ledger, TOPIC, Nonce::new(100), &batch).unwrap();
    assert!(first.bundle.forecaster_values.is_empty());
    assert!((first.bundle.combined_value - dec!(1.5)).abs() < dec!(0.000000001));
    assert!(ledger
        .network_inference_bundle(TOPIC, Nonce::new(100))
        .unwrap()
        .is_some());

    // Reputers judge worker0 better than the network, worker1 worse.
    let reports = vec![
        loss_report("reputer0", 100, dec!(0.1), dec!(0.01), dec!(1)),
        loss_report("reputer1", 100, dec!(0.1), dec!(0.01), dec!(1)),
    ];
    let losses = run_reputer_round(&mut ledger, TOPIC, Nonce::new(100), &reports).unwrap();
    assert!((losses.bundle.combined_value - dec!(-1)).abs() < dec!(0.000000001));
    assert_eq!(losses.regrets_updated, 2);

    let w0 = ledger.get_inferer_regret(TOPIC, &ActorId::from("worker0")).unwrap().unwrap();
    let w1 = ledger.get_inferer_regret(TOPIC, &ActorId::from("worker1")).unwrap().unwrap();
    assert!(w0.value > Decimal::ZERO);
    assert!(w1.value < Decimal::ZERO);

    // Epoch 2: regrets now favour worker0, and the stored loss enables forecasts.
    let batch = vec![
        inference("worker0", 200, dec!(1)),
        inference("worker1", 200, dec!(2)),
        forecast("forecaster0", 200, &[("worker0", dec!(0.01)), ("worker1", dec!(1))]),
    ];
    let second = run_worker_round(&mut ledger, TOPIC, Nonce::new(200), &batch).unwrap();
    assert!(second.bundle.naive_value < dec!(1.5));
    assert_eq!(second.bundle.forecaster_values.len(), 1);
    assert_eq!(second.bundle.one_in_forecaster_values.len(), 1);
    assert_ne!(first.digest, second.digest);
}

#[test]
fn test_worker_round_backfills_outside_top_n() {
    let params = TopicParams {
        max_top_actors: 1,
        ..TopicParams::default()
    };
    let mut ledger = setup(params);
    let batch = vec![inference("worker0", 100, dec!(1)), inference("worker1", 100, dec!(2))];

    let report = run_worker_round(&mut ledger, TOPIC, Nonce::new(100), &batch).unwrap();

    // Both start at zero; the running minimum keeps the first id.
    assert_eq!(report.selected_inferers, vec![ActorId::from("worker0")]);
    assert_eq!(report.backfilled_inferers.len(), 1);
    assert_eq!(report.bundle.inferer_values.len(), 1);
    assert!(ledger
        .get_score(TOPIC, ActorKind::Inferer, &ActorId::from("worker1"))
        .unwrap()
        .is_some());
}

#[test]
fn test_failed_worker_round_commits_nothing() {
    let params = TopicParams {
        max_top_actors: 1,
        ..TopicParams::default()
    };
    let mut ledger = setup(params);
    // A stored log10 loss of 100 cannot be raised back to a raw loss.
    let poisoned = ValueBundle {
        topic_id: TOPIC,
        block_height: 50,
        combined_value: dec!(100),
        ..ValueBundle::default()
    };
    ledger
        .insert_network_loss_bundle(TOPIC, Nonce::new(50), poisoned)
        .unwrap();
    let before = ledger.clone();

    let batch = vec![inference("worker0", 100, dec!(1)), inference("worker1", 100, dec!(2))];
    let err = run_worker_round(&mut ledger, TOPIC, Nonce::new(100), &batch).unwrap_err();

    assert!(matches!(err, AlloraError::Math(_)));
    assert_eq!(ledger, before);
}

#[test]
fn test_failed_reputer_round_keeps_prior_regrets() {
    let params = TopicParams {
        max_top_actors: 1,
        ..TopicParams::default()
    };
    let mut ledger = setup(params);
    // reputer0 leads on score but its stake is below epsilon.
    ledger
        .set_stake(TOPIC, ActorId::from("reputer0"), dec!(0.00001))
        .unwrap();
    ledger
        .set_score(
            TOPIC,
            ActorKind::Reputer,
            allora_core::Score {
                topic_id: TOPIC,
                block_height: 1,
                address: ActorId::from("reputer0"),
                score: dec!(0.9),
            },
        )
        .unwrap();
    let before = ledger.clone();

    let reports = vec![
        loss_report("reputer0", 100, dec!(0.1), dec!(0.01), dec!(1)),
        loss_report("reputer1", 100, dec!(0.1), dec!(0.01), dec!(1)),
    ];
    let err = run_reputer_round(&mut ledger, TOPIC, Nonce::new(100), &reports).unwrap_err();

    assert!(matches!(err, AlloraError::DivideByZero(_)));
    assert_eq!(ledger, before);
}

#[test]
fn test_all_unregistered_round_fails() {
    let mut ledger = setup(TopicParams::default());
    let batch = vec![inference("stranger", 100, dec!(1))];
    let err = run_worker_round(&mut ledger, TOPIC, Nonce::new(100), &batch).unwrap_err();
    assert!(matches!(err, AlloraError::NoValidSubmissions { .. }));
}
