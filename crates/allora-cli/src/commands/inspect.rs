// crates/allora-cli/src/commands/inspect.rs
//
// Read-only views of a topic: `allora regrets`, `allora scores`,
// `allora bundle`.

use serde::Serialize;
use tabled::Tabled;

use allora_core::{ActorKind, Nonce, TopicId};
use allora_store::TopicState;

use super::round::value_rows;
use super::Context;
use crate::output::{emit, OutputFormat};

#[derive(Tabled, Serialize)]
struct RegretRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Actor")]
    actor: String,
    #[tabled(rename = "Inferer")]
    inferer: String,
    #[tabled(rename = "Regret")]
    regret: String,
    #[tabled(rename = "Block")]
    block_height: u64,
}

#[derive(Tabled, Serialize)]
struct ScoreRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Actor")]
    actor: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Block")]
    block_height: u64,
}

fn regret_rows(state: &TopicState) -> Vec<RegretRow> {
    let mut rows = Vec::new();
    for (actor, v) in &state.inferer_regrets {
        rows.push(RegretRow {
            kind: ActorKind::Inferer.to_string(),
            actor: actor.to_string(),
            inferer: "--".to_string(),
            regret: v.value.to_string(),
            block_height: v.block_height,
        });
    }
    for (actor, v) in &state.forecaster_regrets {
        rows.push(RegretRow {
            kind: ActorKind::Forecaster.to_string(),
            actor: actor.to_string(),
            inferer: "--".to_string(),
            regret: v.value.to_string(),
            block_height: v.block_height,
        });
    }
    for (forecaster, by_inferer) in &state.one_in_forecaster_regrets {
        for (inferer, v) in by_inferer {
            rows.push(RegretRow {
                kind: "one_in".to_string(),
                actor: forecaster.to_string(),
                inferer: inferer.to_string(),
                regret: v.value.to_string(),
                block_height: v.block_height,
            });
        }
    }
    rows
}

fn score_rows(state: &TopicState, kind: Option<ActorKind>) -> Vec<ScoreRow> {
    let kinds = match kind {
        Some(k) => vec![k],
        None => vec![ActorKind::Inferer, ActorKind::Forecaster, ActorKind::Reputer],
    };
    kinds
        .into_iter()
        .flat_map(|k| {
            state.scores(k).values().map(move |s| ScoreRow {
                kind: k.to_string(),
                actor: s.address.to_string(),
                score: s.score.to_string(),
                block_height: s.block_height,
            })
        })
        .collect()
}

/// Run `allora regrets`.
pub fn run_regrets(ctx: &Context, topic: TopicId) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = ctx.load_ledger()?;
    let rows = regret_rows(ledger.topic(topic)?);
    if rows.is_empty() && ctx.format == OutputFormat::Table {
        println!("No regrets recorded for topic {}", topic);
        return Ok(());
    }
    emit(ctx.format, &rows, &rows);
    Ok(())
}

/// Run `allora scores`, optionally restricted to one actor kind.
pub fn run_scores(ctx: &Context, topic: TopicId, kind: Option<ActorKind>) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = ctx.load_ledger()?;
    let rows = score_rows(ledger.topic(topic)?, kind);
    if rows.is_empty() && ctx.format == OutputFormat::Table {
        println!("No scores recorded for topic {}", topic);
        return Ok(());
    }
    emit(ctx.format, &rows, &rows);
    Ok(())
}

/// Run `allora bundle`: the network inference bundle stored at `block`, or
/// the network loss bundle when `losses` is set.
pub fn run_bundle(ctx: &Context, topic: TopicId, block: u64, losses: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = ctx.load_ledger()?;
    let nonce = Nonce::new(block);
    let bundle = if losses {
        ledger.network_loss_bundle(topic, nonce)?
    } else {
        ledger.network_inference_bundle(topic, nonce)?
    };
    let Some(bundle) = bundle else {
        return Err(format!(
            "No network {} bundle for topic {} at block {}",
            if losses { "loss" } else { "inference" },
            topic,
            block
        )
        .into());
    };
    emit(ctx.format, &value_rows(bundle), bundle);
    if ctx.format == OutputFormat::Table {
        println!("Digest: {}", bundle.digest()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use allora_core::{ActorId, Score, TimestampedValue, TopicParams};
    use std::collections::BTreeMap;

    fn state() -> TopicState {
        let mut state = TopicState::new(TopicParams::default());
        let tv = |v: &str| TimestampedValue {
            block_height: 7,
            value: v.parse().unwrap(),
        };
        state.inferer_regrets.insert(ActorId::from("worker0"), tv("0.2"));
        state.forecaster_regrets.insert(ActorId::from("forecaster0"), tv("-0.1"));
        let mut one_in = BTreeMap::new();
        one_in.insert(ActorId::from("worker0"), tv("0.05"));
        state.one_in_forecaster_regrets.insert(ActorId::from("forecaster0"), one_in);
        state.reputer_scores.insert(
            ActorId::from("reputer0"),
            Score {
                topic_id: 1,
                block_height: 7,
                address: ActorId::from("reputer0"),
                score: "0.5".parse().unwrap(),
            },
        );
        state
    }

    #[test]
    fn test_regret_rows_cover_every_book() {
        let rows = regret_rows(&state());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].kind, "inferer");
        assert_eq!(rows[2].kind, "one_in");
        assert_eq!(rows[2].inferer, "worker0");
        assert_eq!(rows[1].regret, "-0.1");
    }

    #[test]
    fn test_score_rows_filter_by_kind() {
        let state = state();
        assert_eq!(score_rows(&state, None).len(), 1);
        assert!(score_rows(&state, Some(ActorKind::Inferer)).is_empty());
        assert_eq!(score_rows(&state, Some(ActorKind::Reputer))[0].actor, "reputer0");
    }
}
