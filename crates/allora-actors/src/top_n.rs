// crates/allora-actors/src/top_n.rs
//
// Top-N selection by score.
//
// Input maps are walked in actor-id order, so both strategies are
// reproducible across nodes for the same scores and seed.

use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use allora_core::{ActorId, Decimal, TopNStrategy};

/// Result of a top-N selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopNSelection {
    /// Selected actors, highest score first, ties by actor id.
    pub selected: Vec<ActorId>,
    pub selected_set: BTreeSet<ActorId>,
    /// Every actor observed, highest score first, ties by actor id.
    pub all_sorted: Vec<ActorId>,
}

impl TopNSelection {
    /// Observed actors that were not selected, in `all_sorted` order.
    pub fn not_selected(&self) -> impl Iterator<Item = &ActorId> {
        self.all_sorted
            .iter()
            .filter(move |a| !self.selected_set.contains(*a))
    }
}

fn sort_by_score_desc(actors: &mut [ActorId], scores: &BTreeMap<ActorId, Decimal>) {
    actors.sort_by(|a, b| {
        let sa = scores.get(a).copied().unwrap_or(Decimal::ZERO);
        let sb = scores.get(b).copied().unwrap_or(Decimal::ZERO);
        sb.cmp(&sa).then_with(|| a.cmp(b))
    });
}

/// Select up to `n` actors with the highest scores.
///
/// # Arguments
/// * `n` - Maximum number of actors to select; zero selects nobody.
/// * `scores` - Actor -> current score.
/// * `strategy` - How ties at the selection boundary are resolved.
/// * `seed` - RNG seed for `RandomTiebreakHeap` (the block height).
pub fn select_top_n(
    n: usize,
    scores: &BTreeMap<ActorId, Decimal>,
    strategy: TopNStrategy,
    seed: u64,
) -> TopNSelection {
    let mut selected = match strategy {
        TopNStrategy::RunningMinimum => running_minimum(n, scores),
        TopNStrategy::RandomTiebreakHeap => random_tiebreak_heap(n, scores, seed),
    };
    sort_by_score_desc(&mut selected, scores);

    let mut all_sorted: Vec<ActorId> = scores.keys().cloned().collect();
    sort_by_score_desc(&mut all_sorted, scores);

    TopNSelection {
        selected_set: selected.iter().cloned().collect(),
        selected,
        all_sorted,
    }
}

/// Linear pass keeping a working set of at most `n` and its lowest member.
///
/// A newcomer replaces the lowest member only if it scores strictly
/// higher. Among members tied for lowest, the one with the greatest actor
/// id is evicted.
fn running_minimum(n: usize, scores: &BTreeMap<ActorId, Decimal>) -> Vec<ActorId> {
    if n == 0 {
        return Vec::new();
    }
    let mut working: Vec<(ActorId, Decimal)> = Vec::with_capacity(n.min(scores.len()));
    let mut lowest: Option<usize> = None;

    for (actor, score) in scores {
        if working.len() < n {
            working.push((actor.clone(), *score));
            if working.len() == n {
                lowest = lowest_index(&working);
            }
            continue;
        }
        if let Some(idx) = lowest {
            if *score > working[idx].1 {
                working[idx] = (actor.clone(), *score);
                lowest = lowest_index(&working);
            }
        }
    }
    working.into_iter().map(|(actor, _)| actor).collect()
}

fn lowest_index(working: &[(ActorId, Decimal)]) -> Option<usize> {
    working
        .iter()
        .enumerate()
        .min_by(|(_, (ida, sa)), (_, (idb, sb))| sa.cmp(sb).then_with(|| idb.cmp(ida)))
        .map(|(i, _)| i)
}

/// Binary heap keyed by (score, random tiebreak); tiebreaks are drawn in
/// actor-id order from an RNG seeded with `seed`.
fn random_tiebreak_heap(n: usize, scores: &BTreeMap<ActorId, Decimal>, seed: u64) -> Vec<ActorId> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut heap: BinaryHeap<(Decimal, u64, ActorId)> = scores
        .iter()
        .map(|(actor, score)| (*score, rng.gen::<u64>(), actor.clone()))
        .collect();

    let mut out = Vec::with_capacity(n.min(heap.len()));
    while out.len() < n {
        match heap.pop() {
            Some((_, _, actor)) => out.push(actor),
            None => break,
        }
    }
    out
}
