// crates/allora-synthesis/src/weighted.rs
//
// Regret-weighted combination of inferences.
//
// Each participant's regret is normalized by the largest regret magnitude
// in the round and pushed through the potential gradient to get its weight;
// the network value is the weighted mean of all participants' values.

use std::collections::BTreeMap;

use allora_core::math::{self, gradient, weighted_mean};
use allora_core::{ActorId, AlloraError, Decimal, LedgerReader, TopicId, TopicParams};

/// The two parameters every weighted combination needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weighting {
    pub epsilon: Decimal,
    pub p_norm: Decimal,
}

impl From<&TopicParams> for Weighting {
    fn from(params: &TopicParams) -> Self {
        Self {
            epsilon: params.epsilon,
            p_norm: params.p_norm,
        }
    }
}

/// Regret lookup used to weight participants. Missing regret reads as zero.
pub trait RegretSource {
    fn inferer_regret(&self, inferer: &ActorId) -> Decimal;
    fn forecaster_regret(&self, forecaster: &ActorId) -> Decimal;
}

/// Every regret a round can ask for, read from the ledger once up front so
/// the combination and all its variants are pure functions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegretSnapshot {
    pub inferer: BTreeMap<ActorId, Decimal>,
    pub forecaster: BTreeMap<ActorId, Decimal>,
    /// (forecaster, compared actor) -> one-in regret.
    pub one_in: BTreeMap<(ActorId, ActorId), Decimal>,
}

impl RegretSnapshot {
    /// Read the inferer, forecaster and one-in regrets of the given actors.
    pub fn load<'a, L, I, F>(ledger: &L, topic_id: TopicId, inferers: I, forecasters: F) -> Result<Self, AlloraError>
    where
        L: LedgerReader + ?Sized,
        I: IntoIterator<Item = &'a ActorId>,
        F: IntoIterator<Item = &'a ActorId>,
    {
        let inferers: Vec<&ActorId> = inferers.into_iter().collect();
        let mut snapshot = RegretSnapshot::default();
        for inferer in &inferers {
            if let Some(regret) = ledger.get_inferer_regret(topic_id, inferer)? {
                snapshot.inferer.insert((*inferer).clone(), regret.value);
            }
        }
        for forecaster in forecasters {
            if let Some(regret) = ledger.get_forecaster_regret(topic_id, forecaster)? {
                snapshot.forecaster.insert(forecaster.clone(), regret.value);
            }
            for other in inferers.iter().copied().chain(std::iter::once(forecaster)) {
                if let Some(regret) = ledger.get_one_in_forecaster_regret(topic_id, forecaster, other)? {
                    snapshot
                        .one_in
                        .insert((forecaster.clone(), other.clone()), regret.value);
                }
            }
        }
        Ok(snapshot)
    }

    pub fn one_in_regret(&self, forecaster: &ActorId, other: &ActorId) -> Decimal {
        self.one_in
            .get(&(forecaster.clone(), other.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl RegretSource for RegretSnapshot {
    fn inferer_regret(&self, inferer: &ActorId) -> Decimal {
        self.inferer.get(inferer).copied().unwrap_or(Decimal::ZERO)
    }

    fn forecaster_regret(&self, forecaster: &ActorId) -> Decimal {
        self.forecaster
            .get(forecaster)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Regrets as seen by the one-in combination of a single forecaster:
/// inferers are weighted by that forecaster's one-in regret against them,
/// and the forecaster by its one-in regret against itself.
#[derive(Debug, Clone, Copy)]
pub struct OneInView<'a> {
    pub snapshot: &'a RegretSnapshot,
    pub forecaster: &'a ActorId,
}

impl RegretSource for OneInView<'_> {
    fn inferer_regret(&self, inferer: &ActorId) -> Decimal {
        self.snapshot.one_in_regret(self.forecaster, inferer)
    }

    fn forecaster_regret(&self, _forecaster: &ActorId) -> Decimal {
        self.snapshot.one_in_regret(self.forecaster, self.forecaster)
    }
}

/// Normalizer for a combination: the magnitude of the largest participant
/// regret, floored at epsilon.
pub fn max_regret<R>(
    regrets: &R,
    inferences: &BTreeMap<ActorId, Decimal>,
    forecast_implied: &BTreeMap<ActorId, Decimal>,
    epsilon: Decimal,
) -> Decimal
where
    R: RegretSource + ?Sized,
{
    let largest = inferences
        .keys()
        .map(|a| regrets.inferer_regret(a))
        .chain(forecast_implied.keys().map(|a| regrets.forecaster_regret(a)))
        .max();
    match largest {
        Some(r) => r.abs().max(epsilon),
        None => epsilon,
    }
}

/// Weighted mean of every inferer's value and every forecast-implied value.
///
/// # Arguments
/// * `inferences` - Inferer -> inference value.
/// * `forecast_implied` - Forecaster -> forecast-implied inference value.
/// * `regrets` - Regret lookup for both kinds.
/// * `max_regret` - Regret normalizer; must not be below epsilon.
/// * `weighting` - Epsilon and the gradient exponent.
pub fn combined_inference<R>(
    inferences: &BTreeMap<ActorId, Decimal>,
    forecast_implied: &BTreeMap<ActorId, Decimal>,
    regrets: &R,
    max_regret: Decimal,
    weighting: Weighting,
) -> Result<Decimal, AlloraError>
where
    R: RegretSource + ?Sized,
{
    if max_regret < weighting.epsilon {
        return Err(AlloraError::MaxRegretBelowEpsilon {
            max_regret,
            epsilon: weighting.epsilon,
        });
    }

    let mut entries = Vec::with_capacity(inferences.len() + forecast_implied.len());
    for (inferer, value) in inferences {
        let normalized = math::div(regrets.inferer_regret(inferer), max_regret)?;
        entries.push((gradient(weighting.p_norm, normalized)?, *value));
    }
    for (forecaster, value) in forecast_implied {
        let normalized = math::div(regrets.forecaster_regret(forecaster), max_regret)?;
        entries.push((gradient(weighting.p_norm, normalized)?, *value));
    }

    weighted_mean(entries, weighting.epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn weighting() -> Weighting {
        Weighting {
            epsilon: dec!(0.0001),
            p_norm: dec!(2),
        }
    }

    fn values(pairs: &[(&str, Decimal)]) -> BTreeMap<ActorId, Decimal> {
        pairs.iter().map(|(a, v)| (ActorId::from(*a), *v)).collect()
    }

    #[test]
    fn test_single_actor_returns_its_value() {
        let inferences = values(&[("worker0", dec!(1.5))]);
        let regrets = RegretSnapshot::default();
        let max = max_regret(&regrets, &inferences, &BTreeMap::new(), weighting().epsilon);
        let result =
            combined_inference(&inferences, &BTreeMap::new(), &regrets, max, weighting()).unwrap();
        assert!((result - dec!(1.5)).abs() < dec!(0.000000000000000001));
    }

    #[test]
    fn test_equal_regrets_give_plain_mean() {
        let inferences = values(&[("worker0", dec!(1)), ("worker1", dec!(3))]);
        let implied = values(&[("forecaster0", dec!(5))]);
        let regrets = RegretSnapshot::default();
        let max = max_regret(&regrets, &inferences, &implied, weighting().epsilon);
        let result = combined_inference(&inferences, &implied, &regrets, max, weighting()).unwrap();
        assert!((result - dec!(3)).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_higher_regret_pulls_toward_actor() {
        let inferences = values(&[("worker0", dec!(0)), ("worker1", dec!(10))]);
        let mut regrets = RegretSnapshot::default();
        regrets.inferer.insert(ActorId::from("worker0"), dec!(-0.5));
        regrets.inferer.insert(ActorId::from("worker1"), dec!(0.5));
        let max = max_regret(&regrets, &inferences, &BTreeMap::new(), weighting().epsilon);
        assert_eq!(max, dec!(0.5));
        let result =
            combined_inference(&inferences, &BTreeMap::new(), &regrets, max, weighting()).unwrap();
        assert!(result > dec!(5));
    }

    #[test]
    fn test_weak_actor_with_fractional_p_norm_is_ignored() {
        // worker1 normalizes to -50; with p = 2.5 its weight underflows to 0.
        let inferences = values(&[("worker0", dec!(1)), ("worker1", dec!(2))]);
        let mut regrets = RegretSnapshot::default();
        regrets.inferer.insert(ActorId::from("worker0"), dec!(0.01));
        regrets.inferer.insert(ActorId::from("worker1"), dec!(-0.5));
        let weighting = Weighting {
            epsilon: dec!(0.0001),
            p_norm: dec!(2.5),
        };
        let max = max_regret(&regrets, &inferences, &BTreeMap::new(), weighting.epsilon);
        let result =
            combined_inference(&inferences, &BTreeMap::new(), &regrets, max, weighting).unwrap();
        assert!((result - dec!(1)).abs() < dec!(0.000001), "got {}", result);
    }

    #[test]
    fn test_degenerate_max_regret_rejected() {
        let inferences = values(&[("worker0", dec!(1))]);
        let err = combined_inference(
            &inferences,
            &BTreeMap::new(),
            &RegretSnapshot::default(),
            dec!(0.00001),
            weighting(),
        )
        .unwrap_err();
        assert!(matches!(err, AlloraError::MaxRegretBelowEpsilon { .. }));
    }

    #[test]
    fn test_all_weights_underflow_rejected() {
        // Regret -100 normalized by 1 lands below the gradient floor.
        let inferences = values(&[("worker0", dec!(1))]);
        let mut regrets = RegretSnapshot::default();
        regrets.inferer.insert(ActorId::from("worker0"), dec!(-100));
        let err = combined_inference(&inferences, &BTreeMap::new(), &regrets, dec!(1), weighting())
            .unwrap_err();
        assert!(matches!(err, AlloraError::SumWeightsBelowEpsilon { .. }));
    }

    #[test]
    fn test_one_in_view_reads_one_in_regrets() {
        let f = ActorId::from("forecaster0");
        let w = ActorId::from("worker0");
        let mut snapshot = RegretSnapshot::default();
        snapshot.inferer.insert(w.clone(), dec!(9));
        snapshot.one_in.insert((f.clone(), w.clone()), dec!(0.2));
        snapshot.one_in.insert((f.clone(), f.clone()), dec!(0.7));

        let view = OneInView { snapshot: &snapshot, forecaster: &f };
        assert_eq!(view.inferer_regret(&w), dec!(0.2));
        assert_eq!(view.forecaster_regret(&f), dec!(0.7));
        assert_eq!(view.inferer_regret(&ActorId::from("worker9")), Decimal::ZERO);
    }
}
