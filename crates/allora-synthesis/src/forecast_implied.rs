// crates/allora-synthesis/src/forecast_implied.rs
//
// Forecast-implied inferences.
//
// A forecaster predicts the loss each inferer will incur. Inferers the
// forecaster expects to beat the previous network loss by more get more
// weight, and the forecaster's implied inference is the weighted mean of
// those inferers' values.

use std::collections::BTreeMap;

use allora_core::math::{self, gradient, log10};
use allora_core::{ActorId, AlloraError, Decimal, Forecast};

/// Compute one implied inference per forecaster.
///
/// # Arguments
/// * `inferences` - Accepted inferer -> inference value.
/// * `forecasts` - Forecasts of the epoch; elements naming an inferer not in
///   `inferences` are ignored, and a forecaster's first forecast wins.
/// * `network_combined_loss` - Previous epoch's network combined loss (raw,
///   strictly positive).
/// * `epsilon` - Floor for the ratio normalizer and the weight total.
/// * `p_norm` - Gradient exponent.
///
/// For each element `j` the ratio `R_j = log10(network_loss / loss_j)` is
/// normalized by `max(|max_j R_j|, epsilon)` and fed to the gradient to get
/// its weight.
pub fn compute_forecast_implied_inferences(
    inferences: &BTreeMap<ActorId, Decimal>,
    forecasts: &[Forecast],
    network_combined_loss: Decimal,
    epsilon: Decimal,
    p_norm: Decimal,
) -> Result<BTreeMap<ActorId, Decimal>, AlloraError> {
    let log_network_loss = log10(network_combined_loss, "network combined loss")?;
    let mut implied = BTreeMap::new();

    for forecast in forecasts {
        if implied.contains_key(&forecast.forecaster) {
            continue;
        }

        // Elements of this forecast that reference an accepted inferer, first per inferer.
        let mut seen = std::collections::BTreeSet::new();
        let elements: Vec<(Decimal, Decimal)> = forecast
            .forecast_elements
            .iter()
            .filter(|el| seen.insert(el.inferer.clone()))
            .filter_map(|el| inferences.get(&el.inferer).map(|v| (el.value, *v)))
            .collect();

        if elements.is_empty() {
            tracing::debug!(
                "Forecast of {} references no accepted inferer; skipping",
                forecast.forecaster
            );
            continue;
        }

        let value = if elements.len() == 1 {
            elements[0].1
        } else {
            implied_value(&forecast.forecaster, &elements, log_network_loss, epsilon, p_norm)?
        };
        implied.insert(forecast.forecaster.clone(), value);
    }

    Ok(implied)
}

/// Weighted mean over `(predicted_loss, inference_value)` pairs.
fn implied_value(
    forecaster: &ActorId,
    elements: &[(Decimal, Decimal)],
    log_network_loss: Decimal,
    epsilon: Decimal,
    p_norm: Decimal,
) -> Result<Decimal, AlloraError> {
    let context = format!("forecast of {}", forecaster);
    let mut ratios = Vec::with_capacity(elements.len());
    for (loss, _) in elements {
        ratios.push(math::sub(log_network_loss, log10(*loss, &context)?)?);
    }

    let largest = ratios.iter().copied().max().unwrap_or(Decimal::ZERO);
    let normalizer = largest.abs().max(epsilon);

    let mut sum_weights = Decimal::ZERO;
    let mut sum_weighted = Decimal::ZERO;
    for (ratio, (_, value)) in ratios.iter().zip(elements) {
        let weight = gradient(p_norm, math::div(*ratio, normalizer)?)?;
        sum_weights = math::add(sum_weights, weight)?;
        sum_weighted = math::add(sum_weighted, math::mul(weight, *value)?)?;
    }

    if sum_weights < epsilon {
        return Err(AlloraError::DivideByZero(format!(
            "forecast-implied weights of {} sum to {}",
            forecaster, sum_weights
        )));
    }
    math::div(sum_weighted, sum_weights)
}
