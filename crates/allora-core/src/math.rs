// crates/allora-core/src/math.rs
//
// Deterministic decimal math for inference synthesis.
//
// Every value in the engine is a `Decimal`; transcendental functions are
// taken from rust_decimal's `maths` feature and only ever through their
// checked forms, so a domain or range failure is an error instead of a
// panic. No floating point is used anywhere in these paths: two nodes fed
// the same inputs produce the same digits.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::error::AlloraError;

/// Above this argument softplus(x) == x and sigmoid(x) == 1 to well below
/// decimal precision, so the gradient takes its asymptotic form.
const GRADIENT_ASYMPTOTE: Decimal = dec!(40);

/// Below this argument the gradient underflows to zero.
const GRADIENT_FLOOR: Decimal = dec!(-60);

/// Natural log of the smallest power of softplus still computed; below it
/// `e^(ln(s)·k)` leaves `Decimal`'s range and the power reads as zero.
const POWER_LOG_FLOOR: Decimal = dec!(-60);

fn math_err(op: &str, a: Decimal, b: Decimal) -> AlloraError {
    AlloraError::Math(format!("{} overflowed for operands {} and {}", op, a, b))
}

/// Checked addition.
pub fn add(a: Decimal, b: Decimal) -> Result<Decimal, AlloraError> {
    a.checked_add(b).ok_or_else(|| math_err("add", a, b))
}

/// Checked subtraction.
pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal, AlloraError> {
    a.checked_sub(b).ok_or_else(|| math_err("sub", a, b))
}

/// Checked multiplication.
pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal, AlloraError> {
    a.checked_mul(b).ok_or_else(|| math_err("mul", a, b))
}

/// Checked division. Division by zero is reported as `DivideByZero`.
pub fn div(a: Decimal, b: Decimal) -> Result<Decimal, AlloraError> {
    if b.is_zero() {
        return Err(AlloraError::DivideByZero(format!("{} / 0", a)));
    }
    a.checked_div(b).ok_or_else(|| math_err("div", a, b))
}

/// `e^x`.
pub fn exp(x: Decimal) -> Result<Decimal, AlloraError> {
    x.checked_exp()
        .ok_or_else(|| AlloraError::Math(format!("exp({}) is out of range", x)))
}

/// Natural logarithm; `x` must be strictly positive.
pub fn ln(x: Decimal) -> Result<Decimal, AlloraError> {
    if x <= Decimal::ZERO {
        return Err(AlloraError::Math(format!("ln({}) is undefined", x)));
    }
    x.checked_ln()
        .ok_or_else(|| AlloraError::Math(format!("ln({}) failed", x)))
}

/// Base-10 logarithm of a loss. Non-positive losses are `InvalidLoss`.
pub fn log10(x: Decimal, context: &str) -> Result<Decimal, AlloraError> {
    if x <= Decimal::ZERO {
        return Err(AlloraError::InvalidLoss {
            context: context.to_string(),
            value: x,
        });
    }
    x.checked_log10()
        .ok_or_else(|| AlloraError::Math(format!("log10({}) failed", x)))
}

/// `10^x`, the inverse of [`log10`].
pub fn pow10(x: Decimal) -> Result<Decimal, AlloraError> {
    pow(Decimal::TEN, x)
}

/// `base^exponent` for a non-negative base.
pub fn pow(base: Decimal, exponent: Decimal) -> Result<Decimal, AlloraError> {
    if exponent.is_zero() {
        return Ok(Decimal::ONE);
    }
    if base.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if base < Decimal::ZERO {
        return Err(AlloraError::Math(format!(
            "{}^{} has a negative base",
            base, exponent
        )));
    }
    base.checked_powd(exponent)
        .ok_or_else(|| AlloraError::Math(format!("{}^{} is out of range", base, exponent)))
}

/// `softplus^exponent` for `softplus > 0`, flushed to zero once the
/// result is too small to represent.
fn softplus_pow(softplus: Decimal, exponent: Decimal) -> Result<Decimal, AlloraError> {
    if exponent.is_zero() {
        return Ok(Decimal::ONE);
    }
    if softplus.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let log_power = mul(ln(softplus)?, exponent)?;
    if log_power < POWER_LOG_FLOOR {
        return Ok(Decimal::ZERO);
    }
    pow(softplus, exponent)
}

/// Potential function `φ_p(x) = ln(1 + e^x)^p`.
pub fn phi(p: Decimal, x: Decimal) -> Result<Decimal, AlloraError> {
    if x < GRADIENT_FLOOR {
        return Ok(Decimal::ZERO);
    }
    let softplus = if x > GRADIENT_ASYMPTOTE {
        x
    } else {
        ln(add(Decimal::ONE, exp(x)?)?)?
    };
    softplus_pow(softplus, p)
}

/// Gradient of the potential function with respect to `x`:
///
/// `φ'_p(x) = p · ln(1 + e^x)^(p−1) · e^x / (1 + e^x)`
///
/// Turns a normalized regret into a combination weight. Monotonically
/// non-decreasing in `x` for `p ≥ 1`, positive everywhere it does not
/// underflow.
pub fn gradient(p: Decimal, x: Decimal) -> Result<Decimal, AlloraError> {
    if p < Decimal::ONE {
        return Err(AlloraError::InvalidInput(format!(
            "gradient exponent must be at least 1, got {}",
            p
        )));
    }
    if x < GRADIENT_FLOOR {
        return Ok(Decimal::ZERO);
    }
    let p_minus_one = sub(p, Decimal::ONE)?;

    if x > GRADIENT_ASYMPTOTE {
        return mul(p, pow(x, p_minus_one)?);
    }

    let e_x = exp(x)?;
    let one_plus_e_x = add(Decimal::ONE, e_x)?;
    let softplus = ln(one_plus_e_x)?;
    let sigmoid = div(e_x, one_plus_e_x)?;
    let powered = softplus_pow(softplus, p_minus_one)?;
    mul(mul(p, powered)?, sigmoid)
}

/// Exponential moving average: `alpha · current + (1 − alpha) · previous`.
pub fn ema(alpha: Decimal, current: Decimal, previous: Decimal) -> Result<Decimal, AlloraError> {
    let fresh = mul(alpha, current)?;
    let carried = mul(sub(Decimal::ONE, alpha)?, previous)?;
    add(fresh, carried)
}

/// Weighted arithmetic mean of `(weight, value)` pairs.
///
/// Fails with `SumWeightsBelowEpsilon` when the weights total no more than
/// `epsilon`: a network whose contributions all weigh ~zero has no value,
/// it does not have the value zero.
pub fn weighted_mean<I>(entries: I, epsilon: Decimal) -> Result<Decimal, AlloraError>
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let mut sum_weights = Decimal::ZERO;
    let mut sum_weighted = Decimal::ZERO;
    for (weight, value) in entries {
        sum_weights = add(sum_weights, weight)?;
        sum_weighted = add(sum_weighted, mul(weight, value)?)?;
    }
    if sum_weights <= epsilon {
        return Err(AlloraError::SumWeightsBelowEpsilon {
            sum_weights,
            epsilon,
        });
    }
    div(sum_weighted, sum_weights)
}

/// Incremental weighted average:
/// `avg ← avg + (w / Σw) · (next − avg)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningWeightedAverage {
    pub average: Decimal,
    pub sum_weights: Decimal,
}

impl RunningWeightedAverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one weighted observation.
    ///
    /// While the accumulated weight is still zero the average is left
    /// untouched; callers detect that case through `sum_weights`.
    pub fn update(&mut self, weight: Decimal, next_value: Decimal) -> Result<(), AlloraError> {
        self.sum_weights = add(self.sum_weights, weight)?;
        if self.sum_weights.is_zero() {
            return Ok(());
        }
        let share = div(weight, self.sum_weights)?;
        let step = mul(share, sub(next_value, self.average)?)?;
        self.average = add(self.average, step)?;
        Ok(())
    }
}

/// Linearly interpolated quantile over values sorted in descending order.
///
/// `position = (1 − q) · (n − 1)`, blending the floor and ceil order
/// statistics.
pub fn quantile_of_descending(sorted_desc: &[Decimal], quantile: Decimal) -> Result<Decimal, AlloraError> {
    if sorted_desc.is_empty() {
        return Err(AlloraError::EmptyInput(
            "quantile of an empty score list".to_string(),
        ));
    }
    if quantile < Decimal::ZERO || quantile > Decimal::ONE {
        return Err(AlloraError::InvalidInput(format!(
            "quantile must lie in [0, 1], got {}",
            quantile
        )));
    }
    let last = Decimal::from(sorted_desc.len() - 1);
    let position = mul(sub(Decimal::ONE, quantile)?, last)?;
    let lower = position.floor();
    let upper = position.ceil();
    let lower_idx = lower
        .to_usize()
        .ok_or_else(|| AlloraError::Math(format!("bad quantile index {}", lower)))?;
    let upper_idx = upper
        .to_usize()
        .ok_or_else(|| AlloraError::Math(format!("bad quantile index {}", upper)))?;

    let low_value = sorted_desc[lower_idx];
    if lower_idx == upper_idx {
        return Ok(low_value);
    }
    let high_value = sorted_desc[upper_idx];
    let fraction = sub(position, lower)?;
    add(low_value, mul(sub(high_value, low_value)?, fraction)?)
}
