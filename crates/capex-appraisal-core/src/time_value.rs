use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::AppraisalError;
use crate::types::{Money, Rate};
use crate::CapexResult;

/// Successive Newton estimates closer than this are treated as converged.
pub const IRR_TOLERANCE: Decimal = dec!(0.00000001);
pub const MAX_IRR_ITERATIONS: u32 = 100;
pub const DEFAULT_IRR_GUESS: Rate = dec!(0.10);

/// (1 + rate)^periods by repeated multiplication. `None` on overflow.
pub fn compound_factor(rate: Rate, periods: u32) -> Option<Decimal> {
    let base = Decimal::ONE.checked_add(rate)?;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor.checked_mul(base)?;
    }
    Some(factor)
}

/// Discount factor (1 + rate)^-t.
///
/// A compounding factor too large for a Decimal discounts to zero.
pub fn discount_factor(rate: Rate, t: u32) -> CapexResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(AppraisalError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    match compound_factor(rate, t) {
        Some(factor) => Decimal::ONE
            .checked_div(factor)
            .ok_or_else(|| AppraisalError::DivisionByZero {
                context: format!("discount factor at period {t}"),
            }),
        None => Ok(Decimal::ZERO),
    }
}

/// Net Present Value of a series of cash flows, first flow at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> CapexResult<Money> {
    let mut result = Decimal::ZERO;
    for (t, cf) in cash_flows.iter().enumerate() {
        result += cf * discount_factor(rate, t as u32)?;
    }
    Ok(result)
}

/// True when the series holds at least one strictly positive and one
/// strictly negative flow.
pub fn has_sign_change(cash_flows: &[Money]) -> bool {
    let positive = cash_flows.iter().any(|cf| cf.is_sign_positive() && !cf.is_zero());
    let negative = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    positive && negative
}

/// Internal Rate of Return using Newton-Raphson.
///
/// Iterates until successive estimates differ by less than
/// [`IRR_TOLERANCE`]. A vanishing derivative stops the search at the last
/// estimate. Hitting the iteration cap, or an estimate at or below -100%,
/// is a `ConvergenceFailure`.
pub fn irr(cash_flows: &[Money], guess: Rate) -> CapexResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(AppraisalError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    if !has_sign_change(cash_flows) {
        return Err(AppraisalError::InsufficientData(
            "IRR requires cash flows that change sign".into(),
        ));
    }
    if guess <= dec!(-1) {
        return Err(AppraisalError::InvalidInput {
            field: "guess".into(),
            reason: "IRR starting guess must be greater than -100%".into(),
        });
    }

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let (value, slope) =
            npv_with_slope(rate, cash_flows).ok_or_else(|| AppraisalError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: Decimal::ZERO,
            })?;

        if slope.is_zero() {
            return Ok(rate);
        }

        let step = value
            .checked_div(slope)
            .ok_or_else(|| AppraisalError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: value,
            })?;
        let next = rate - step;

        if next <= dec!(-1) {
            return Err(AppraisalError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i + 1,
                last_delta: step,
            });
        }

        if (next - rate).abs() < IRR_TOLERANCE {
            return Ok(next);
        }

        rate = next;
    }

    Err(AppraisalError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: npv_with_slope(rate, cash_flows)
            .map(|(value, _)| value)
            .unwrap_or(Decimal::MAX),
    })
}

/// Real rate implied by a money (nominal) rate and general inflation:
/// (1 + m) = (1 + r)(1 + h).
pub fn real_rate(nominal: Rate, inflation: Rate) -> CapexResult<Rate> {
    let divisor = Decimal::ONE + inflation;
    if divisor <= Decimal::ZERO {
        return Err(AppraisalError::InvalidInput {
            field: "inflation".into(),
            reason: "Inflation must be greater than -100%".into(),
        });
    }
    Ok((Decimal::ONE + nominal) / divisor - Decimal::ONE)
}

/// NPV and dNPV/dr at `rate`, discounting iteratively.
///
/// Terms whose compounding factor overflows contribute nothing. Returns
/// `None` when the rate is outside the domain or an intermediate value is
/// not representable.
fn npv_with_slope(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Decimal)> {
    let one_plus_r = Decimal::ONE.checked_add(rate)?;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                None => break,
            }
        }
        value = value.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            if let Some(denom) = discount.checked_mul(one_plus_r) {
                let term = Decimal::from(t as i64).checked_mul(*cf)?.checked_div(denom)?;
                slope = slope.checked_sub(term)?;
            }
        }
    }

    Some((value, slope))
}
