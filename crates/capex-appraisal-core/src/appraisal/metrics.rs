use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AppraisalError;
use crate::time_value::{self, DEFAULT_IRR_GUESS};
use crate::types::{Metric, Money, Rate, UndefinedReason, Years};
use crate::CapexResult;

use super::cash_flow::CashFlowSchedule;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Denominator used for the Accounting Rate of Return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrBasis {
    /// Initial capital cost
    #[default]
    InitialInvestment,
    /// (initial cost + residual value) / 2
    AverageInvestment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppraisalOptions {
    pub discount_rate: Rate,
    #[serde(default)]
    pub arr_basis: ArrBasis,
    #[serde(default = "default_irr_guess")]
    pub irr_guess: Rate,
}

fn default_irr_guess() -> Rate {
    DEFAULT_IRR_GUESS
}

impl AppraisalOptions {
    pub fn new(discount_rate: Rate) -> Self {
        AppraisalOptions {
            discount_rate,
            arr_basis: ArrBasis::default(),
            irr_guess: DEFAULT_IRR_GUESS,
        }
    }
}

/// Discounting detail for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountedYear {
    pub year: u32,
    pub net_cash_flow: Money,
    pub discount_factor: Decimal,
    pub present_value: Money,
    pub cumulative_cash_flow: Money,
    pub cumulative_present_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppraisalResult {
    pub discount_rate: Rate,
    /// Sum of present values
    pub npv: Money,
    pub irr: Metric<Rate>,
    /// Years until cumulative undiscounted cash flow is non-negative
    pub payback_years: Metric<Years>,
    /// Years until cumulative discounted cash flow is non-negative
    pub discounted_payback_years: Metric<Years>,
    pub arr: Metric<Rate>,
    pub average_accounting_profit: Money,
    /// Denominator used for ARR
    pub arr_investment: Money,
    pub years: Vec<DiscountedYear>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Appraise a schedule at `discount_rate` with default options.
pub fn appraise(schedule: &CashFlowSchedule, discount_rate: Rate) -> CapexResult<AppraisalResult> {
    appraise_with(schedule, &AppraisalOptions::new(discount_rate))
}

/// Discount factors, present values, NPV, IRR, paybacks and ARR.
///
/// Only an invalid discount rate is an error. Metrics with no financial
/// answer are returned as [`Metric::Undefined`] with the rule that applied.
pub fn appraise_with(
    schedule: &CashFlowSchedule,
    options: &AppraisalOptions,
) -> CapexResult<AppraisalResult> {
    let rate = options.discount_rate;
    if rate <= dec!(-1) {
        return Err(AppraisalError::invalid(
            "discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let flows = schedule.net_cash_flows();

    let mut years = Vec::with_capacity(flows.len());
    let mut present_values = Vec::with_capacity(flows.len());
    let mut cumulative = Decimal::ZERO;
    let mut cumulative_pv = Decimal::ZERO;

    for (t, cf) in flows.iter().enumerate() {
        let discount_factor = time_value::discount_factor(rate, t as u32)?;
        let present_value = cf * discount_factor;
        cumulative += cf;
        cumulative_pv += present_value;
        present_values.push(present_value);
        years.push(DiscountedYear {
            year: t as u32,
            net_cash_flow: *cf,
            discount_factor,
            present_value,
            cumulative_cash_flow: cumulative,
            cumulative_present_value: cumulative_pv,
        });
    }

    let npv = cumulative_pv;
    let irr = internal_rate_of_return(&flows, options.irr_guess);
    let payback_years = payback_period(&flows);
    let discounted_payback_years = payback_period(&present_values);

    let profits = schedule.accounting_profits();
    let average_accounting_profit = if profits.is_empty() {
        Decimal::ZERO
    } else {
        profits.iter().sum::<Money>() / Decimal::from(profits.len() as u64)
    };
    let arr_investment = match options.arr_basis {
        ArrBasis::InitialInvestment => schedule.initial_investment,
        ArrBasis::AverageInvestment => (schedule.initial_investment + schedule.residual_value) / dec!(2),
    };
    let arr = accounting_rate_of_return(average_accounting_profit, arr_investment);

    tracing::debug!(%npv, ?irr, ?payback_years, ?arr, "appraisal complete");

    Ok(AppraisalResult {
        discount_rate: rate,
        npv,
        irr,
        payback_years,
        discounted_payback_years,
        arr,
        average_accounting_profit,
        arr_investment,
        years,
    })
}

/// IRR as a tagged metric: no sign change and solver failure are
/// reported, not raised.
pub fn internal_rate_of_return(flows: &[Money], guess: Rate) -> Metric<Rate> {
    if !time_value::has_sign_change(flows) {
        return Metric::undefined(UndefinedReason::NoSignChange);
    }
    match time_value::irr(flows, guess) {
        Ok(rate) => Metric::defined(rate),
        Err(e) => {
            tracing::debug!(error = %e, "IRR solver gave up");
            Metric::undefined(UndefinedReason::NotConverged)
        }
    }
}

/// Fractional year at which the running total of `flows` first becomes
/// non-negative, assuming the crossing year's flow accrues evenly.
pub fn payback_period(flows: &[Money]) -> Metric<Years> {
    let mut cumulative = Decimal::ZERO;

    for (t, cf) in flows.iter().enumerate() {
        let previous = cumulative;
        cumulative += cf;
        if cumulative >= Decimal::ZERO {
            if t == 0 || cumulative.is_zero() {
                return Metric::defined(Decimal::from(t as u64));
            }
            // previous < 0 <= cumulative, so cf > 0
            let fraction = -previous / cf;
            return Metric::defined(Decimal::from((t - 1) as u64) + fraction);
        }
    }

    Metric::undefined(UndefinedReason::NeverRecovered)
}

/// Average annual accounting profit over `investment`.
pub fn accounting_rate_of_return(average_profit: Money, investment: Money) -> Metric<Rate> {
    if investment.is_zero() {
        return Metric::undefined(UndefinedReason::ZeroInvestment);
    }
    Metric::defined(average_profit / investment)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
