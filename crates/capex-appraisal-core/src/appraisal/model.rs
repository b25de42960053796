use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AppraisalError;
use crate::time_value;
use crate::types::{with_metadata, ComputationOutput, Metric, Money, Rate};
use crate::CapexResult;

use super::allowances::{allowance_schedule, CapitalAllowanceSchedule};
use super::cash_flow::{cash_flow_schedule, CashFlowInputs, CashFlowSchedule};
use super::metrics::{appraise_with, AppraisalOptions, AppraisalResult, ArrBasis};
use super::projection::{
    build_profile, operating_lines, validate_fraction, validate_profile,
    validate_rate_above_minus_one, validate_tax_lag, validate_years, InflationRates,
    OperatingLines, PricingBasis, YearlyOperatingProfile,
};
use super::tax::{tax_schedule_with_policy, TaxBeyondHorizon, TaxSchedule};
use super::working_capital::{
    working_capital_schedule_with_timing, WorkingCapitalSchedule, WorkingCapitalTiming,
};

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Everything needed to appraise one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectParameters {
    /// Project life in years (1..=50)
    pub years: u32,
    /// Initial capital cost, paid at year 0
    pub capex: Money,
    /// Disposal proceeds received at the end of the final year
    pub residual_value: Money,
    /// Year 1 sales
    pub base_sales: Money,
    /// Annual sales growth (geometric)
    #[serde(default)]
    pub sales_growth: Rate,
    /// Variable cost as a fraction of sales
    pub variable_cost_rate: Rate,
    /// Fixed cost per year
    pub fixed_cost: Money,
    /// Writing-down allowance rate on the reducing balance
    pub wda_rate: Rate,
    pub tax_rate: Rate,
    pub discount_rate: Rate,
    /// Working capital as a fraction of sales
    #[serde(default)]
    pub working_capital_pct: Rate,
    /// Years between earning profit and paying its tax
    #[serde(default = "default_tax_lag")]
    pub tax_lag_years: u32,
    /// Cap disposal proceeds at original cost when closing the pool
    #[serde(default = "default_true")]
    pub cap_disposal_to_cost: bool,
    #[serde(default)]
    pub pricing: PricingBasis,
    /// Specific inflation rates (nominal pricing only)
    #[serde(default)]
    pub inflation: InflationRates,
    /// General inflation used to deflate a money discount rate in a real
    /// appraisal. Leave unset when `discount_rate` is already real.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_inflation: Option<Rate>,
    #[serde(default)]
    pub working_capital_timing: WorkingCapitalTiming,
    #[serde(default)]
    pub tax_beyond_horizon: TaxBeyondHorizon,
    #[serde(default)]
    pub arr_basis: ArrBasis,
    /// Caller-edited per-year profile; replaces the generated one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_override: Option<YearlyOperatingProfile>,
}

fn default_tax_lag() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Every schedule produced by one appraisal run plus the metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAppraisal {
    pub profile: YearlyOperatingProfile,
    pub operating_lines: OperatingLines,
    /// Rate actually used for discounting
    pub effective_discount_rate: Rate,
    pub capital_allowances: CapitalAllowanceSchedule,
    pub working_capital: WorkingCapitalSchedule,
    pub tax: TaxSchedule,
    pub cash_flows: CashFlowSchedule,
    pub appraisal: AppraisalResult,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Run a full appraisal: validate, project, build the allowance, working
/// capital, tax and cash-flow schedules, then compute the metrics.
pub fn appraise_project(
    params: &ProjectParameters,
) -> CapexResult<ComputationOutput<ProjectAppraisal>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // ── Validation ───────────────────────────────────────────────────
    validate_parameters(params)?;

    // ── Operating profile ────────────────────────────────────────────
    let profile = match &params.profile_override {
        Some(edited) => edited.clone(),
        None => build_profile(
            params.years,
            params.base_sales,
            params.sales_growth,
            params.variable_cost_rate,
            params.fixed_cost,
        )?,
    };
    let lines = operating_lines(&profile, params.pricing, &params.inflation)?;

    let effective_discount_rate = match (params.pricing, params.general_inflation) {
        (PricingBasis::Real, Some(inflation)) => time_value::real_rate(params.discount_rate, inflation)?,
        (PricingBasis::Nominal, Some(_)) => {
            warnings.push(
                "General inflation is ignored in a nominal appraisal; the discount rate is used as a money rate"
                    .into(),
            );
            params.discount_rate
        }
        (_, None) => params.discount_rate,
    };

    // ── Workings ─────────────────────────────────────────────────────
    let capital_allowances = allowance_schedule(
        params.capex,
        params.wda_rate,
        params.years,
        params.residual_value,
        params.cap_disposal_to_cost,
    )?;
    let working_capital = working_capital_schedule_with_timing(
        &lines.sales,
        params.working_capital_pct,
        params.working_capital_timing,
    )?;
    let tax = tax_schedule_with_policy(
        &lines.operating_profit,
        &capital_allowances,
        params.tax_rate,
        params.tax_lag_years,
        params.tax_beyond_horizon,
    )?;
    let cash_flows = cash_flow_schedule(&CashFlowInputs {
        lines: &lines,
        allowances: &capital_allowances,
        tax: &tax,
        working_capital: &working_capital,
        capex: params.capex,
        residual: params.residual_value,
    })?;

    // ── Metrics ──────────────────────────────────────────────────────
    let options = AppraisalOptions {
        discount_rate: effective_discount_rate,
        arr_basis: params.arr_basis,
        irr_guess: time_value::DEFAULT_IRR_GUESS,
    };
    let appraisal = appraise_with(&cash_flows, &options)?;

    // ── Warnings ─────────────────────────────────────────────────────
    if capital_allowances.is_balancing_charge() {
        warnings.push(format!(
            "Balancing charge of {} in year {} is added to taxable profit",
            -capital_allowances.balancing_adjustment(),
            params.years
        ));
    }
    let loss_years = tax.loss_years();
    if !loss_years.is_empty() {
        warnings.push(format!(
            "Taxable losses in year(s) {loss_years:?} are not relieved or carried forward"
        ));
    }
    for late in &tax.dropped {
        warnings.push(format!(
            "Tax of {} on year {} profit falls due in year {}, beyond the {}-year horizon, and is excluded",
            late.amount, late.origin_year, late.payment_year, params.years
        ));
    }
    push_undefined_warning(&mut warnings, "IRR", &appraisal.irr);
    push_undefined_warning(&mut warnings, "Payback period", &appraisal.payback_years);
    push_undefined_warning(
        &mut warnings,
        "Discounted payback period",
        &appraisal.discounted_payback_years,
    );
    push_undefined_warning(&mut warnings, "ARR", &appraisal.arr);
    if appraisal.npv < Decimal::ZERO {
        warnings.push(format!(
            "Negative NPV of {}: project does not earn the {} discount rate",
            appraisal.npv.round_dp(2),
            effective_discount_rate
        ));
    }
    for w in &warnings {
        tracing::warn!("{w}");
    }

    let output = ProjectAppraisal {
        profile,
        operating_lines: lines,
        effective_discount_rate,
        capital_allowances,
        working_capital,
        tax,
        cash_flows,
        appraisal,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Capital Investment Appraisal (reducing-balance capital allowances, lagged tax)",
        &serde_json::json!({
            "years": params.years,
            "capex": params.capex.to_string(),
            "residual_value": params.residual_value.to_string(),
            "discount_rate": params.discount_rate.to_string(),
            "effective_discount_rate": effective_discount_rate.to_string(),
            "pricing": params.pricing,
            "tax_rate": params.tax_rate.to_string(),
            "tax_lag_years": params.tax_lag_years,
            "tax_beyond_horizon": params.tax_beyond_horizon,
            "wda_rate": params.wda_rate.to_string(),
            "cap_disposal_to_cost": params.cap_disposal_to_cost,
            "working_capital_timing": params.working_capital_timing,
            "arr_basis": params.arr_basis,
            "profile_source": if params.profile_override.is_some() { "override" } else { "generated" },
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate all parameter constraints before any schedule is built.
pub fn validate_parameters(params: &ProjectParameters) -> CapexResult<()> {
    validate_years(params.years)?;
    validate_tax_lag(params.tax_lag_years)?;

    if params.capex < Decimal::ZERO {
        return Err(AppraisalError::invalid("capex", "Capital cost cannot be negative"));
    }
    if params.residual_value < Decimal::ZERO {
        return Err(AppraisalError::invalid(
            "residual_value",
            "Residual value cannot be negative",
        ));
    }
    if params.base_sales < Decimal::ZERO {
        return Err(AppraisalError::invalid("base_sales", "Sales cannot be negative"));
    }
    if params.fixed_cost < Decimal::ZERO {
        return Err(AppraisalError::invalid("fixed_cost", "Fixed cost cannot be negative"));
    }
    validate_rate_above_minus_one("sales_growth", params.sales_growth)?;
    validate_fraction("variable_cost_rate", params.variable_cost_rate)?;
    validate_fraction("wda_rate", params.wda_rate)?;
    validate_fraction("tax_rate", params.tax_rate)?;
    validate_fraction("working_capital_pct", params.working_capital_pct)?;
    if params.discount_rate <= dec!(-1) {
        return Err(AppraisalError::invalid(
            "discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }
    validate_rate_above_minus_one("inflation.sales", params.inflation.sales)?;
    validate_rate_above_minus_one("inflation.variable_cost", params.inflation.variable_cost)?;
    validate_rate_above_minus_one("inflation.fixed_cost", params.inflation.fixed_cost)?;
    if let Some(h) = params.general_inflation {
        if h <= dec!(-1) {
            return Err(AppraisalError::invalid(
                "general_inflation",
                "Inflation must be greater than -100%",
            ));
        }
    }
    if let Some(profile) = &params.profile_override {
        validate_profile(profile, params.years)?;
    }

    Ok(())
}

fn push_undefined_warning<T: Copy>(warnings: &mut Vec<String>, label: &str, metric: &Metric<T>) {
    if let Some(reason) = metric.reason() {
        warnings.push(format!("{label} not available: {reason}"));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UndefinedReason;
    use rust_decimal_macros::dec;

    fn base_params() -> ProjectParameters {
        ProjectParameters {
            years: 4,
            capex: dec!(500000),
            residual_value: dec!(50000),
            base_sales: dec!(400000),
            sales_growth: dec!(0.03),
            variable_cost_rate: dec!(0.55),
            fixed_cost: dec!(80000),
            wda_rate: dec!(0.18),
            tax_rate: dec!(0.25),
            discount_rate: dec!(0.10),
            working_capital_pct: dec!(0.10),
            tax_lag_years: 1,
            cap_disposal_to_cost: true,
            pricing: PricingBasis::Real,
            inflation: InflationRates::default(),
            general_inflation: None,
            working_capital_timing: WorkingCapitalTiming::StartOfYear,
            tax_beyond_horizon: TaxBeyondHorizon::Drop,
            arr_basis: ArrBasis::InitialInvestment,
            profile_override: None,
        }
    }

    #[test]
    fn test_run_produces_every_schedule() {
        let out = appraise_project(&base_params()).unwrap();
        let r = &out.result;
        assert_eq!(r.profile.len(), 4);
        assert_eq!(r.capital_allowances.rows.len(), 4);
        assert_eq!(r.working_capital.rows.len(), 5);
        assert_eq!(r.cash_flows.rows.len(), 5);
        assert_eq!(r.appraisal.years.len(), 5);
        assert_eq!(r.effective_discount_rate, dec!(0.10));
    }

    #[test]
    fn test_base_case_final_year_loss_is_warned() {
        // Year 4 balancing allowance 275,684 - 50,000 exceeds operating profit
        let out = appraise_project(&base_params()).unwrap();
        assert_eq!(out.result.tax.loss_years(), vec![4]);
        assert!(out.result.tax.dropped.is_empty());
        assert!(out.warnings.iter().any(|w| w.contains("not relieved")));
    }

    #[test]
    fn test_balancing_charge_and_dropped_tax_are_warned() {
        let mut p = base_params();
        // WDV 275,684 against disposal 300,000 → charge of 24,316
        p.residual_value = dec!(300000);
        let out = appraise_project(&p).unwrap();
        assert!(out.result.capital_allowances.is_balancing_charge());
        assert_eq!(out.result.tax.dropped.len(), 1);
        assert_eq!(out.result.tax.dropped[0].payment_year, 5);
        assert!(out.warnings.iter().any(|w| w.contains("Balancing charge of 24316")));
        assert!(out.warnings.iter().any(|w| w.contains("beyond the 4-year horizon")));
    }

    #[test]
    fn test_validation_fails_before_any_schedule() {
        let mut p = base_params();
        p.years = 0;
        assert!(matches!(
            appraise_project(&p),
            Err(AppraisalError::InvalidInput { .. })
        ));

        let mut p = base_params();
        p.tax_rate = dec!(-0.1);
        assert!(appraise_project(&p).is_err());

        let mut p = base_params();
        p.inflation.sales = dec!(-2);
        assert!(appraise_project(&p).is_err());
    }

    #[test]
    fn test_unbounded_tax_lag_is_rejected() {
        for policy in [TaxBeyondHorizon::Drop, TaxBeyondHorizon::Extend] {
            let mut p = base_params();
            p.tax_lag_years = u32::MAX;
            p.tax_beyond_horizon = policy;
            assert!(matches!(
                appraise_project(&p),
                Err(AppraisalError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_runaway_sales_growth_is_an_error() {
        let mut p = base_params();
        p.years = 50;
        p.base_sales = dec!(1000000);
        p.sales_growth = dec!(2);
        assert!(matches!(
            appraise_project(&p),
            Err(AppraisalError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_profile_override_length_checked() {
        let mut p = base_params();
        p.profile_override = Some(build_profile(3, dec!(1), dec!(0), dec!(0.5), dec!(0)).unwrap());
        assert!(matches!(
            appraise_project(&p),
            Err(AppraisalError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_profile_override_drives_sales() {
        let mut p = base_params();
        let mut edited = build_profile(4, dec!(400000), dec!(0.03), dec!(0.55), dec!(80000)).unwrap();
        edited.years[3].sales = dec!(1000000);
        p.profile_override = Some(edited);
        let out = appraise_project(&p).unwrap();
        assert_eq!(out.result.cash_flows.rows[4].sales, dec!(1000000));
        assert_eq!(out.assumptions["profile_source"], "override");
    }

    #[test]
    fn test_real_run_deflates_money_rate() {
        let mut p = base_params();
        p.discount_rate = dec!(0.155);
        p.general_inflation = Some(dec!(0.05));
        let out = appraise_project(&p).unwrap();
        assert_eq!(out.result.effective_discount_rate, dec!(0.10));
    }

    #[test]
    fn test_nominal_run_increases_sales() {
        let mut p = base_params();
        p.pricing = PricingBasis::Nominal;
        p.inflation.sales = dec!(0.04);
        let out = appraise_project(&p).unwrap();
        let real = appraise_project(&base_params()).unwrap();
        assert!(out.result.cash_flows.rows[2].sales > real.result.cash_flows.rows[2].sales);
        assert_eq!(out.result.cash_flows.rows[1].sales, real.result.cash_flows.rows[1].sales);
    }

    #[test]
    fn test_loss_making_project_warnings() {
        let mut p = base_params();
        p.base_sales = dec!(100000);
        let out = appraise_project(&p).unwrap();
        assert!(out.result.appraisal.npv < Decimal::ZERO);
        assert!(out.warnings.iter().any(|w| w.contains("not relieved")));
        assert!(out.warnings.iter().any(|w| w.contains("Negative NPV")));
        assert_eq!(
            out.result.appraisal.payback_years.reason(),
            Some(UndefinedReason::NeverRecovered)
        );
    }

    #[test]
    fn test_parameters_deserialize_with_defaults() {
        let json = serde_json::json!({
            "years": 4,
            "capex": 500000,
            "residual_value": 50000,
            "base_sales": 400000,
            "variable_cost_rate": 0.55,
            "fixed_cost": 80000,
            "wda_rate": 0.18,
            "tax_rate": 0.25,
            "discount_rate": 0.10
        });
        let p: ProjectParameters = serde_json::from_value(json).unwrap();
        assert_eq!(p.tax_lag_years, 1);
        assert!(p.cap_disposal_to_cost);
        assert_eq!(p.pricing, PricingBasis::Real);
        assert_eq!(p.sales_growth, Decimal::ZERO);
        assert_eq!(p.variable_cost_rate, dec!(0.55));
    }
}
