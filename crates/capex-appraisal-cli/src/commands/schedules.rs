use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use capex_appraisal_core::appraisal::{
    allowance_schedule, appraise_with, working_capital_schedule_with_timing, AppraisalOptions,
    CashFlowSchedule,
};
use capex_appraisal_core::time_value::DEFAULT_IRR_GUESS;

use super::appraise::{ArrBasisArg, TimingArg};

/// Arguments for the capital allowance schedule
#[derive(Args)]
pub struct AllowancesArgs {
    /// Capital cost entering the pool
    #[arg(long)]
    pub capex: Decimal,

    /// Writing-down allowance rate (0.18 = 18%)
    #[arg(long)]
    pub wda_rate: Decimal,

    /// Years of ownership; the asset is disposed of at the end of the last
    #[arg(long)]
    pub years: u32,

    /// Disposal proceeds
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub disposal: Decimal,

    /// Do not cap disposal proceeds at original cost
    #[arg(long)]
    pub no_cap_to_cost: bool,
}

pub fn run_allowances(args: AllowancesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule = allowance_schedule(
        args.capex,
        args.wda_rate,
        args.years,
        args.disposal,
        !args.no_cap_to_cost,
    )?;
    Ok(serde_json::to_value(schedule)?)
}

/// Arguments for the working capital schedule
#[derive(Args)]
pub struct WorkingCapitalArgs {
    /// Sales for years 1..N (comma-separated, e.g. "400000,412000,424360")
    #[arg(long, value_delimiter = ',', required = true)]
    pub sales: Vec<Decimal>,

    /// Working capital as a fraction of sales
    #[arg(long)]
    pub pct: Decimal,

    #[arg(long, value_enum, default_value_t = TimingArg::StartOfYear)]
    pub timing: TimingArg,
}

pub fn run_working_capital(args: WorkingCapitalArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule = working_capital_schedule_with_timing(&args.sales, args.pct, args.timing.into())?;
    Ok(serde_json::to_value(schedule)?)
}

/// Arguments for appraising a bare cash-flow series
#[derive(Args)]
pub struct MetricsArgs {
    /// Net cash flows from year 0 (comma-separated, e.g. "-1000,400,400,400")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,

    /// Discount rate (0.10 = 10%)
    #[arg(long)]
    pub discount_rate: Decimal,

    /// ARR denominator
    #[arg(long, value_enum, default_value_t = ArrBasisArg::Initial)]
    pub arr_basis: ArrBasisArg,

    /// Starting point for the IRR solver
    #[arg(long, default_value_t = DEFAULT_IRR_GUESS, allow_hyphen_values = true)]
    pub irr_guess: Decimal,
}

pub fn run_metrics(args: MetricsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule = CashFlowSchedule::from_net_cash_flows(&args.cash_flows)?;
    let options = AppraisalOptions {
        discount_rate: args.discount_rate,
        arr_basis: args.arr_basis.into(),
        irr_guess: args.irr_guess,
    };
    let result = appraise_with(&schedule, &options)?;
    Ok(serde_json::to_value(result)?)
}
