use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::fs;

use capex_appraisal_core::appraisal::{
    self, ArrBasis, InflationRates, PricingBasis, ProjectParameters, TaxBeyondHorizon,
    WorkingCapitalTiming,
};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PricingArg {
    Real,
    Nominal,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TimingArg {
    StartOfYear,
    SameYear,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LateTaxArg {
    Drop,
    Extend,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ArrBasisArg {
    Initial,
    Average,
}

impl From<TimingArg> for WorkingCapitalTiming {
    fn from(arg: TimingArg) -> Self {
        match arg {
            TimingArg::StartOfYear => WorkingCapitalTiming::StartOfYear,
            TimingArg::SameYear => WorkingCapitalTiming::SameYear,
        }
    }
}

impl From<ArrBasisArg> for ArrBasis {
    fn from(arg: ArrBasisArg) -> Self {
        match arg {
            ArrBasisArg::Initial => ArrBasis::InitialInvestment,
            ArrBasisArg::Average => ArrBasis::AverageInvestment,
        }
    }
}

/// Project parameters. Flags default to the CBS Co base case.
#[derive(Args)]
pub struct AppraiseArgs {
    /// Path to a JSON or YAML parameter file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Project life in years
    #[arg(long, default_value_t = 4)]
    pub years: u32,

    /// Initial capital cost
    #[arg(long, default_value_t = dec!(500000))]
    pub capex: Decimal,

    /// Residual (disposal) value at the end of the project
    #[arg(long, default_value_t = dec!(50000))]
    pub residual: Decimal,

    /// Year 1 sales
    #[arg(long, default_value_t = dec!(400000))]
    pub sales: Decimal,

    /// Annual sales growth (0.03 = 3%)
    #[arg(long, default_value_t = dec!(0.03), allow_hyphen_values = true)]
    pub growth: Decimal,

    /// Variable cost as a fraction of sales
    #[arg(long, default_value_t = dec!(0.55))]
    pub variable_cost_rate: Decimal,

    /// Fixed cost per year
    #[arg(long, default_value_t = dec!(80000))]
    pub fixed_cost: Decimal,

    /// Writing-down allowance rate
    #[arg(long, default_value_t = dec!(0.18))]
    pub wda_rate: Decimal,

    /// Corporation tax rate
    #[arg(long, default_value_t = dec!(0.25))]
    pub tax_rate: Decimal,

    /// Discount rate (real unless --pricing nominal)
    #[arg(long, default_value_t = dec!(0.10))]
    pub discount_rate: Decimal,

    /// Working capital as a fraction of sales
    #[arg(long, default_value_t = dec!(0.10))]
    pub wc_pct: Decimal,

    /// Years between earning profit and paying its tax
    #[arg(long, default_value_t = 1)]
    pub tax_lag: u32,

    /// Do not cap disposal proceeds at original cost
    #[arg(long)]
    pub no_cap_to_cost: bool,

    #[arg(long, value_enum, default_value_t = PricingArg::Real)]
    pub pricing: PricingArg,

    /// Sales inflation (nominal pricing)
    #[arg(long, default_value_t = Decimal::ZERO, allow_hyphen_values = true)]
    pub sales_inflation: Decimal,

    /// Variable cost inflation (nominal pricing)
    #[arg(long, default_value_t = Decimal::ZERO, allow_hyphen_values = true)]
    pub variable_cost_inflation: Decimal,

    /// Fixed cost inflation (nominal pricing)
    #[arg(long, default_value_t = Decimal::ZERO, allow_hyphen_values = true)]
    pub fixed_cost_inflation: Decimal,

    /// General inflation; deflates --discount-rate to a real rate
    #[arg(long, allow_hyphen_values = true)]
    pub general_inflation: Option<Decimal>,

    #[arg(long, value_enum, default_value_t = TimingArg::StartOfYear)]
    pub wc_timing: TimingArg,

    /// Treatment of tax falling due after the final year
    #[arg(long, value_enum, default_value_t = LateTaxArg::Drop)]
    pub late_tax: LateTaxArg,

    #[arg(long, value_enum, default_value_t = ArrBasisArg::Initial)]
    pub arr_basis: ArrBasisArg,
}

impl AppraiseArgs {
    fn to_parameters(&self) -> ProjectParameters {
        ProjectParameters {
            years: self.years,
            capex: self.capex,
            residual_value: self.residual,
            base_sales: self.sales,
            sales_growth: self.growth,
            variable_cost_rate: self.variable_cost_rate,
            fixed_cost: self.fixed_cost,
            wda_rate: self.wda_rate,
            tax_rate: self.tax_rate,
            discount_rate: self.discount_rate,
            working_capital_pct: self.wc_pct,
            tax_lag_years: self.tax_lag,
            cap_disposal_to_cost: !self.no_cap_to_cost,
            pricing: match self.pricing {
                PricingArg::Real => PricingBasis::Real,
                PricingArg::Nominal => PricingBasis::Nominal,
            },
            inflation: InflationRates {
                sales: self.sales_inflation,
                variable_cost: self.variable_cost_inflation,
                fixed_cost: self.fixed_cost_inflation,
            },
            general_inflation: self.general_inflation,
            working_capital_timing: self.wc_timing.into(),
            tax_beyond_horizon: match self.late_tax {
                LateTaxArg::Drop => TaxBeyondHorizon::Drop,
                LateTaxArg::Extend => TaxBeyondHorizon::Extend,
            },
            arr_basis: self.arr_basis.into(),
            profile_override: None,
        }
    }
}

/// Parameters from `--input`, piped stdin, or the flags, in that order.
fn resolve_parameters(args: &AppraiseArgs) -> Result<ProjectParameters, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return input::file::read_input(path);
    }
    if let Some(data) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    Ok(args.to_parameters())
}

pub fn run_appraise(args: AppraiseArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = resolve_parameters(&args)?;
    tracing::debug!(years = params.years, capex = %params.capex, "appraising project");
    let result = appraisal::appraise_project(&params)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the CSV export
#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub params: AppraiseArgs,

    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub out: Option<String>,
}

pub fn run_export(args: ExportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = resolve_parameters(&args.params)?;
    let run = appraisal::appraise_project(&params)?;
    let text = appraisal::to_csv(&run.result)?;

    match args.out {
        Some(path) => {
            fs::write(&path, &text).map_err(|e| format!("Failed to write '{path}': {e}"))?;
            Ok(serde_json::json!({
                "path": path,
                "rows": run.result.cash_flows.rows.len(),
                "npv": run.result.appraisal.npv,
            }))
        }
        None => {
            print!("{text}");
            Ok(Value::Null)
        }
    }
}
