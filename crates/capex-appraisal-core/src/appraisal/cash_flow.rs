use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppraisalError;
use crate::types::Money;
use crate::CapexResult;

use super::allowances::CapitalAllowanceSchedule;
use super::projection::OperatingLines;
use super::tax::TaxSchedule;
use super::working_capital::WorkingCapitalSchedule;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One year of the consolidated pro forma. Outflows are negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    pub year: u32,
    pub sales: Money,
    pub variable_cost: Money,
    pub fixed_cost: Money,
    /// Sales - variable cost - fixed cost
    pub operating_profit: Money,
    /// Allowance or balancing adjustment (memo only, not a cash item)
    pub capital_allowance: Money,
    pub taxable_profit: Money,
    /// Cash tax paid this year (negative)
    pub tax: Money,
    /// Cash effect of the working capital movement
    pub working_capital: Money,
    /// Capital expenditure (negative, year 0 only)
    pub capex: Money,
    /// Residual / disposal proceeds (final trading year only)
    pub residual: Money,
    pub net_cash_flow: Money,
    /// Straight-line accounting depreciation (years 1..N)
    pub accounting_depreciation: Money,
    /// Operating profit - depreciation - tax accrued for the year
    pub accounting_profit: Money,
}

impl CashFlowRow {
    fn empty(year: u32) -> Self {
        CashFlowRow {
            year,
            sales: Decimal::ZERO,
            variable_cost: Decimal::ZERO,
            fixed_cost: Decimal::ZERO,
            operating_profit: Decimal::ZERO,
            capital_allowance: Decimal::ZERO,
            taxable_profit: Decimal::ZERO,
            tax: Decimal::ZERO,
            working_capital: Decimal::ZERO,
            capex: Decimal::ZERO,
            residual: Decimal::ZERO,
            net_cash_flow: Decimal::ZERO,
            accounting_depreciation: Decimal::ZERO,
            accounting_profit: Decimal::ZERO,
        }
    }
}

/// Year-indexed (0..N, or beyond N when late tax is kept) cash flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSchedule {
    /// Trading years N
    pub project_years: u32,
    pub initial_investment: Money,
    pub residual_value: Money,
    pub rows: Vec<CashFlowRow>,
}

impl CashFlowSchedule {
    pub fn net_cash_flows(&self) -> Vec<Money> {
        self.rows.iter().map(|r| r.net_cash_flow).collect()
    }

    /// Accounting profit for trading years 1..N.
    pub fn accounting_profits(&self) -> Vec<Money> {
        self.rows
            .iter()
            .filter(|r| r.year >= 1 && r.year <= self.project_years)
            .map(|r| r.accounting_profit)
            .collect()
    }

    /// Wrap a bare net-cash-flow series (year 0 first).
    ///
    /// The initial investment is the year-0 outflow. Accounting profit is
    /// approximated as each later flow less straight-line depreciation of
    /// that investment with no residual value.
    pub fn from_net_cash_flows(flows: &[Money]) -> CapexResult<Self> {
        if flows.len() < 2 {
            return Err(AppraisalError::InsufficientData(
                "A cash-flow schedule needs year 0 and at least one later year".into(),
            ));
        }

        let project_years = (flows.len() - 1) as u32;
        let initial_investment = (-flows[0]).max(Decimal::ZERO);
        let depreciation = initial_investment / Decimal::from(project_years);

        let rows = flows
            .iter()
            .enumerate()
            .map(|(t, cf)| {
                let mut row = CashFlowRow::empty(t as u32);
                row.net_cash_flow = *cf;
                if t > 0 {
                    row.accounting_depreciation = depreciation;
                    row.accounting_profit = cf - depreciation;
                }
                row
            })
            .collect();

        Ok(CashFlowSchedule {
            project_years,
            initial_investment,
            residual_value: Decimal::ZERO,
            rows,
        })
    }
}

/// Everything the consolidator merges.
#[derive(Debug, Clone)]
pub struct CashFlowInputs<'a> {
    pub lines: &'a OperatingLines,
    pub allowances: &'a CapitalAllowanceSchedule,
    pub tax: &'a TaxSchedule,
    pub working_capital: &'a WorkingCapitalSchedule,
    pub capex: Money,
    pub residual: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Merge operating lines, lagged tax, working capital, capex and residual
/// into one net-cash-flow schedule.
///
/// Capital allowances only reduce the tax line; they are carried on each
/// row as a memo and never subtracted from cash.
pub fn cash_flow_schedule(inputs: &CashFlowInputs<'_>) -> CapexResult<CashFlowSchedule> {
    let lines = inputs.lines;
    let n = lines.sales.len();
    check_len("variable costs", n, lines.variable_costs.len())?;
    check_len("fixed costs", n, lines.fixed_costs.len())?;
    check_len("operating profit", n, lines.operating_profit.len())?;
    check_len("capital allowances", n, inputs.allowances.rows.len())?;
    check_len("tax rows", n, inputs.tax.rows.len())?;
    check_len("working capital", n + 1, inputs.working_capital.rows.len())?;
    if n == 0 {
        return Err(AppraisalError::InsufficientData(
            "Cash-flow schedule requires at least one trading year".into(),
        ));
    }

    let project_years = n as u32;
    let last_year = inputs.tax.last_year().max(project_years);
    let depreciation = (inputs.capex - inputs.residual) / Decimal::from(project_years);

    let mut rows = Vec::with_capacity(last_year as usize + 1);

    let mut opening = CashFlowRow::empty(0);
    opening.capex = -inputs.capex;
    opening.working_capital = inputs.working_capital.cash_flow_at(0);
    opening.tax = -inputs.tax.cash_tax_at(0);
    opening.net_cash_flow = opening.capex + opening.working_capital + opening.tax;
    rows.push(opening);

    for year in 1..=last_year {
        let mut row = CashFlowRow::empty(year);
        row.tax = -inputs.tax.cash_tax_at(year);

        if year <= project_years {
            let i = (year - 1) as usize;
            row.sales = lines.sales[i];
            row.variable_cost = lines.variable_costs[i];
            row.fixed_cost = lines.fixed_costs[i];
            row.operating_profit = lines.operating_profit[i];
            row.capital_allowance = inputs.tax.rows[i].capital_allowance;
            row.taxable_profit = inputs.tax.rows[i].taxable_profit;
            row.working_capital = inputs.working_capital.cash_flow_at(year);
            if year == project_years {
                row.residual = inputs.residual;
            }
            row.accounting_depreciation = depreciation;
            row.accounting_profit =
                row.operating_profit - depreciation - inputs.tax.rows[i].tax_liability;
        }

        row.net_cash_flow =
            row.operating_profit + row.working_capital + row.tax + row.capex + row.residual;
        rows.push(row);
    }

    tracing::debug!(
        project_years,
        last_year,
        "consolidated cash-flow schedule"
    );

    Ok(CashFlowSchedule {
        project_years,
        initial_investment: inputs.capex,
        residual_value: inputs.residual,
        rows,
    })
}

fn check_len(series: &str, expected: usize, actual: usize) -> CapexResult<()> {
    if expected != actual {
        return Err(AppraisalError::LengthMismatch {
            series: series.into(),
            expected,
            actual,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
