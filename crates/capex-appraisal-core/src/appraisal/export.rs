use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

use super::model::ProjectAppraisal;

/// Flat per-year row combining the pro forma with its discounting detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub year: u32,
    pub sales: Money,
    pub variable_cost: Money,
    pub fixed_cost: Money,
    pub operating_profit: Money,
    pub capital_allowance: Money,
    pub taxable_profit: Money,
    pub tax: Money,
    pub working_capital: Money,
    pub capex: Money,
    pub residual: Money,
    pub net_cash_flow: Money,
    pub discount_factor: Decimal,
    pub present_value: Money,
    pub cumulative_cash_flow: Money,
    pub cumulative_present_value: Money,
}

/// One export row per schedule year.
pub fn export_rows(appraisal: &ProjectAppraisal) -> Vec<ExportRow> {
    appraisal
        .cash_flows
        .rows
        .iter()
        .zip(&appraisal.appraisal.years)
        .map(|(cf, d)| ExportRow {
            year: cf.year,
            sales: cf.sales,
            variable_cost: cf.variable_cost,
            fixed_cost: cf.fixed_cost,
            operating_profit: cf.operating_profit,
            capital_allowance: cf.capital_allowance,
            taxable_profit: cf.taxable_profit,
            tax: cf.tax,
            working_capital: cf.working_capital,
            capex: cf.capex,
            residual: cf.residual,
            net_cash_flow: cf.net_cash_flow,
            discount_factor: d.discount_factor,
            present_value: d.present_value,
            cumulative_cash_flow: d.cumulative_cash_flow,
            cumulative_present_value: d.cumulative_present_value,
        })
        .collect()
}

/// Render the year table as CSV with a header row.
#[cfg(feature = "export")]
pub fn to_csv(appraisal: &ProjectAppraisal) -> crate::CapexResult<String> {
    use crate::error::AppraisalError;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in export_rows(appraisal) {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppraisalError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppraisalError::Export(e.to_string()))
}
