use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AppraisalError;
use crate::time_value::compound_factor;
use crate::types::{Money, Rate, MAX_PROJECT_YEARS};
use crate::CapexResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One year of the operating profile. Amounts are in base-year (real)
/// terms until the nominal pricing pass is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingYear {
    /// Year index, 1-based
    pub year: u32,
    /// Sales revenue for the year
    pub sales: Money,
    /// Variable cost as a fraction of sales (0.55 = 55%)
    pub variable_cost_rate: Rate,
    /// Fixed operating cost for the year
    pub fixed_cost: Money,
}

/// Per-year operating assumptions. Either generated by [`build_profile`] or
/// supplied row by row by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyOperatingProfile {
    pub years: Vec<OperatingYear>,
}

impl YearlyOperatingProfile {
    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn sales(&self) -> Vec<Money> {
        self.years.iter().map(|y| y.sales).collect()
    }

    /// Variable cost amounts (sales × rate).
    pub fn variable_costs(&self) -> Vec<Money> {
        self.years
            .iter()
            .map(|y| y.sales * y.variable_cost_rate)
            .collect()
    }

    pub fn fixed_costs(&self) -> Vec<Money> {
        self.years.iter().map(|y| y.fixed_cost).collect()
    }
}

/// Whether cash flows are expressed in money (nominal) or real terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingBasis {
    /// Current prices; no inflation pass, discount rate taken as real.
    #[default]
    Real,
    /// Money prices; each cost line is inflated at its own rate.
    Nominal,
}

/// Specific inflation rates used by the nominal pricing pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InflationRates {
    #[serde(default)]
    pub sales: Rate,
    #[serde(default)]
    pub variable_cost: Rate,
    #[serde(default)]
    pub fixed_cost: Rate,
}

/// Sales and cost lines priced for the chosen basis, years 1..N.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingLines {
    pub sales: Vec<Money>,
    pub variable_costs: Vec<Money>,
    pub fixed_costs: Vec<Money>,
    /// Sales - variable - fixed, before capital allowances
    pub operating_profit: Vec<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate the default profile: sales grow geometrically from `base_sales`
/// in year 1, variable-cost rate and fixed cost are held flat.
pub fn build_profile(
    years: u32,
    base_sales: Money,
    growth: Rate,
    var_cost_rate: Rate,
    fixed_cost: Money,
) -> CapexResult<YearlyOperatingProfile> {
    validate_years(years)?;
    validate_rate_above_minus_one("sales_growth", growth)?;
    if base_sales < Decimal::ZERO {
        return Err(AppraisalError::invalid("base_sales", "Sales cannot be negative"));
    }
    validate_fraction("variable_cost_rate", var_cost_rate)?;
    if fixed_cost < Decimal::ZERO {
        return Err(AppraisalError::invalid("fixed_cost", "Fixed cost cannot be negative"));
    }

    let mut rows = Vec::with_capacity(years as usize);
    for t in 1..=years {
        let factor = compound_factor(growth, t - 1).ok_or_else(|| {
            AppraisalError::invalid("sales_growth", format!("Sales overflow in year {t}"))
        })?;
        let sales = base_sales.checked_mul(factor).ok_or_else(|| {
            AppraisalError::invalid("sales_growth", format!("Sales overflow in year {t}"))
        })?;
        rows.push(OperatingYear {
            year: t,
            sales,
            variable_cost_rate: var_cost_rate,
            fixed_cost,
        });
    }

    Ok(YearlyOperatingProfile { years: rows })
}

/// Compound a year-1-based series forward: value(t) = input(t) × (1+rate)^(t−1).
pub fn apply_inflation(series: &[Money], rate: Rate) -> CapexResult<Vec<Money>> {
    validate_rate_above_minus_one("inflation", rate)?;

    series
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let factor = compound_factor(rate, i as u32).ok_or_else(|| {
                AppraisalError::invalid("inflation", format!("Inflated value overflows in year {}", i + 1))
            })?;
            value.checked_mul(factor).ok_or_else(|| {
                AppraisalError::invalid("inflation", format!("Inflated value overflows in year {}", i + 1))
            })
        })
        .collect()
}

/// Check a caller-edited profile against the requested horizon.
pub fn validate_profile(profile: &YearlyOperatingProfile, years: u32) -> CapexResult<()> {
    validate_years(years)?;
    if profile.len() != years as usize {
        return Err(AppraisalError::LengthMismatch {
            series: "operating profile".into(),
            expected: years as usize,
            actual: profile.len(),
        });
    }

    for (i, row) in profile.years.iter().enumerate() {
        let expected_year = i as u32 + 1;
        if row.year != expected_year {
            return Err(AppraisalError::invalid(
                "profile.year",
                format!("Row {i} is labelled year {} but should be year {expected_year}", row.year),
            ));
        }
        if row.sales < Decimal::ZERO {
            return Err(AppraisalError::invalid(
                "profile.sales",
                format!("Sales cannot be negative (year {})", row.year),
            ));
        }
        validate_fraction("profile.variable_cost_rate", row.variable_cost_rate)?;
        if row.fixed_cost < Decimal::ZERO {
            return Err(AppraisalError::invalid(
                "profile.fixed_cost",
                format!("Fixed cost cannot be negative (year {})", row.year),
            ));
        }
    }

    Ok(())
}

/// Price the profile for the chosen basis. In nominal mode sales, the
/// variable cost amount and fixed cost are each inflated independently.
pub fn operating_lines(
    profile: &YearlyOperatingProfile,
    basis: PricingBasis,
    inflation: &InflationRates,
) -> CapexResult<OperatingLines> {
    let (sales, variable_costs, fixed_costs) = match basis {
        PricingBasis::Real => (profile.sales(), profile.variable_costs(), profile.fixed_costs()),
        PricingBasis::Nominal => (
            apply_inflation(&profile.sales(), inflation.sales)?,
            apply_inflation(&profile.variable_costs(), inflation.variable_cost)?,
            apply_inflation(&profile.fixed_costs(), inflation.fixed_cost)?,
        ),
    };

    let operating_profit = sales
        .iter()
        .zip(&variable_costs)
        .zip(&fixed_costs)
        .map(|((s, v), f)| s - v - f)
        .collect();

    Ok(OperatingLines {
        sales,
        variable_costs,
        fixed_costs,
        operating_profit,
    })
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

pub(crate) fn validate_years(years: u32) -> CapexResult<()> {
    if years < 1 || years > MAX_PROJECT_YEARS {
        return Err(AppraisalError::invalid(
            "years",
            format!("Project life must be between 1 and {MAX_PROJECT_YEARS} years"),
        ));
    }
    Ok(())
}

/// Tax may be paid at most `MAX_PROJECT_YEARS` after it is earned.
pub(crate) fn validate_tax_lag(lag: u32) -> CapexResult<()> {
    if lag > MAX_PROJECT_YEARS {
        return Err(AppraisalError::invalid(
            "tax_lag_years",
            format!("Tax lag cannot exceed {MAX_PROJECT_YEARS} years"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_fraction(field: &str, value: Rate) -> CapexResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(AppraisalError::invalid(field, "Must be between 0 and 1"));
    }
    Ok(())
}

pub(crate) fn validate_rate_above_minus_one(field: &str, value: Rate) -> CapexResult<()> {
    if value < dec!(-1) {
        return Err(AppraisalError::invalid(field, "Rate cannot be below -100%"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
