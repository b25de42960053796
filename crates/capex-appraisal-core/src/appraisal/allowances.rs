use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppraisalError;
use crate::types::{Money, Rate};
use crate::CapexResult;

use super::projection::{validate_fraction, validate_years};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One year of the reducing-balance pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceYear {
    /// Year index, 1-based
    pub year: u32,
    /// Tax written-down value brought forward
    pub opening_wdv: Money,
    /// Writing-down allowance (zero in the disposal year)
    pub allowance: Money,
    /// Tax written-down value carried forward (zero once the pool closes)
    pub closing_wdv: Money,
    /// Final-year adjustment: positive = balancing allowance,
    /// negative = balancing charge
    pub balancing_adjustment: Money,
}

impl AllowanceYear {
    /// Amount deducted from operating profit for tax in this year.
    pub fn deduction(&self) -> Money {
        self.allowance + self.balancing_adjustment
    }
}

/// Reducing-balance capital allowance schedule, years 1..N.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalAllowanceSchedule {
    pub rows: Vec<AllowanceYear>,
    /// Disposal proceeds credited to the pool (after any cap to cost)
    pub disposal_for_pool: Money,
}

impl CapitalAllowanceSchedule {
    pub fn years(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Per-year tax deductions (allowance or balancing adjustment), years 1..N.
    pub fn deductions(&self) -> Vec<Money> {
        self.rows.iter().map(AllowanceYear::deduction).collect()
    }

    /// Written-down value left in the pool when the asset is disposed of.
    pub fn wdv_before_disposal(&self) -> Money {
        self.rows
            .last()
            .map(|r| r.opening_wdv)
            .unwrap_or(Decimal::ZERO)
    }

    /// Final-year balancing adjustment.
    pub fn balancing_adjustment(&self) -> Money {
        self.rows
            .last()
            .map(|r| r.balancing_adjustment)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn is_balancing_charge(&self) -> bool {
        self.balancing_adjustment() < Decimal::ZERO
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the reducing-balance schedule.
///
/// Years 1..N-1 each receive `wda_rate` × opening value. Year N receives no
/// ordinary allowance; the pool is closed against the disposal proceeds,
/// capped at original cost when `cap_to_cost` is set.
pub fn allowance_schedule(
    capex: Money,
    wda_rate: Rate,
    years: u32,
    disposal: Money,
    cap_to_cost: bool,
) -> CapexResult<CapitalAllowanceSchedule> {
    if capex < Decimal::ZERO {
        return Err(AppraisalError::invalid("capex", "Capital cost cannot be negative"));
    }
    validate_fraction("wda_rate", wda_rate)?;
    validate_years(years)?;

    tracing::debug!(%capex, %wda_rate, years, %disposal, cap_to_cost, "building capital allowance schedule");

    let mut rows = Vec::with_capacity(years as usize);
    let mut wdv = capex;

    for year in 1..years {
        let opening = wdv;
        let allowance = opening * wda_rate;
        wdv = opening - allowance;
        rows.push(AllowanceYear {
            year,
            opening_wdv: opening,
            allowance,
            closing_wdv: wdv,
            balancing_adjustment: Decimal::ZERO,
        });
    }

    let disposal_for_pool = if cap_to_cost {
        disposal.min(capex)
    } else {
        disposal
    };

    rows.push(AllowanceYear {
        year: years,
        opening_wdv: wdv,
        allowance: Decimal::ZERO,
        closing_wdv: Decimal::ZERO,
        balancing_adjustment: wdv - disposal_for_pool,
    });

    Ok(CapitalAllowanceSchedule {
        rows,
        disposal_for_pool,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
