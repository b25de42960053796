use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppraisalError;
use crate::types::{Money, Rate};
use crate::CapexResult;

use super::projection::validate_fraction;

/// When the working capital needed for a trading year is put in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingCapitalTiming {
    /// The balance for year t+1 is funded at the end of year t; the full
    /// requirement is released at the end of the final year.
    #[default]
    StartOfYear,
    /// The balance tracks the current year's sales; year 0 pre-funds year 1
    /// and the final year releases the balance then held.
    SameYear,
}

/// One row of the working capital schedule, years 0..N.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingCapitalYear {
    pub year: u32,
    /// pct × sales for the year (zero for year 0)
    pub required: Money,
    /// Increase in working capital tied up (negative = release)
    pub movement: Money,
    /// Working capital held after this year's movement
    pub balance: Money,
}

impl WorkingCapitalYear {
    /// Cash effect of the movement: an increase is an outflow.
    pub fn cash_flow(&self) -> Money {
        -self.movement
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingCapitalSchedule {
    pub timing: WorkingCapitalTiming,
    pub rows: Vec<WorkingCapitalYear>,
}

impl WorkingCapitalSchedule {
    /// Movements indexed 0..N.
    pub fn movements(&self) -> Vec<Money> {
        self.rows.iter().map(|r| r.movement).collect()
    }

    /// Cash effect at `year`, zero outside the schedule.
    pub fn cash_flow_at(&self, year: u32) -> Money {
        self.rows
            .get(year as usize)
            .map(WorkingCapitalYear::cash_flow)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Working capital movements under the default start-of-year timing.
pub fn working_capital_schedule(sales: &[Money], pct: Rate) -> CapexResult<WorkingCapitalSchedule> {
    working_capital_schedule_with_timing(sales, pct, WorkingCapitalTiming::StartOfYear)
}

/// Working capital movements for `sales` (years 1..N) at `pct` of sales.
///
/// Movement 0 always funds the year-1 requirement and the movements over
/// 0..N always sum to zero.
pub fn working_capital_schedule_with_timing(
    sales: &[Money],
    pct: Rate,
    timing: WorkingCapitalTiming,
) -> CapexResult<WorkingCapitalSchedule> {
    if sales.is_empty() {
        return Err(AppraisalError::InsufficientData(
            "Working capital requires at least one year of sales".into(),
        ));
    }
    validate_fraction("working_capital_pct", pct)?;

    let n = sales.len();
    // required[0] is unused padding so that required[t] is year t
    let required: Vec<Money> = std::iter::once(Decimal::ZERO)
        .chain(sales.iter().map(|s| s * pct))
        .collect();

    let mut movements = Vec::with_capacity(n + 1);
    movements.push(required[1]);
    match timing {
        WorkingCapitalTiming::StartOfYear => {
            for t in 1..n {
                movements.push(required[t + 1] - required[t]);
            }
            movements.push(-required[n]);
        }
        WorkingCapitalTiming::SameYear => {
            // The year-0 funding stands in for required(0).
            for t in 1..n {
                let previous = if t == 1 { required[1] } else { required[t - 1] };
                movements.push(required[t] - previous);
            }
            let held = if n == 1 { required[1] } else { required[n - 1] };
            movements.push(-held);
        }
    }

    let mut balance = Decimal::ZERO;
    let rows = movements
        .into_iter()
        .enumerate()
        .map(|(t, movement)| {
            balance += movement;
            WorkingCapitalYear {
                year: t as u32,
                required: required[t],
                movement,
                balance,
            }
        })
        .collect();

    Ok(WorkingCapitalSchedule { timing, rows })
}
