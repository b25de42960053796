use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppraisalError;
use crate::types::{Money, Rate};
use crate::CapexResult;

use super::allowances::CapitalAllowanceSchedule;
use super::projection::{validate_fraction, validate_tax_lag};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What happens to tax whose payment date falls after the final year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBeyondHorizon {
    /// Payments after year N are never made within the schedule.
    #[default]
    Drop,
    /// The cash-tax series runs on to year N + lag.
    Extend,
}

/// Tax computation for one trading year (1..N).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxYear {
    pub year: u32,
    /// Operating profit before capital allowances
    pub operating_profit: Money,
    /// Writing-down allowance or balancing adjustment deducted
    pub capital_allowance: Money,
    /// operating_profit - capital_allowance (may be negative)
    pub taxable_profit: Money,
    /// max(taxable_profit, 0) × rate; losses are not relieved
    pub tax_liability: Money,
    /// Year in which the liability is paid
    pub payment_year: u32,
}

/// A liability whose payment year lies beyond the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedPayment {
    pub origin_year: u32,
    pub payment_year: u32,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSchedule {
    pub tax_rate: Rate,
    pub lag: u32,
    pub beyond_horizon: TaxBeyondHorizon,
    pub rows: Vec<TaxYear>,
    /// Cash tax paid in each year, indexed from year 0 (positive = payment)
    pub cash_tax: Vec<Money>,
    pub dropped: Vec<DroppedPayment>,
}

impl TaxSchedule {
    /// Cash tax paid at `year`, zero outside the schedule.
    pub fn cash_tax_at(&self, year: u32) -> Money {
        self.cash_tax
            .get(year as usize)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Last year with a cash-tax entry.
    pub fn last_year(&self) -> u32 {
        self.cash_tax.len().saturating_sub(1) as u32
    }

    pub fn loss_years(&self) -> Vec<u32> {
        self.rows
            .iter()
            .filter(|r| r.taxable_profit < Decimal::ZERO)
            .map(|r| r.year)
            .collect()
    }

    pub fn total_liability(&self) -> Money {
        self.rows.iter().map(|r| r.tax_liability).sum()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Tax schedule with late payments dropped.
pub fn tax_schedule(
    operating_profit: &[Money],
    allowances: &CapitalAllowanceSchedule,
    tax_rate: Rate,
    lag: u32,
) -> CapexResult<TaxSchedule> {
    tax_schedule_with_policy(operating_profit, allowances, tax_rate, lag, TaxBeyondHorizon::Drop)
}

/// Taxable profit per year and the lagged cash-tax series.
///
/// A negative balancing adjustment (charge) is subtracted like any other
/// deduction and so increases taxable profit.
pub fn tax_schedule_with_policy(
    operating_profit: &[Money],
    allowances: &CapitalAllowanceSchedule,
    tax_rate: Rate,
    lag: u32,
    beyond_horizon: TaxBeyondHorizon,
) -> CapexResult<TaxSchedule> {
    validate_fraction("tax_rate", tax_rate)?;
    validate_tax_lag(lag)?;
    if operating_profit.len() != allowances.rows.len() {
        return Err(AppraisalError::LengthMismatch {
            series: "operating profit".into(),
            expected: allowances.rows.len(),
            actual: operating_profit.len(),
        });
    }
    if operating_profit.is_empty() {
        return Err(AppraisalError::InsufficientData(
            "Tax schedule requires at least one trading year".into(),
        ));
    }

    let years = operating_profit.len() as u32;
    let last_year = match beyond_horizon {
        TaxBeyondHorizon::Drop => years,
        TaxBeyondHorizon::Extend => years.checked_add(lag).ok_or_else(|| {
            AppraisalError::invalid("tax_lag_years", "Payment year out of range")
        })?,
    };

    let mut cash_tax = vec![Decimal::ZERO; last_year as usize + 1];
    let mut dropped = Vec::new();
    let mut rows = Vec::with_capacity(years as usize);

    for (profit, allowance) in operating_profit.iter().zip(&allowances.rows) {
        let year = allowance.year;
        let capital_allowance = allowance.deduction();
        let taxable_profit = profit - capital_allowance;
        let tax_liability = taxable_profit.max(Decimal::ZERO) * tax_rate;
        let payment_year = year.checked_add(lag).ok_or_else(|| {
            AppraisalError::invalid("tax_lag_years", "Payment year out of range")
        })?;

        if payment_year <= last_year {
            cash_tax[payment_year as usize] += tax_liability;
        } else if !tax_liability.is_zero() {
            tracing::debug!(year, payment_year, %tax_liability, "tax payment falls beyond horizon");
            dropped.push(DroppedPayment {
                origin_year: year,
                payment_year,
                amount: tax_liability,
            });
        }

        rows.push(TaxYear {
            year,
            operating_profit: *profit,
            capital_allowance,
            taxable_profit,
            tax_liability,
            payment_year,
        });
    }

    Ok(TaxSchedule {
        tax_rate,
        lag,
        beyond_horizon,
        rows,
        cash_tax,
        dropped,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appraisal::allowances::allowance_schedule;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn pool() -> CapitalAllowanceSchedule {
        // Deductions: 250 in year 1, then 750 - 600 = 150 on disposal
        allowance_schedule(dec!(1000), dec!(0.25), 2, dec!(600), true).unwrap()
    }

    #[test]
    fn test_taxable_profit_subtracts_allowance() {
        let t = tax_schedule(&[dec!(1000), dec!(1000)], &pool(), dec!(0.25), 0).unwrap();
        assert_eq!(t.rows[0].taxable_profit, dec!(750));
        assert_eq!(t.rows[1].capital_allowance, dec!(150));
        assert_eq!(t.rows[1].taxable_profit, dec!(850));
    }

    #[test]
    fn test_zero_lag_pays_in_same_year() {
        let t = tax_schedule(&[dec!(1000), dec!(1000)], &pool(), dec!(0.20), 0).unwrap();
        assert_eq!(t.cash_tax, vec![dec!(0), dec!(150), dec!(170)]);
        assert!(t.dropped.is_empty());
    }

    #[test]
    fn test_one_year_lag_drops_final_year() {
        let t = tax_schedule(&[dec!(1000), dec!(1000)], &pool(), dec!(0.20), 1).unwrap();
        assert_eq!(t.cash_tax, vec![dec!(0), dec!(0), dec!(150)]);
        assert_eq!(
            t.dropped,
            vec![DroppedPayment {
                origin_year: 2,
                payment_year: 3,
                amount: dec!(170),
            }]
        );
    }

    #[test]
    fn test_extend_policy_keeps_late_payment() {
        let t = tax_schedule_with_policy(
            &[dec!(1000), dec!(1000)],
            &pool(),
            dec!(0.20),
            1,
            TaxBeyondHorizon::Extend,
        )
        .unwrap();
        assert_eq!(t.cash_tax, vec![dec!(0), dec!(0), dec!(150), dec!(170)]);
        assert_eq!(t.last_year(), 3);
        assert!(t.dropped.is_empty());
    }

    #[test]
    fn test_losses_are_floored_not_relieved() {
        let t = tax_schedule(&[dec!(100), dec!(1000)], &pool(), dec!(0.30), 0).unwrap();
        assert_eq!(t.rows[0].taxable_profit, dec!(-150));
        assert_eq!(t.rows[0].tax_liability, Decimal::ZERO);
        assert_eq!(t.loss_years(), vec![1]);
        // Year 2 is taxed in full; the year-1 loss is not carried forward
        assert_eq!(t.rows[1].tax_liability, dec!(255));
    }

    #[test]
    fn test_balancing_charge_increases_taxable_profit() {
        let charge = allowance_schedule(dec!(1000), dec!(0.5), 2, dec!(800), true).unwrap();
        // WDV 500, disposal 800 → charge of 300
        let t = tax_schedule(&[dec!(0), dec!(100)], &charge, dec!(0.25), 0).unwrap();
        assert_eq!(t.rows[1].taxable_profit, dec!(400));
        assert_eq!(t.cash_tax_at(2), dec!(100));
    }

    #[test]
    fn test_lag_beyond_maximum_is_rejected() {
        for policy in [TaxBeyondHorizon::Drop, TaxBeyondHorizon::Extend] {
            let err = tax_schedule_with_policy(
                &[dec!(1000), dec!(1000)],
                &pool(),
                dec!(0.2),
                u32::MAX,
                policy,
            );
            assert!(matches!(err, Err(AppraisalError::InvalidInput { .. })), "{policy:?}");
        }
        let longest = tax_schedule_with_policy(
            &[dec!(1000), dec!(1000)],
            &pool(),
            dec!(0.2),
            50,
            TaxBeyondHorizon::Extend,
        )
        .unwrap();
        assert_eq!(longest.last_year(), 52);
        assert!(tax_schedule(&[dec!(1000), dec!(1000)], &pool(), dec!(0.2), 51).is_err());
    }

    #[test]
    fn test_validation() {
        assert!(tax_schedule(&[dec!(1)], &pool(), dec!(0.2), 0).is_err());
        assert!(tax_schedule(&[dec!(1), dec!(1)], &pool(), dec!(-0.2), 0).is_err());
    }
}
