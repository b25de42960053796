use capex_appraisal_core::appraisal::{
    allowance_schedule, appraise, appraise_project, working_capital_schedule_with_timing,
    ArrBasis, CashFlowSchedule, InflationRates, PricingBasis, ProjectParameters,
    TaxBeyondHorizon, WorkingCapitalTiming,
};
use capex_appraisal_core::time_value;
use capex_appraisal_core::{Metric, UndefinedReason};
use pretty_assertions::assert_eq;
use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn cbs_co() -> ProjectParameters {
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

// ===========================================================================
// End-to-end scenarios
// ===========================================================================

#[test]
fn test_cbs_co_workings() {
    let out = appraise_project(&cbs_co()).unwrap();
    let r = &out.result;

    // Operating profit: sales × 45% - 80,000
    assert_eq!(
        r.operating_lines.operating_profit,
        vec![dec!(100000), dec!(105400), dec!(110962), dec!(116690.86)]
    );

    // 18% reducing balance, balancing allowance 275,684 - 50,000 in year 4
    assert_eq!(
        r.capital_allowances.deductions(),
        vec![dec!(90000), dec!(73800), dec!(60516), dec!(225684)]
    );

    // Tax on years 1-3 paid one year later; year 4 is a loss
    assert_eq!(
        r.tax.cash_tax,
        vec![dec!(0), dec!(0), dec!(2500), dec!(7900), dec!(12611.5)]
    );

    assert_eq!(
        r.cash_flows.net_cash_flows(),
        vec![
            dec!(-540000),
            dec!(98800),
            dec!(101664),
            dec!(101788.92),
            dec!(197788.44)
        ]
    );
}

#[test]
fn test_cbs_co_metrics() {
    let out = appraise_project(&cbs_co()).unwrap();
    let a = &out.result.appraisal;

    // -540,000 + 89,818.18 + 84,019.83 + 76,475.52 + 135,092.17
    assert!(
        (a.npv - dec!(-154594.30)).abs() < dec!(0.01),
        "NPV was {}",
        a.npv
    );

    let irr = a.irr.value().unwrap();
    assert!((irr - dec!(-0.026937)).abs() < dec!(0.00001), "IRR was {irr}");

    // Undiscounted total is -39,958.64, so the outlay is never recovered
    assert_eq!(
        a.payback_years,
        Metric::undefined(UndefinedReason::NeverRecovered)
    );
    assert_eq!(
        a.discounted_payback_years,
        Metric::undefined(UndefinedReason::NeverRecovered)
    );

    let arr = a.arr.value().unwrap();
    assert!((arr - dec!(-0.019979)).abs() < dec!(0.00001), "ARR was {arr}");
    assert!(out.warnings.iter().any(|w| w.contains("Negative NPV")));
}

#[test]
fn test_higher_volume_case_clears_hurdle() {
    let params = ProjectParameters {
        base_sales: dec!(600000),
        ..cbs_co()
    };
    let out = appraise_project(&params).unwrap();
    let a = &out.result.appraisal;

    assert_eq!(
        out.result.cash_flows.net_cash_flows(),
        vec![
            dec!(-560000),
            dec!(188200),
            dec!(171246),
            dec!(173458.38),
            dec!(294118.16)
        ]
    );
    assert!((a.npv - dec!(83825.04)).abs() < dec!(0.01), "NPV was {}", a.npv);

    // Positive NPV at 10% and IRR above 10% must agree
    let irr = a.irr.value().unwrap();
    assert!(irr > dec!(0.10));
    assert!((irr - dec!(0.162556)).abs() < dec!(0.00001), "IRR was {irr}");

    // 3 + 27,095.62 / 294,118.16
    let payback = a.payback_years.value().unwrap();
    assert!((payback - dec!(3.092125)).abs() < dec!(0.000001));
    assert!(a.discounted_payback_years.value().unwrap() > payback);
    assert!(!out.warnings.iter().any(|w| w.contains("Negative NPV")));
}

#[test]
fn test_single_year_project() {
    let params = ProjectParameters {
        years: 1,
        capex: dec!(1000),
        residual_value: Decimal::ZERO,
        base_sales: dec!(2000),
        sales_growth: Decimal::ZERO,
        variable_cost_rate: dec!(0.5),
        fixed_cost: Decimal::ZERO,
        ..cbs_co()
    };
    let out = appraise_project(&params).unwrap();
    let r = &out.result;

    // No ordinary allowance; the whole cost is a balancing allowance
    assert_eq!(r.capital_allowances.rows[0].allowance, Decimal::ZERO);
    assert_eq!(r.capital_allowances.balancing_adjustment(), dec!(1000));
    assert_eq!(r.working_capital.movements(), vec![dec!(200), dec!(-200)]);
    assert_eq!(r.cash_flows.net_cash_flows(), vec![dec!(-1200), dec!(1200)]);

    let a = &r.appraisal;
    assert_eq!(a.payback_years.value(), Some(dec!(1)));
    assert!(a.irr.value().unwrap().abs() < dec!(0.000001));
    assert_eq!(a.arr.value(), Some(Decimal::ZERO));
}

#[test]
fn test_zero_lag_extends_nothing() {
    let params = ProjectParameters {
        tax_lag_years: 0,
        tax_beyond_horizon: TaxBeyondHorizon::Extend,
        ..cbs_co()
    };
    let out = appraise_project(&params).unwrap();
    assert_eq!(out.result.cash_flows.rows.len(), 5);
    assert_eq!(out.result.tax.cash_tax[1], dec!(2500));
}

#[test]
fn test_extend_keeps_late_tax_in_npv() {
    let drop = ProjectParameters {
        residual_value: dec!(300000),
        ..cbs_co()
    };
    let extend = ProjectParameters {
        tax_beyond_horizon: TaxBeyondHorizon::Extend,
        ..drop.clone()
    };
    let dropped = appraise_project(&drop).unwrap().result;
    let kept = appraise_project(&extend).unwrap().result;

    assert_eq!(dropped.cash_flows.rows.len(), 5);
    assert_eq!(kept.cash_flows.rows.len(), 6);
    assert!(kept.appraisal.npv < dropped.appraisal.npv);
    assert_eq!(
        kept.cash_flows.rows[5].tax,
        -dropped.tax.dropped[0].amount
    );
}

#[test]
fn test_nominal_appraisal_at_money_rate() {
    let params = ProjectParameters {
        pricing: PricingBasis::Nominal,
        inflation: InflationRates {
            sales: dec!(0.04),
            variable_cost: dec!(0.05),
            fixed_cost: dec!(0.03),
        },
        discount_rate: dec!(0.155),
        ..cbs_co()
    };
    let out = appraise_project(&params).unwrap();
    let lines = &out.result.operating_lines;
    assert_eq!(lines.sales[1], dec!(412000) * dec!(1.04));
    assert_eq!(lines.fixed_costs[2], dec!(80000) * dec!(1.03) * dec!(1.03));
    assert_eq!(out.result.effective_discount_rate, dec!(0.155));
}

#[test]
fn test_profile_json_round_trip_through_parameters() {
    let json = serde_json::to_string(&cbs_co()).unwrap();
    let back: ProjectParameters = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cbs_co());
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn prop_wdv_follows_reducing_balance(
        capex in 1u32..5_000_000,
        rate_bp in 0u32..10_001,
        years in 2u32..15,
        disposal in 0u32..10_000_000,
        cap_to_cost in proptest::bool::ANY,
    ) {
        let capex = Decimal::from(capex);
        let rate = Decimal::new(rate_bp as i64, 4);
        let disposal = Decimal::from(disposal);
        let s = allowance_schedule(capex, rate, years, disposal, cap_to_cost).unwrap();

        let mut expected = capex;
        for row in &s.rows[..(years - 1) as usize] {
            expected *= Decimal::ONE - rate;
            prop_assert!((row.closing_wdv - expected).abs() < dec!(0.000001));
        }
        prop_assert!((s.wdv_before_disposal() - expected).abs() < dec!(0.000001));

        let credited = if cap_to_cost { disposal.min(capex) } else { disposal };
        prop_assert_eq!(s.disposal_for_pool, credited);
        prop_assert_eq!(s.balancing_adjustment(), s.wdv_before_disposal() - credited);
        prop_assert_eq!(s.is_balancing_charge(), s.wdv_before_disposal() < credited);

        // Over the life the pool deducts exactly cost less proceeds credited
        let deducted: Decimal = s.deductions().iter().sum();
        prop_assert!((deducted - (capex - credited)).abs() < dec!(0.000001));
    }

    #[test]
    fn prop_working_capital_movements_sum_to_zero(
        sales in proptest::collection::vec(0u32..2_000_000, 1..20),
        pct_bp in 0u32..10_001,
        same_year in proptest::bool::ANY,
    ) {
        let sales: Vec<Decimal> = sales.into_iter().map(Decimal::from).collect();
        let timing = if same_year {
            WorkingCapitalTiming::SameYear
        } else {
            WorkingCapitalTiming::StartOfYear
        };
        let wc = working_capital_schedule_with_timing(&sales, Decimal::new(pct_bp as i64, 4), timing)
            .unwrap();
        prop_assert_eq!(wc.rows.len(), sales.len() + 1);
        prop_assert_eq!(wc.movements().iter().sum::<Decimal>(), Decimal::ZERO);
    }

    #[test]
    fn prop_irr_discounts_to_zero(
        outlay in 100u32..1_000_000,
        inflows in proptest::collection::vec(1u32..500_000, 1..12),
    ) {
        let mut flows = vec![-Decimal::from(outlay)];
        flows.extend(inflows.into_iter().map(Decimal::from));
        let schedule = CashFlowSchedule::from_net_cash_flows(&flows).unwrap();
        let result = appraise(&schedule, dec!(0.1)).unwrap();
        if let Some(irr) = result.irr.value() {
            let at_irr = time_value::npv(irr, &flows).unwrap();
            let scale = Decimal::from(outlay);
            prop_assert!(at_irr.abs() / scale < dec!(0.0001), "NPV at IRR {} was {}", irr, at_irr);
        }
    }

    #[test]
    fn prop_appraise_project_is_deterministic(
        years in 1u32..12,
        sales in 10_000u32..2_000_000,
        lag in 0u32..3,
    ) {
        let params = ProjectParameters {
            years,
            base_sales: Decimal::from(sales),
            tax_lag_years: lag,
            ..cbs_co()
        };
        let a = appraise_project(&params).unwrap().result;
        let b = appraise_project(&params).unwrap().result;
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_net_cash_flow_is_sum_of_lines(
        years in 1u32..10,
        residual in 0u32..600_000,
        lag in 0u32..3,
        extend in proptest::bool::ANY,
    ) {
        let params = ProjectParameters {
            years,
            residual_value: Decimal::from(residual),
            tax_lag_years: lag,
            tax_beyond_horizon: if extend { TaxBeyondHorizon::Extend } else { TaxBeyondHorizon::Drop },
            ..cbs_co()
        };
        let r = appraise_project(&params).unwrap().result;
        for row in &r.cash_flows.rows {
            prop_assert_eq!(
                row.net_cash_flow,
                row.operating_profit + row.working_capital + row.tax + row.capex + row.residual
            );
        }
        let wc_total: Decimal = r.cash_flows.rows.iter().map(|row| row.working_capital).sum();
        prop_assert_eq!(wc_total, Decimal::ZERO);
    }
}
