pub mod allowances;
pub mod cash_flow;
pub mod export;
pub mod metrics;
pub mod model;
pub mod projection;
pub mod tax;
pub mod working_capital;

pub use allowances::{allowance_schedule, AllowanceYear, CapitalAllowanceSchedule};
pub use cash_flow::{cash_flow_schedule, CashFlowInputs, CashFlowRow, CashFlowSchedule};
#[cfg(feature = "export")]
pub use export::to_csv;
pub use export::{export_rows, ExportRow};
pub use metrics::{
    appraise, appraise_with, AppraisalOptions, AppraisalResult, ArrBasis, DiscountedYear,
};
pub use model::{appraise_project, validate_parameters, ProjectAppraisal, ProjectParameters};
pub use projection::{
    apply_inflation, build_profile, operating_lines, validate_profile, InflationRates,
    OperatingLines, OperatingYear, PricingBasis, YearlyOperatingProfile,
};
pub use tax::{tax_schedule, tax_schedule_with_policy, TaxBeyondHorizon, TaxSchedule, TaxYear};
pub use working_capital::{
    working_capital_schedule, working_capital_schedule_with_timing, WorkingCapitalSchedule,
    WorkingCapitalTiming, WorkingCapitalYear,
};
