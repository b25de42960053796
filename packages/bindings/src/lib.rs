use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use capex_appraisal_core::appraisal::{
    self, AppraisalOptions, ArrBasis, CashFlowSchedule, ProjectParameters, WorkingCapitalTiming,
};
use capex_appraisal_core::time_value::DEFAULT_IRR_GUESS;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct AllowanceRequest {
    capex: Decimal,
    wda_rate: Decimal,
    years: u32,
    #[serde(default)]
    disposal: Decimal,
    #[serde(default = "default_true")]
    cap_to_cost: bool,
}

#[derive(Deserialize)]
struct WorkingCapitalRequest {
    sales: Vec<Decimal>,
    pct: Decimal,
    #[serde(default)]
    timing: WorkingCapitalTiming,
}

#[derive(Deserialize)]
struct CashFlowRequest {
    cash_flows: Vec<Decimal>,
    discount_rate: Decimal,
    #[serde(default)]
    arr_basis: ArrBasis,
    #[serde(default)]
    irr_guess: Option<Decimal>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Full appraisal
// ---------------------------------------------------------------------------

#[napi]
pub fn appraise_project(input_json: String) -> NapiResult<String> {
    let params: ProjectParameters = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal::appraise_project(&params).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn export_csv(input_json: String) -> NapiResult<String> {
    let params: ProjectParameters = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal::appraise_project(&params).map_err(to_napi_error)?;
    appraisal::to_csv(&output.result).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Individual schedules
// ---------------------------------------------------------------------------

#[napi]
pub fn allowance_schedule(input_json: String) -> NapiResult<String> {
    let req: AllowanceRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal::allowance_schedule(
        req.capex,
        req.wda_rate,
        req.years,
        req.disposal,
        req.cap_to_cost,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn working_capital_schedule(input_json: String) -> NapiResult<String> {
    let req: WorkingCapitalRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal::working_capital_schedule_with_timing(&req.sales, req.pct, req.timing)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn appraise_cash_flows(input_json: String) -> NapiResult<String> {
    let req: CashFlowRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let schedule = CashFlowSchedule::from_net_cash_flows(&req.cash_flows).map_err(to_napi_error)?;
    let options = AppraisalOptions {
        discount_rate: req.discount_rate,
        arr_basis: req.arr_basis,
        irr_guess: req.irr_guess.unwrap_or(DEFAULT_IRR_GUESS),
    };
    let output = appraisal::appraise_with(&schedule, &options).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
