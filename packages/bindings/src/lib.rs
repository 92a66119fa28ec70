use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Loan calculation
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_loan(input_json: String) -> NapiResult<String> {
    let input: mortgage_core::scenario::ScenarioInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = mortgage_core::scenario::calculate_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_overpayments(input_json: String) -> NapiResult<String> {
    let input: mortgage_core::scenario::ScenarioInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = mortgage_core::scenario::compare_overpayments(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Optimization
// ---------------------------------------------------------------------------

#[napi]
pub fn optimize_overpayments(input_json: String) -> NapiResult<String> {
    let input: mortgage_core::optimization::OptimizationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        mortgage_core::optimization::optimize_overpayments(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Agent tool
// ---------------------------------------------------------------------------

#[napi]
pub fn loan_tool(input_json: String) -> NapiResult<String> {
    let input: mortgage_core::tool_call::LoanToolInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = mortgage_core::tool_call::run_loan_tool(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn loan_tool_definition() -> NapiResult<String> {
    serde_json::to_string(&mortgage_core::tool_call::loan_tool_definition())
        .map_err(to_napi_error)
}
