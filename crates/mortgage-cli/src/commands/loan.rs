use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_core::loan::{InterestRatePeriod, LoanDetails, RepaymentModel};
use mortgage_core::scenario::{self, ScenarioInput};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModelArg {
    /// Level annuity payment
    Equal,
    /// Fixed principal portion, falling payment
    Decreasing,
}

impl From<ModelArg> for RepaymentModel {
    fn from(model: ModelArg) -> Self {
        match model {
            ModelArg::Equal => RepaymentModel::EqualInstallments,
            ModelArg::Decreasing => RepaymentModel::DecreasingInstallments,
        }
    }
}

/// Arguments for a full loan calculation
#[derive(Args)]
pub struct CalculateArgs {
    /// Loan amount
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent (e.g. 4.5)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in years
    #[arg(long)]
    pub term: Option<u32>,

    /// Repayment model
    #[arg(long, value_enum, default_value = "equal")]
    pub model: ModelArg,

    /// First day of the loan (YYYY-MM-DD); enables payment dates
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Print only the yearly summary instead of every month
    #[arg(long)]
    pub yearly: bool,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for an overpayment impact comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to JSON or YAML input file with the loan and its overpayment plans
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_calculate(args: CalculateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario_input: ScenarioInput = match input::load(args.input.as_deref())? {
        Some(doc) => doc,
        None => ScenarioInput {
            loan: LoanDetails {
                principal: args
                    .principal
                    .ok_or("--principal is required (or provide --input)")?,
                interest_rate_periods: vec![InterestRatePeriod {
                    start_month: 1,
                    interest_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
                }],
                loan_term: args.term.ok_or("--term is required (or provide --input)")?,
                repayment_model: args.model.into(),
                overpayment_plans: Vec::new(),
                start_date: args.start_date,
                additional_costs: None,
                name: None,
            },
            rate_changes: Vec::new(),
        },
    };

    let mut result = scenario::calculate_loan(&scenario_input)?;
    if args.yearly {
        result.result.schedule.clear();
    }
    Ok(serde_json::to_value(result)?)
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario_input: ScenarioInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for overpayment comparison")?;
    let result = scenario::compare_overpayments(&scenario_input)?;
    Ok(serde_json::to_value(result)?)
}
