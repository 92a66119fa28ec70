use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_core::optimization::{self, OptimizationInput, OptimizationStrategy};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Interest,
    Time,
    Balanced,
}

impl From<StrategyArg> for OptimizationStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Interest => OptimizationStrategy::MaximizeInterestSavings,
            StrategyArg::Time => OptimizationStrategy::MinimizeTime,
            StrategyArg::Balanced => OptimizationStrategy::Balanced,
        }
    }
}

/// Arguments for the overpayment optimizer
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to JSON or YAML input file with `loan` and optional `parameters`
    #[arg(long)]
    pub input: Option<String>,

    /// Monthly overpayment budget (overrides the input file)
    #[arg(long)]
    pub max_monthly: Option<Decimal>,

    /// Lump-sum overpayment budget (overrides the input file)
    #[arg(long)]
    pub max_one_time: Option<Decimal>,

    /// What to optimize for (overrides the input file)
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Fee in percent of the value delivered (overrides the input file)
    #[arg(long)]
    pub fee_percentage: Option<Decimal>,
}

pub fn run_optimize(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut opt_input: OptimizationInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for optimization")?;

    let params = &mut opt_input.parameters;
    if let Some(monthly) = args.max_monthly {
        params.max_monthly_overpayment = monthly;
    }
    if let Some(lump) = args.max_one_time {
        params.max_one_time_overpayment = lump;
    }
    if let Some(strategy) = args.strategy {
        params.strategy = strategy.into();
    }
    if let Some(fee) = args.fee_percentage {
        params.fee_percentage = fee;
    }

    let result = optimization::optimize_overpayments(&opt_input)?;
    Ok(serde_json::to_value(result)?)
}
