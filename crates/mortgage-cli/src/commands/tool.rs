use clap::Args;
use serde_json::Value;

use mortgage_core::tool_call::{self, LoanToolInput};

use crate::input;

/// Arguments for the agent tool adapter
#[derive(Args)]
pub struct ToolArgs {
    /// Print the tool definition (JSON schema) instead of running it
    #[arg(long)]
    pub definition: bool,

    /// Path to JSON or YAML tool-call arguments
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_tool(args: ToolArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.definition {
        return Ok(tool_call::loan_tool_definition());
    }
    let tool_input: LoanToolInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for the loan tool")?;
    let result = tool_call::run_loan_tool(&tool_input)?;
    Ok(serde_json::to_value(result)?)
}
