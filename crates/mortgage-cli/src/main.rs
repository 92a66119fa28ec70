mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::loan::{CalculateArgs, CompareArgs};
use commands::optimize::OptimizeArgs;
use commands::tool::ToolArgs;

/// Mortgage schedules, overpayment impact and overpayment optimization
#[derive(Parser)]
#[command(
    name = "mcalc",
    version,
    about = "Mortgage schedules, overpayment impact and overpayment optimization",
    long_about = "A CLI for mortgage calculations with decimal precision. Builds \
                  amortization schedules under multiple rate periods and both repayment \
                  models, applies rate changes and overpayment plans, reports fees and \
                  APR, and searches for the most effective overpayment strategy."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Full schedule, totals, fees and APR for a loan
    Calculate(CalculateArgs),
    /// Interest and time saved by a loan's overpayment plans
    Compare(CompareArgs),
    /// Rank candidate overpayment strategies within a budget
    Optimize(OptimizeArgs),
    /// Agent tool adapter: compact calculation or tool definition
    Tool(ToolArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::loan::run_calculate(args),
        Commands::Compare(args) => commands::loan::run_compare(args),
        Commands::Optimize(args) => commands::optimize::run_optimize(args),
        Commands::Tool(args) => commands::tool::run_tool(args),
        Commands::Version => {
            println!("mcalc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {:?}", e);
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
