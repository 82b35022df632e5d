use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::eval::EvalArgs;
use cli::generate::GenerateArgs;
use cli::inspect::InspectArgs;

#[derive(Parser)]
#[command(
    name = "lutgen",
    version,
    about = "Turn a trained LUT network into VHDL and SystemVerilog"
)]
struct Cli {
    /// Log pipeline stages (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate hardware description sources from a model file
    Generate(GenerateArgs),
    /// Print the parameter summary of a model file
    Inspect(InspectArgs),
    /// Evaluate the model on one input bit vector
    Eval(EvalArgs),
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "lutgen=info",
        _ => "lutgen=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate(args) => cli::generate::cmd_generate(args),
        Command::Inspect(args) => cli::inspect::cmd_inspect(args),
        Command::Eval(args) => cli::eval::cmd_eval(args),
    }
}
