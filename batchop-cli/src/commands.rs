use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a batch of simulated remote calls and execute it.
    Run {
        #[arg(long, default_value = "bulk-update")]
        name: String,
        #[arg(long = "op", value_name = "NAME")]
        ops: Vec<String>,
        #[arg(long = "fail", value_name = "NAME")]
        fail: Vec<String>,
        #[arg(long = "payload", value_name = "NAME=JSON")]
        payloads: Vec<String>,
        #[arg(long = "group", value_name = "NAME=OP1,OP2")]
        groups: Vec<String>,
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        deadline_ms: Option<u64>,
        #[arg(long, value_enum, default_value_t = EventsMode::None)]
        events: EventsMode,
        #[arg(long)]
        progress: bool,
        #[arg(long)]
        metrics: bool,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        pool: PoolArgs,
        #[command(flatten)]
        simulation: SimulationArgs,
    },
    /// Print the effective engine configuration.
    Config {
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        pool: PoolArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventsMode {
    None,
    Stdout,
    Log,
}
