use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct PoolArgs {
    /// Worker pool size; falls back to BATCHOP_POOL_SIZE, then 4.
    #[arg(long)]
    pub pool_size: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct SimulationArgs {
    /// Simulated latency of every remote call.
    #[arg(long, default_value_t = 500)]
    pub latency_ms: u64,
    /// Extra random latency, up to this many milliseconds.
    #[arg(long, default_value_t = 0)]
    pub jitter_ms: u64,
}
