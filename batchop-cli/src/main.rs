use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "batchop", version, about = "Composite batch operation runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("BATCHOP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Run {
            name,
            ops,
            fail,
            payloads,
            groups,
            parallel,
            deadline_ms,
            events,
            progress,
            metrics,
            output,
            pool,
            simulation,
        } => {
            cmd::run::run_cmd(cmd::run::RunRequest {
                name,
                ops,
                fail,
                payloads,
                groups,
                parallel,
                deadline_ms,
                events,
                progress,
                metrics,
                output,
                pool,
                simulation,
            })
            .await
        }
        Command::Config { output, pool } => cmd::config::config_cmd(output, pool),
    }
}
