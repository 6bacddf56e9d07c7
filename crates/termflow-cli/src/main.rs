//! Termflow CLI: the `termflow` command.

mod cli;
mod commands;
mod op_spec;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "TERMFLOW_LOG";

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = support::load_config_or_exit(cli.config.as_deref());

    match cli.command {
        Commands::Eval {
            input,
            cycle,
            ops,
            block_size,
            propagation,
            json,
        } => commands::eval::run(
            commands::eval::Args {
                input,
                cycle,
                ops,
                block_size,
                propagation,
                json,
            },
            &config,
        ),

        Commands::ContractRegistry { name, json } => {
            commands::contract_registry::run(name.as_deref(), json)
        }

        Commands::AwaitCheck {
            delay_ms,
            timeout_ms,
            value,
            json,
        } => commands::await_check::run(
            commands::await_check::Args {
                delay_ms,
                timeout_ms,
                value,
                json,
            },
            &config,
        ),
    }
}
