use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "termflow",
    about = "Termflow: bounded, contract-checked pipelines over lazy terms",
    version
)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a pipeline of operations to an integer term
    Eval {
        /// Input elements, comma-separated (empty for the empty term)
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        input: String,

        /// Elements repeated forever after the input, comma-separated
        #[arg(long, allow_hyphen_values = true)]
        cycle: Option<String>,

        /// Operation spec, repeatable, applied in order
        /// (add:N, mul:N, even, odd, gt:N, insert:IDX:N, sort, sort-desc,
        /// to-string, upper, len)
        #[arg(long = "op", required = true)]
        ops: Vec<String>,

        /// Number of output elements requested: `all` or a count
        #[arg(long, default_value = "all")]
        block_size: String,

        /// Bound propagation: last_stage or fused (overrides config)
        #[arg(long)]
        propagation: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the registry of every contract termflow can raise
    ContractRegistry {
        /// Show a single contract by name
        #[arg(long)]
        name: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Await a background producer with a bounded wait
    AwaitCheck {
        /// How long the producer takes to resolve, in milliseconds
        #[arg(long, default_value_t = 50)]
        delay_ms: u64,

        /// How long the caller is willing to wait, in milliseconds
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,

        /// Value the producer resolves to
        #[arg(long, default_value_t = 42, allow_hyphen_values = true)]
        value: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
