use clap::Parser;
use std::path::PathBuf;

/// Routes a live stream of log events through named filters into bounded,
/// merged, queryable JSON snapshots
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML); defaults apply when omitted
    #[arg(short, long, env = "LOG_SIEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// File the snapshot states are persisted to
    #[arg(short, long, env = "LOG_SIEVE_STATES", default_value = "log-sieve-states.json")]
    pub states: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
