//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parallel multi-model querying with streamed agreement and consensus
#[derive(Parser, Debug)]
#[command(name = "ensemble-server")]
#[command(author, version, about = "Query several LLMs at once, score their agreement and stream a consensus")]
#[command(long_about = r#"
Fans one prompt out to several provider/model configurations in parallel,
streams every answer as it arrives, scores pairwise agreement with
embeddings and streams a consensus written by a designated summarizer.

Events are framed as `data: <json>` followed by a blank line, both over
HTTP (POST /api/consensus) and on stdout for `run`.

Examples:
  ensemble-server serve
  ensemble-server serve --bind 0.0.0.0:8080 -v
  ensemble-server run --request request.json > events.txt
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML config file (overrides discovered files)
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Listen address (overrides [server] bind)
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Run one ensemble from a JSON request file, writing events to stdout
    Run {
        /// Request body in the same shape POST /api/consensus accepts
        #[arg(short, long, value_name = "FILE")]
        request: PathBuf,
    },
}
