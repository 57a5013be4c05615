use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
pub struct CliCommand {
    #[command(subcommand)]
    pub subcommand: CliSubcommand,
}

#[derive(Subcommand)]
pub enum CliSubcommand {
    /// Fire concurrent requests at the template listing.
    LoadTest(LoadTestArgs),
    /// Validate a submission against a template without a server.
    Check(CheckArgs),
}

#[derive(Args)]
pub struct LoadTestArgs {
    #[arg(short = 'r', long)]
    pub requests: u32,
    #[arg(short = 'm', long)]
    pub max_concurrent: u32,
    #[arg(long, default_value = "http://127.0.0.1:8080/api/templates")]
    pub url: String,
}

#[derive(Args)]
pub struct CheckArgs {
    /// JSON file of a template with its `templateFields`.
    #[arg(short = 't', long)]
    pub template: PathBuf,
    /// JSON file of the submitted values, keyed by field id.
    #[arg(short = 'p', long)]
    pub payload: PathBuf,
}
