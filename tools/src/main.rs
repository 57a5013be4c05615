use std::process::ExitCode;

use check::check;
use clap::Parser;
use cli::CliCommand;
use load_test::load_test;

pub mod check;
pub mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliCommand::parse();
    match cli.subcommand {
        cli::CliSubcommand::LoadTest(args) => {
            load_test(args).await;
            ExitCode::SUCCESS
        }
        cli::CliSubcommand::Check(args) => check(args),
    }
}
