use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "vodsync",
    version,
    about = "Migrate Twitch VOD archives to YouTube from local OBS recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one reconciliation pass: fetch VODs, match local files, upload
    Run {
        /// Continue past per-entry upload failures instead of aborting
        #[arg(long)]
        keep_going: bool,
        /// Report what would be uploaded without uploading anything
        #[arg(long)]
        dry_run: bool,
    },
    /// List local recordings and how their timestamps parse
    Scan,
    /// Show resolved paths, config, and persisted state
    Status,
    /// One-time YouTube OAuth bootstrap
    Auth,
    /// Render the cron line for periodic runs
    Schedule,
}

fn print_report(report: &CommandReport) {
    println!("== {} ==", report.command);
    for detail in &report.details {
        println!("{detail}");
    }
    for issue in &report.issues {
        eprintln!("issue: {issue}");
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Run {
            keep_going,
            dry_run,
        } => commands::run::run(&commands::run::RunOptions {
            keep_going,
            dry_run,
        })?,
        Command::Scan => commands::scan::run()?,
        Command::Status => commands::status::run()?,
        Command::Auth => commands::auth::run()?,
        Command::Schedule => commands::schedule::run()?,
    };

    print_report(&report);
    if !report.ok {
        anyhow::bail!("{} completed with issues", report.command);
    }
    Ok(())
}
