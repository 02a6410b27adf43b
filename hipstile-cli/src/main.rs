//! hipstile CLI - inspect HiPS sky surveys from the command line.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::plan::PlanArgs;
use commands::tile::TileArgs;
use error::CliError;
use runner::{CliRunner, GlobalOptions};

#[derive(Debug, Parser)]
#[command(name = "hipstile", version, about = "Inspect HiPS sky surveys")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write a daily log file into this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Use this configuration file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show a survey's properties
    Properties {
        /// Survey root URL or local directory
        url: String,
    },

    /// List the surveys in a hipslist
    List {
        /// Hipslist URL or local file
        source: String,
    },

    /// Fetch one tile
    Tile {
        /// Survey root URL or local directory
        url: String,

        /// HEALPix order
        order: u8,

        /// Pixel index within the order
        pix: u64,

        /// Save the tile bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds to wait for the download
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Show the tiles a view would draw
    Plan {
        /// Survey root URL or local directory
        url: String,

        /// Horizontal field of view in degrees
        #[arg(long, default_value_t = 60.0)]
        fov: f64,

        /// Viewport width in pixels
        #[arg(long, default_value_t = 1920)]
        width: u32,

        /// Viewport height in pixels
        #[arg(long, default_value_t = 1080)]
        height: u32,

        /// Right ascension of the view centre in degrees
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        ra: f64,

        /// Declination of the view centre in degrees
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        dec: f64,

        /// Download the planned tiles and re-plan once they arrive
        #[arg(long)]
        fetch: bool,

        /// Seconds to wait for downloads with --fetch
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let options = GlobalOptions {
        verbose: cli.verbose,
        log_dir: cli.log_dir,
        config: cli.config,
    };

    match cli.command {
        Commands::Config { command } => commands::config::run(command, &options.config_path()),
        Commands::Properties { url } => {
            let runner = CliRunner::new(&options)?;
            commands::properties::run(&runner, &url)
        }
        Commands::List { source } => {
            let runner = CliRunner::new(&options)?;
            commands::list::run(&runner, &source)
        }
        Commands::Tile {
            url,
            order,
            pix,
            output,
            timeout,
        } => {
            let runner = CliRunner::new(&options)?;
            commands::tile::run(
                &runner,
                TileArgs {
                    url,
                    order,
                    pix,
                    output,
                    timeout,
                },
            )
        }
        Commands::Plan {
            url,
            fov,
            width,
            height,
            ra,
            dec,
            fetch,
            timeout,
        } => {
            let runner = CliRunner::new(&options)?;
            commands::plan::run(
                &runner,
                PlanArgs {
                    url,
                    fov,
                    width,
                    height,
                    ra,
                    dec,
                    fetch,
                    timeout,
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::parse_from([
            "hipstile", "plan", "https://example/dss", "--fov", "10", "--dec", "-30",
        ]);
        match cli.command {
            Commands::Plan { fov, dec, fetch, .. } => {
                assert_eq!(fov, 10.0);
                assert_eq!(dec, -30.0);
                assert!(!fetch);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
