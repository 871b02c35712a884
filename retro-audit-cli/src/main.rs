//! retro-audit CLI
//!
//! Audit a local ROM collection against a No-Intro or MAME style DAT file.

mod cli_types;
mod commands;
mod error;
mod scan;

use std::io::Write;

use clap::Parser;

use cli_types::{Cli, Commands};
use commands::audit::run_audit;
use commands::config::run_config;
use commands::dat_info::run_dat_info;
use error::CliError;

fn main() {
    let cli = Cli::parse();
    init_logger(cli.quiet, cli.verbose);

    if let Err(e) = run(cli) {
        log::error!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = retro_audit_lib::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Audit(args) => run_audit(args, config, cli.quiet),
        Commands::DatInfo { dat } => run_dat_info(&dat),
        Commands::Config => {
            run_config(cli.config.as_deref(), &config);
            Ok(())
        }
    }
}

fn init_logger(quiet: bool, verbose: bool) {
    let mut builder = env_logger::Builder::new();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else {
        builder
            .filter_level(if quiet {
                log::LevelFilter::Warn
            } else {
                log::LevelFilter::Info
            })
            .format(|buf, record| writeln!(buf, "{}", record.args()));
    }
    builder.parse_env("RETRO_AUDIT_LOG").init();
}
