//! `calc-share` CLI.

use clap::{ColorChoice, Parser};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

use calc_share_cli::inspect::StorageTarget;
use calc_share_cli::logging::{LogConfig, LogFormat, init_logging};
use calc_share_cli::report::error_report;
use calc_share_core::ShareSettings;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    load_settings, run_calculators, run_clear, run_config, run_connections, run_export,
    run_fields, run_imports, run_show, run_watch,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("{}", error_report(&error));
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Fields => run_fields(),
        Command::Calculators => run_calculators(),
        Command::Connections(args) => run_connections(args),
        Command::Show => run_show(&storage(cli)?.1),
        Command::Imports(args) => run_imports(&storage(cli)?.1, args),
        Command::Export(args) => run_export(&storage(cli)?.1, args),
        Command::Clear => run_clear(&storage(cli)?.1),
        Command::Watch(args) => {
            let (settings, target) = storage(cli)?;
            run_watch(&target, &settings, args)
        }
        Command::Config(args) => {
            let mut settings = match cli.config.as_deref() {
                Some(path) if args.write && !path.exists() => ShareSettings::default(),
                path => load_settings(path)?,
            };
            if let Some(dir) = &cli.data_dir {
                settings.data_dir = Some(dir.clone());
            }
            run_config(&settings, cli.config.as_deref(), args)
        }
    }
}

fn storage(cli: &Cli) -> anyhow::Result<(ShareSettings, StorageTarget)> {
    let settings = load_settings(cli.config.as_deref())?;
    let target = StorageTarget::resolve(&settings, cli.data_dir.as_deref());
    Ok((settings, target))
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
