use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{info, info_span};

use calc_share_cli::inspect::{
    StorageTarget, connection_rows, parse_assignment, pending_imports, publish, stored_rows,
};
use calc_share_core::{FilePoller, ShareSettings, SharedStateBroker, default_registry};

use crate::cli::{CalculatorArgs, ConfigArgs, ExportArgs, WatchArgs};
use crate::summary::{
    calculators_table, connections_table, fields_table, imports_table, settings_table,
    stored_table,
};

pub fn run_fields() -> Result<()> {
    println!("{}", fields_table());
    Ok(())
}

pub fn run_calculators() -> Result<()> {
    println!("{}", calculators_table(default_registry()));
    Ok(())
}

pub fn run_connections(args: &CalculatorArgs) -> Result<()> {
    let rows = connection_rows(default_registry(), &args.calculator)?;
    if rows.is_empty() {
        println!("No calculator can use values from {}", args.calculator);
    } else {
        println!("{}", connections_table(&rows));
    }
    Ok(())
}

pub fn run_show(target: &StorageTarget) -> Result<()> {
    let broker = target.open()?;
    print_document(&broker);
    Ok(())
}

pub fn run_imports(target: &StorageTarget, args: &CalculatorArgs) -> Result<()> {
    let broker = target.open()?;
    let (imports, banner) = pending_imports(&broker, default_registry(), &args.calculator)?;
    match banner {
        Some(message) => {
            println!("{message}");
            println!("{}", imports_table(&imports));
        }
        None => println!("Nothing to import for {}", args.calculator),
    }
    Ok(())
}

pub fn run_export(target: &StorageTarget, args: &ExportArgs) -> Result<()> {
    let values = args
        .values
        .iter()
        .map(String::as_str)
        .map(parse_assignment)
        .collect::<Result<Vec<_>>>()?;
    let broker = target.open()?;
    let written = publish(&broker, default_registry(), &args.calculator, &values)?;
    let skipped = values.len() - written.len();
    println!(
        "Exported {} value{} as {}",
        written.len(),
        if written.len() == 1 { "" } else { "s" },
        args.calculator
    );
    if skipped > 0 {
        println!("Skipped {skipped} field(s) {} does not export", args.calculator);
    }
    Ok(())
}

pub fn run_clear(target: &StorageTarget) -> Result<()> {
    let broker = target.open()?;
    if !broker.clear() {
        bail!("failed to clear shared data");
    }
    println!("Cleared {}", target.backend.path_for(&target.key).display());
    Ok(())
}

pub fn run_watch(
    target: &StorageTarget,
    settings: &ShareSettings,
    args: &WatchArgs,
) -> Result<()> {
    let interval = args
        .interval_ms
        .map_or_else(|| settings.poll_interval(), Duration::from_millis);
    let broker = target.open()?;
    let poller = FilePoller::new(&target.backend, &target.key);
    broker.watch(&poller);

    let changed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&changed);
    let _subscription = broker.subscribe(Arc::new(move || flag.store(true, Ordering::SeqCst)));

    let span = info_span!("watch", path = %poller.path().display());
    let _guard = span.enter();
    info!(?interval, "watching shared data");

    print_document(&broker);
    loop {
        thread::sleep(interval);
        poller.poll();
        if changed.swap(false, Ordering::SeqCst) {
            println!();
            print_document(&broker);
        }
    }
}

pub fn run_config(
    settings: &ShareSettings,
    cli_config: Option<&Path>,
    args: &ConfigArgs,
) -> Result<()> {
    let path = cli_config.map_or_else(ShareSettings::config_path, Path::to_path_buf);
    if args.write {
        match cli_config {
            Some(path) => settings.save_to(path)?,
            None => settings.save()?,
        }
        info!(path = %path.display(), "settings saved");
        println!("Wrote {}", path.display());
    } else {
        println!("Settings file: {}", path.display());
    }
    println!("{}", settings_table(settings));
    Ok(())
}

pub fn load_settings(cli_config: Option<&Path>) -> Result<ShareSettings> {
    match cli_config {
        Some(path) => ShareSettings::try_load_from(path)
            .with_context(|| format!("load settings from {}", path.display())),
        None => Ok(ShareSettings::load()),
    }
}

fn print_document(broker: &SharedStateBroker) {
    let rows = stored_rows(&broker.document(), broker.now_millis());
    if rows.is_empty() {
        println!("No shared values stored");
    } else {
        println!("{}", stored_table(&rows));
    }
}
