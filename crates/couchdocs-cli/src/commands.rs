//! CLI command implementations.

use colored::Colorize;
use couchdocs_store::{dump as dump_store, put_dir, DumpMode, Store, StoreConfig, SyncResult};
use couchdocs_watcher::{push_batch, ChangeEvent, WatchConfig, WatchLoop};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Push a directory, then optionally keep pushing changes.
///
/// With a watch config the first batch of the watch loop lists every
/// existing file, so that batch does the initial full push.
pub fn push(
    url: &str,
    dir: &Path,
    destructive: bool,
    watch: Option<WatchConfig>,
    config: &StoreConfig,
) -> Result<()> {
    let store = Store::connect(url, config)?;

    if destructive {
        println!("{} {}", "Recreating".yellow(), store.url());
        store.recreate_destructive()?;
    }

    match watch {
        Some(watch) => watch_dir(&store, dir, watch),
        None => {
            let spinner = spinner("Pushing documents...")?;
            let result = put_dir(&store, dir);
            spinner.finish_and_clear();
            report("Pushed", &result?);
            Ok(())
        }
    }
}

/// Write a database's documents into an existing directory.
pub fn dump(url: &str, dir: &Path, mode: DumpMode, config: &StoreConfig) -> Result<()> {
    let store = Store::connect(url, config)?;

    let spinner = spinner("Fetching documents...")?;
    let result = dump_store(&store, dir, mode);
    spinner.finish_and_clear();

    report("Dumped", &result?);
    Ok(())
}

/// The old spelling of `push`, with the arguments the other way round.
pub fn load(dir: &Path, url: &str, config: &StoreConfig) -> Result<()> {
    warn!("`load` is deprecated, use `couchdocs push {} {}`", url, dir.display());
    push(url, dir, false, None, config)
}

fn watch_dir(store: &Store, dir: &Path, config: WatchConfig) -> Result<()> {
    let mut watch = WatchLoop::new(dir, config)?;
    stop_on_ctrl_c(watch.stop_handle())?;

    println!("{} Watching {}", "✓".green(), dir.display());
    println!("  Press {} to stop", "Ctrl+C".cyan());

    watch.run(|events: &[ChangeEvent]| -> Result<()> {
        info!("{} change(s)", events.len());
        report("Pushed", &push_batch(store, dir, events)?);
        Ok(())
    })?;

    println!("{} Stopped watching", "✓".green());
    Ok(())
}

/// Sets `stop` when the user hits Ctrl+C.
///
/// The signal is awaited on its own thread so the blocking HTTP client
/// never runs inside the runtime.
fn stop_on_ctrl_c(stop: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::spawn(move || {
        runtime.block_on(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupted, stopping after the current batch");
                    stop.store(true, Ordering::SeqCst);
                }
                Err(e) => warn!("Can't listen for Ctrl+C: {}", e),
            }
        });
    });

    Ok(())
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message);
    Ok(spinner)
}

fn report(action: &str, result: &SyncResult) {
    println!(
        "{} {} {} design and {} data document(s) in {}ms",
        "✓".green(),
        action,
        result.design_documents.to_string().cyan(),
        result.documents.to_string().cyan(),
        result.duration_ms
    );
}
