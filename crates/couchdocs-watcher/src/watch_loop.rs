//! The polling loop behind `push --watch`.

use crate::classify::ChangeEvent;
use crate::config::WatchConfig;
use crate::error::Result;
use crate::watcher::FileWatcher;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const STOP_CHECK: Duration = Duration::from_millis(50);

/// Hands batches of file changes to a handler once per interval until
/// stopped.
pub struct WatchLoop {
    watcher: FileWatcher,
    config: WatchConfig,
    stop: Arc<AtomicBool>,
}

impl WatchLoop {
    /// Starts watching `root`. Nothing is delivered until [`run`](Self::run).
    pub fn new(root: &Path, config: WatchConfig) -> Result<Self> {
        Ok(Self {
            watcher: FileWatcher::new(root)?,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A flag that ends the loop after the current tick once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Runs until the stop flag is set or the handler fails.
    ///
    /// Empty ticks never reach the handler. A handler error ends the loop
    /// and is returned as-is.
    pub fn run<F, E>(&mut self, mut handler: F) -> std::result::Result<(), E>
    where
        F: FnMut(&[ChangeEvent]) -> std::result::Result<(), E>,
    {
        while !self.stopped() {
            let events = self.watcher.poll();
            if !events.is_empty() {
                debug!("Handling {} change(s)", events.len());
                handler(&events)?;
            }
            self.wait();
        }
        debug!("Watch stopped");
        Ok(())
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn wait(&self) {
        let deadline = Instant::now() + self.config.interval();
        while !self.stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(STOP_CHECK.min(deadline - now));
        }
    }
}
