//! Hot reload of the governance configuration file.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temp file and renaming it over the original would
//! otherwise detach the watch after the first save.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GovernanceConfig;

/// Reloads and revalidates the config file whenever it changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GovernanceConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for validated reloads.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GovernanceConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Dropping the returned handle stops the watch.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(|n| n.to_os_string());
        let path = self.path.clone();
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = ?e, "Config watch error");
                        return;
                    }
                };
                if !is_reload_trigger(&event.kind) {
                    return;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if !touches_config {
                    return;
                }

                match load_config(&path) {
                    Ok(config) => {
                        tracing::info!(path = ?path, "Config reloaded");
                        if tx.send(config).is_err() {
                            tracing::debug!("Config receiver dropped; ignoring change");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Config reload rejected; keeping current settings");
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn is_reload_trigger(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(_) | EventKind::Create(_))
}
