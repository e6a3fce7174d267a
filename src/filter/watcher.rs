// src/filter/watcher.rs - Rebuild the filter when a dictionary changes on disk

use anyhow::Result;
use log::{debug, error, info};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use super::{FilterService, SharedFilter};
use crate::config::FilterConfig;

/// Quiet period collecting bursts of file events into one rebuild
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the dictionary directory and swaps in a freshly built service.
///
/// Stops watching when dropped.
pub struct DictionaryWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl DictionaryWatcher {
    /// Start watching. Must be called from within a Tokio runtime.
    pub fn spawn(shared: SharedFilter, config: FilterConfig) -> Result<Self> {
        let (tx, mut rx) = mpsc::channel::<Event>(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if let Err(e) = tx.blocking_send(event) {
                        error!("Failed to send dictionary watch event: {}", e);
                    }
                }
                Err(e) => error!("Dictionary watch error: {}", e),
            }
        })?;
        watcher.watch(&config.dictionary_dir, RecursiveMode::NonRecursive)?;
        info!(
            "Watching {} for dictionary changes",
            config.dictionary_dir.display()
        );

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let mut touched = relevant_paths(&event, &config);
                if touched.is_empty() {
                    continue;
                }

                // Coalesce the burst an editor (or our own write-back) produces
                sleep(DEBOUNCE).await;
                while let Ok(event) = rx.try_recv() {
                    touched.extend(relevant_paths(&event, &config));
                }

                let current = shared.current().await;
                if !has_changed(&current, &touched).await {
                    debug!("Dictionary events carried no content change, skipping rebuild");
                    continue;
                }

                info!("Dictionary change detected, rebuilding content filter...");
                match FilterService::load(&config).await {
                    Ok(service) => {
                        shared.replace(service).await;
                        info!("Content filter rebuilt and swapped in");
                    }
                    Err(e) => error!("Failed to rebuild content filter, keeping previous one: {:#}", e),
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for DictionaryWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Paths in `event` that name one of the configured dictionaries
fn relevant_paths(event: &Event, config: &FilterConfig) -> Vec<PathBuf> {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|path| is_dictionary(path, config))
        .cloned()
        .collect()
}

fn is_dictionary(path: &Path, config: &FilterConfig) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| config.dictionary_names().contains(&name))
        .unwrap_or(false)
}

/// Whether any touched file differs from what the running service last wrote
async fn has_changed(service: &FilterService, touched: &[PathBuf]) -> bool {
    for path in touched {
        let Some(name) = path.file_name() else {
            continue;
        };
        match fs::read_to_string(path).await {
            Ok(contents) => {
                if service.dictionary_snapshot(name) != Some(contents.as_str()) {
                    return true;
                }
            }
            // Unreadable now; let the rebuild report it
            Err(_) => return true,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::tempdir;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_only_dictionary_modifications_are_relevant() {
        let config = FilterConfig::default();

        let modified = event(EventKind::Modify(ModifyKind::Any), "/srv/bot/white.txt");
        assert_eq!(relevant_paths(&modified, &config).len(), 1);

        let created = event(EventKind::Create(CreateKind::File), "sensitive_words_out.txt");
        assert_eq!(relevant_paths(&created, &config).len(), 1);

        let other_file = event(EventKind::Modify(ModifyKind::Any), "/srv/bot/config.yml");
        assert!(relevant_paths(&other_file, &config).is_empty());

        let removed = event(EventKind::Remove(RemoveKind::File), "white.txt");
        assert!(relevant_paths(&removed, &config).is_empty());
    }

    #[tokio::test]
    async fn test_own_write_back_is_not_a_change() {
        let temp_dir = tempdir().unwrap();
        let config = FilterConfig {
            dictionary_dir: temp_dir.path().to_path_buf(),
            ..FilterConfig::default()
        };
        std::fs::write(config.inbound_path(), "badword\n").unwrap();
        let service = FilterService::load(&config).await.unwrap();

        let touched = vec![config.inbound_path()];
        assert!(!has_changed(&service, &touched).await);

        std::fs::write(config.inbound_path(), "badword####***\nnewword\n").unwrap();
        assert!(has_changed(&service, &touched).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_edited_dictionary_is_swapped_in() {
        let temp_dir = tempdir().unwrap();
        let config = FilterConfig {
            dictionary_dir: temp_dir.path().to_path_buf(),
            ..FilterConfig::default()
        };
        std::fs::write(config.inbound_path(), "badword####***\n").unwrap();
        let shared = SharedFilter::new(FilterService::load(&config).await.unwrap());
        assert_eq!(shared.current().await.filter_inbound("a newword"), "a newword");

        let _watcher = DictionaryWatcher::spawn(shared.clone(), config.clone()).unwrap();
        sleep(Duration::from_millis(200)).await;
        std::fs::write(config.inbound_path(), "badword####***\nnewword####[gone]\n").unwrap();

        let mut filtered = String::new();
        for _ in 0..50 {
            sleep(Duration::from_millis(200)).await;
            filtered = shared.current().await.filter_inbound("a newword");
            if filtered != "a newword" {
                break;
            }
        }
        assert_eq!(filtered, "a [gone]");
    }
}
