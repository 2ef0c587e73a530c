//! Configuration watcher - reloads the registries when the file changes.
//!
//! Polls the file's modification time. A change triggers a full load and
//! rebuild; the live registries are only replaced when both succeed, so a bad
//! edit leaves the previous configuration serving traffic.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time;

use super::load;
use crate::application::registry::{ModeRegistries, RegistryDeps, RegistryError};
use crate::domain::actions::ActionConfigError;

/// Why a reload was rejected.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ActionConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Background reloader for the action configuration file.
pub struct ConfigWatcher {
    path: PathBuf,
    registries: ModeRegistries,
    deps: RegistryDeps,
    interval: Duration,
    last_modified: Mutex<Option<SystemTime>>,
}

impl ConfigWatcher {
    /// Creates a watcher; the file's current modification time is the baseline.
    pub async fn new(
        path: impl Into<PathBuf>,
        registries: ModeRegistries,
        deps: RegistryDeps,
        interval: Duration,
    ) -> Self {
        let path = path.into();
        let last_modified = modified(&path).await;
        Self {
            path,
            registries,
            deps,
            interval,
            last_modified: Mutex::new(last_modified),
        }
    }

    /// Polls until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        tracing::info!(
            path = %self.path.display(),
            interval_ms = self.interval.as_millis() as u64,
            "Watching action configuration"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Configuration watcher stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }

    /// Reloads if the file changed since the last poll.
    ///
    /// Returns `None` when nothing changed, otherwise the reload result.
    pub async fn poll_once(&self) -> Option<Result<(), ReloadError>> {
        let current = modified(&self.path).await;
        {
            let mut last = self.last_modified.lock().await;
            if current.is_none() || current == *last {
                return None;
            }
            *last = current;
        }
        Some(self.reload_once().await)
    }

    /// Loads the file and swaps in new registries if everything validates.
    pub async fn reload_once(&self) -> Result<(), ReloadError> {
        let result = self.reload().await;
        match &result {
            Ok(()) => tracing::info!(path = %self.path.display(), "Reloaded action configuration"),
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Configuration reload rejected, keeping previous registry"
            ),
        }
        result
    }

    async fn reload(&self) -> Result<(), ReloadError> {
        let config = load(&self.path).await?;
        self.registries.rebuild(&config, &self.deps)?;
        Ok(())
    }
}

async fn modified(path: &Path) -> Option<SystemTime> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::commerce::InMemoryCommerceBackend;
    use crate::application::handlers::commerce_handlers;
    use crate::domain::actions::Mode;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn document(version: &str, handler: &str) -> String {
        format!(
            r#"{{
  "version": "{version}",
  "actions": [{{
    "id": "getCart",
    "name": "Cart",
    "description": "Show the cart",
    "category": "cart",
    "implementation": {{ "type": "function", "handler": "{handler}" }}
  }}]
}}"#
        )
    }

    struct Fixture {
        _dir: TempDir,
        path: PathBuf,
        watcher: ConfigWatcher,
        registries: ModeRegistries,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("actions.json");
        std::fs::write(&path, document("1", "getCart")).unwrap();

        let deps = RegistryDeps::new(commerce_handlers(Arc::new(InMemoryCommerceBackend::new())));
        let config = load(&path).await.unwrap();
        let registries = ModeRegistries::build(&config, &deps).unwrap();
        let watcher = ConfigWatcher::new(&path, registries.clone(), deps, Duration::from_millis(10)).await;

        Fixture {
            _dir: dir,
            path,
            watcher,
            registries,
        }
    }

    fn touch(path: &Path, contents: &str, offset_secs: u64) {
        std::fs::write(path, contents).unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
            .unwrap();
    }

    fn version(registries: &ModeRegistries) -> String {
        registries.get(Mode::B2c).unwrap().version().to_string()
    }

    #[tokio::test]
    async fn unchanged_file_is_not_reloaded() {
        let f = fixture().await;
        assert!(f.watcher.poll_once().await.is_none());
    }

    #[tokio::test]
    async fn missing_file_is_skipped_until_it_reappears() {
        let f = fixture().await;
        std::fs::remove_file(&f.path).unwrap();
        assert!(f.watcher.poll_once().await.is_none());

        touch(&f.path, &document("5", "getCart"), 5);
        assert!(f.watcher.poll_once().await.unwrap().is_ok());
        assert_eq!(version(&f.registries), "5");
    }

    #[tokio::test]
    async fn valid_change_swaps_registries() {
        let f = fixture().await;
        touch(&f.path, &document("2", "getCart"), 5);

        assert!(f.watcher.poll_once().await.unwrap().is_ok());
        assert_eq!(version(&f.registries), "2");
        assert_eq!(f.registries.get(Mode::B2b).unwrap().version(), "2");
    }

    #[tokio::test]
    async fn invalid_change_keeps_previous_registry() {
        let f = fixture().await;

        touch(&f.path, "{ broken", 5);
        assert!(matches!(
            f.watcher.poll_once().await,
            Some(Err(ReloadError::Config(ActionConfigError::Parse(_))))
        ));

        touch(&f.path, &document("3", "noSuchHandler"), 10);
        assert!(matches!(
            f.watcher.poll_once().await,
            Some(Err(ReloadError::Registry(RegistryError::HandlerNotFound { .. })))
        ));

        assert_eq!(version(&f.registries), "1");
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let f = fixture().await;
        let (tx, rx) = watch::channel(false);

        let watcher = Arc::new(f.watcher);
        let task = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.run(rx).await })
        };

        touch(&f.path, &document("4", "getCart"), 5);
        for _ in 0..200 {
            if version(&f.registries) == "4" {
                break;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(version(&f.registries), "4");

        tx.send(true).unwrap();
        time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }
}
