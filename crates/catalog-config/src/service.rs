//! Live, reloadable [`ServiceConfig`] shared across the API and export
//! services.
//!
//! Mirrors the shared-state-plus-reload shape used elsewhere in this
//! codebase for values that change at runtime: a lock-guarded snapshot, a
//! `reload` that re-validates before swapping it in, and a lightweight
//! polling watcher so an operator can edit the config file in place without
//! restarting the process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::ConfigResult;
use crate::loader;
use crate::model::ServiceConfig;

/// Default interval the background watcher polls the config file at.
const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(30);

/// Shared, reloadable configuration handle.
#[derive(Clone)]
pub struct ConfigService {
    path: PathBuf,
    current: Arc<RwLock<ServiceConfig>>,
}

impl ConfigService {
    /// Load `path` for the first time and construct a service around it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub async fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let config = loader::load(&path).await?;
        Ok(Self {
            path,
            current: Arc::new(RwLock::new(config)),
        })
    }

    /// A snapshot of the currently active configuration.
    pub async fn snapshot(&self) -> ServiceConfig {
        self.current.read().await.clone()
    }

    /// Path this service was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read and re-validate the config file, swapping it in only on
    /// success; a failed reload leaves the previously active configuration
    /// untouched, matching the anchor-commit ordering used elsewhere in this
    /// system (§5) — a reload either fully succeeds or has no effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub async fn reload(&self) -> ConfigResult<ServiceConfig> {
        let fresh = loader::load(&self.path).await?;
        let mut guard = self.current.write().await;
        *guard = fresh.clone();
        Ok(fresh)
    }

    /// Spawn a background task that reloads the config file on a fixed
    /// interval, logging and otherwise ignoring reload failures so a
    /// transient edit (or an operator's typo, later fixed) never crashes the
    /// service.
    pub fn spawn_watcher(&self, interval: Option<Duration>) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        let interval = interval.unwrap_or(DEFAULT_WATCH_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match service.reload().await {
                    Ok(_) => info!(path = %service.path.display(), "reloaded service configuration"),
                    Err(error) => warn!(path = %service.path.display(), %error, "config reload failed, keeping prior configuration"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reload_picks_up_a_changed_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"languages": ["en"]}}"#).expect("write");
        let service = ConfigService::load(file.path()).await.expect("load");
        assert_eq!(service.snapshot().await.languages, vec!["en"]);

        let mut file = std::fs::File::create(file.path()).expect("reopen");
        write!(file, r#"{{"languages": ["en", "fr"]}}"#).expect("rewrite");
        service.reload().await.expect("reload");
        assert_eq!(service.snapshot().await.languages, vec!["en", "fr"]);
    }

    #[tokio::test]
    async fn failed_reload_keeps_the_prior_configuration() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"languages": ["en"]}}"#).expect("write");
        let service = ConfigService::load(file.path()).await.expect("load");

        let mut file = std::fs::File::create(file.path()).expect("reopen");
        write!(file, "not json").expect("rewrite");
        assert!(service.reload().await.is_err());
        assert_eq!(service.snapshot().await.languages, vec!["en"]);
    }
}
