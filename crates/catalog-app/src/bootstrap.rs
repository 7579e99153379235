//! Application bootstrap: environment loading and service wiring.

use std::net::SocketAddr;
use std::sync::Arc;

use catalog_api::ApiServer;
use catalog_clientsync::{ApproveAll, ClientSyncHost};
use catalog_config::ConfigService;
use catalog_events::EventBus;
use catalog_store::{FilesystemContentStore, InMemoryMetadataStore, MetadataStore, PgMetadataStore};
use catalog_telemetry::{GlobalContextGuard, LoggingConfig, Metrics};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Dependencies required to bootstrap the catalog sync application.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig<'static>,
    config: ConfigService,
    store: Arc<dyn MetadataStore>,
    content: Arc<FilesystemContentStore>,
    telemetry: Metrics,
    events: EventBus,
    bind_addr: SocketAddr,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) async fn from_env() -> AppResult<Self> {
        let logging = LoggingConfig::default();

        let config_path =
            std::env::var("CATALOG_CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
        let config = ConfigService::load(config_path)
            .await
            .map_err(|err| AppError::config("config_service.load", err))?;

        let content_root =
            std::env::var("CATALOG_CONTENT_ROOT").unwrap_or_else(|_| "./data".to_string());
        let content = Arc::new(FilesystemContentStore::new(content_root));

        let store: Arc<dyn MetadataStore> = match std::env::var("DATABASE_URL") {
            Ok(database_url) => {
                let pool = sqlx::PgPool::connect(&database_url)
                    .await
                    .map_err(|err| AppError::database("pg_pool.connect", err))?;
                let pg = PgMetadataStore::new(pool)
                    .await
                    .map_err(|err| AppError::store("pg_metadata_store.new", err))?;
                Arc::new(pg)
            }
            Err(_) => {
                info!("DATABASE_URL not set, using an in-memory metadata store");
                Arc::new(InMemoryMetadataStore::new())
            }
        };

        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let events = EventBus::new();

        let bind_addr = parse_bind_addr(std::env::var("CATALOG_BIND_ADDR").ok())?;

        Ok(Self {
            logging,
            config,
            store,
            content,
            telemetry,
            events,
            bind_addr,
        })
    }
}

/// Resolve the listener address from an optional override, falling back to the default.
fn parse_bind_addr(override_value: Option<String>) -> AppResult<SocketAddr> {
    let raw = override_value.unwrap_or_else(|| "127.0.0.1:7070".to_string());
    raw.parse().map_err(|_| AppError::InvalidConfig {
        field: "CATALOG_BIND_ADDR",
        reason: "not_a_socket_addr",
        value: Some(raw),
    })
}

/// Entry point for the catalog sync application boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env().await?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    catalog_telemetry::init_logging(&dependencies.logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    info!("catalog sync application bootstrap starting");

    let BootstrapDependencies {
        logging: _,
        config,
        store,
        content,
        telemetry,
        events,
        bind_addr,
    } = dependencies;

    let content_base_url = std::env::var("CATALOG_CONTENT_BASE_URL").ok();
    let clientsync = Arc::new(
        ClientSyncHost::<ApproveAll>::new(content_base_url).with_events(events),
    );

    let _watcher = config.spawn_watcher(None);

    let api = ApiServer::new(config, store, content, clientsync, telemetry);

    info!(addr = %bind_addr, "launching API listener");
    api.serve(bind_addr)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bind_addr_uses_default_when_unset() {
        let addr = parse_bind_addr(None).expect("default addr");
        assert_eq!(addr.to_string(), "127.0.0.1:7070");
    }

    #[test]
    fn parse_bind_addr_honours_override() {
        let addr = parse_bind_addr(Some("0.0.0.0:9100".to_string())).expect("override addr");
        assert_eq!(addr.to_string(), "0.0.0.0:9100");
    }

    #[test]
    fn parse_bind_addr_rejects_garbage() {
        let err = parse_bind_addr(Some("not-an-addr".to_string())).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig { field: "CATALOG_BIND_ADDR", .. }));
    }

    #[tokio::test]
    async fn from_env_falls_back_to_in_memory_store_without_database_url() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        std::io::Write::write_all(&mut file, br#"{"languages": ["en"]}"#).expect("write");

        let config = ConfigService::load(file.path())
            .await
            .expect("load config");
        let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let content = Arc::new(FilesystemContentStore::new(std::env::temp_dir()));
        let telemetry = Metrics::new().expect("telemetry");
        let events = EventBus::new();
        let bind_addr = parse_bind_addr(None).expect("default addr");

        let dependencies = BootstrapDependencies {
            logging: LoggingConfig::default(),
            config,
            store,
            content,
            telemetry,
            events,
            bind_addr,
        };
        assert_eq!(dependencies.bind_addr.port(), 7070);
    }
}
