use std::sync::Arc;

use pulse_core::config::{IntegrityConfig, NotifyConfig};
use pulse_db::StoreHandle;
use pulse_events::NotifyServices;
use pulse_integrity::ReferenceScanner;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every component holds the same [`StoreHandle`].
#[derive(Clone)]
pub struct AppState {
    /// Document store every component reads and writes through.
    pub store: StoreHandle,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Event publishing, fan-out, reconciliation and read-state components.
    pub services: NotifyServices,
    /// Creator-reference diagnosis and repair.
    pub scanner: ReferenceScanner,
}

impl AppState {
    pub fn new(
        store: StoreHandle,
        config: ServerConfig,
        services: NotifyServices,
        integrity: IntegrityConfig,
    ) -> Self {
        let scanner = ReferenceScanner::new(store.clone(), services.directory.clone(), integrity);
        Self {
            store,
            config: Arc::new(config),
            services,
            scanner,
        }
    }

    /// State with the logging push and alert collaborators.
    pub fn with_defaults(
        store: StoreHandle,
        config: ServerConfig,
        notify: NotifyConfig,
        integrity: IntegrityConfig,
    ) -> Self {
        let services = NotifyServices::new(store.clone(), notify);
        Self::new(store, config, services, integrity)
    }
}
