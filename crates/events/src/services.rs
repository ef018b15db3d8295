//! Wiring of the notification components around one store handle.

use std::sync::Arc;

use pulse_core::config::{NotifyConfig, OutboxConfig};
use pulse_db::StoreHandle;

use crate::directory::UserDirectory;
use crate::fanout::FanOutOrchestrator;
use crate::outbox::{Outbox, OutboxWorker};
use crate::publisher::EventPublisher;
use crate::push::{LocalAlerter, LoggingLocalAlerter, LoggingPushGateway, PushGateway};
use crate::read_state::ReadStateStore;
use crate::resend::ResendCoordinator;

/// Every notification component, built once and cloned into handlers.
#[derive(Clone)]
pub struct NotifyServices {
    pub store: StoreHandle,
    pub directory: UserDirectory,
    pub outbox: Outbox,
    pub fan_out: FanOutOrchestrator,
    pub resend: ResendCoordinator,
    pub publisher: EventPublisher,
    pub read_state: ReadStateStore,
    config: NotifyConfig,
}

impl NotifyServices {
    /// Build with the logging push and local-alert collaborators.
    pub fn new(store: StoreHandle, config: NotifyConfig) -> Self {
        Self::with_collaborators(
            store,
            config,
            Arc::new(LoggingPushGateway),
            Arc::new(LoggingLocalAlerter),
        )
    }

    pub fn with_collaborators(
        store: StoreHandle,
        config: NotifyConfig,
        push: Arc<dyn PushGateway>,
        alerter: Arc<dyn LocalAlerter>,
    ) -> Self {
        let directory = UserDirectory::new(store.clone(), config.page_size);
        let outbox = Outbox::new(store.clone());

        Self {
            fan_out: FanOutOrchestrator::new(store.clone(), &config).with_push_gateway(push.clone()),
            resend: ResendCoordinator::new(store.clone(), &config).with_push_gateway(push),
            publisher: EventPublisher::new(store.clone(), directory.clone(), outbox.clone(), alerter),
            read_state: ReadStateStore::new(store.clone()),
            directory,
            outbox,
            store,
            config,
        }
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    /// A worker draining this instance's outbox. Enqueues made through
    /// [`NotifyServices::outbox`] wake it immediately.
    pub fn worker(&self, config: OutboxConfig) -> OutboxWorker {
        OutboxWorker::new(
            self.outbox.clone(),
            self.fan_out.clone(),
            self.resend.clone(),
            &self.config,
            config,
        )
    }
}
