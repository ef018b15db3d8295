//! Event fan-out: one notification per user in the directory.

use std::collections::HashSet;
use std::sync::Arc;

use pulse_core::config::NotifyConfig;
use pulse_core::types::DocId;
use pulse_db::models::event::Event;
use pulse_db::models::user::User;
use pulse_db::StoreHandle;
use serde::Serialize;

use crate::directory::UserDirectory;
use crate::error::FanOutError;
use crate::push::{send_event_push, PushGateway};
use crate::writer::NotificationWriter;

/// Aggregate outcome of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    pub total_users: usize,
    pub created: usize,
    pub failed: usize,
    /// Push messages handed to the gateway. Recipients that already held
    /// the notification from an earlier run are not pushed again.
    pub push_prepared: usize,
}

#[derive(Clone)]
pub struct FanOutOrchestrator {
    directory: UserDirectory,
    writer: NotificationWriter,
    push: Option<Arc<dyn PushGateway>>,
}

impl FanOutOrchestrator {
    pub fn new(store: StoreHandle, config: &NotifyConfig) -> Self {
        Self {
            directory: UserDirectory::new(store.clone(), config.page_size),
            writer: NotificationWriter::new(store, config),
            push: None,
        }
    }

    /// Hand a push message to `gateway` for every recipient with a push token.
    pub fn with_push_gateway(mut self, gateway: Arc<dyn PushGateway>) -> Self {
        self.push = Some(gateway);
        self
    }

    /// Enumerate all users and write each one a notification about `event`.
    ///
    /// Only a directory failure is an error; individual write failures are
    /// counted in the report and left for the resend path.
    pub async fn fan_out(&self, event: &Event) -> Result<FanOutReport, FanOutError> {
        let users = self.directory.list_all_users().await?;
        let recipients: Vec<DocId> = users.iter().map(|u| u.id.clone()).collect();

        tracing::info!(
            event_id = %event.id,
            recipients = recipients.len(),
            "Starting notification fan-out"
        );

        let result = self.writer.write_notifications(event, &recipients).await;
        let push_prepared = self.send_push(event, &users, result.newly_created_ids()).await;

        let report = FanOutReport {
            total_users: users.len(),
            created: result.created(),
            failed: result.failed(),
            push_prepared,
        };

        if report.failed > 0 {
            tracing::warn!(
                event_id = %event.id,
                total_users = report.total_users,
                created = report.created,
                failed = report.failed,
                "Fan-out finished with failures"
            );
        } else {
            tracing::info!(
                event_id = %event.id,
                total_users = report.total_users,
                created = report.created,
                "Fan-out finished"
            );
        }

        Ok(report)
    }

    async fn send_push<'a>(
        &self,
        event: &Event,
        users: &[User],
        newly_created: impl Iterator<Item = &'a str>,
    ) -> usize {
        let Some(gateway) = &self.push else {
            return 0;
        };

        let newly_created: HashSet<&str> = newly_created.collect();
        let recipients = users.iter().filter(|u| newly_created.contains(u.id.as_str()));
        send_event_push(gateway.as_ref(), event, recipients).await
    }
}
