//! Resend to the recipients a verification found missing.

use std::sync::Arc;

use futures::future::join_all;
use pulse_core::config::NotifyConfig;
use pulse_db::models::event::Event;
use pulse_db::models::user::User;
use pulse_db::repositories::{EventRepo, UserRepo};
use pulse_db::StoreHandle;
use serde::Serialize;

use crate::error::VerifyError;
use crate::push::{send_event_push, PushGateway};
use crate::verify::{DeliveryVerifier, VerificationResult};
use crate::writer::NotificationWriter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResendReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Push messages handed to the gateway for recipients written now.
    pub push_prepared: usize,
}

/// A verification together with the resend it triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub verification: VerificationResult,
    pub resend: ResendReport,
}

impl Reconciliation {
    /// `true` if every recipient now holds a notification.
    pub fn is_complete(&self) -> bool {
        self.resend.succeeded == self.resend.attempted
    }
}

#[derive(Clone)]
pub struct ResendCoordinator {
    store: StoreHandle,
    verifier: DeliveryVerifier,
    writer: NotificationWriter,
    push: Option<Arc<dyn PushGateway>>,
}

impl ResendCoordinator {
    pub fn new(store: StoreHandle, config: &NotifyConfig) -> Self {
        Self {
            verifier: DeliveryVerifier::new(store.clone(), config),
            writer: NotificationWriter::new(store.clone(), config),
            store,
            push: None,
        }
    }

    /// Push to every recipient the resend writes a notification for.
    pub fn with_push_gateway(mut self, gateway: Arc<dyn PushGateway>) -> Self {
        self.push = Some(gateway);
        self
    }

    /// Verify `event_id` and write notifications for exactly the missing
    /// recipients. Re-running with nobody missing attempts nothing.
    pub async fn resend_missing(&self, event_id: &str) -> Result<ResendReport, VerifyError> {
        Ok(self.reconcile(event_id).await?.resend)
    }

    /// [`resend_missing`](Self::resend_missing), also returning the
    /// verification the resend was based on.
    pub async fn reconcile(&self, event_id: &str) -> Result<Reconciliation, VerifyError> {
        let event = self.load_event(event_id).await?;
        let verification = self.verifier.verify(event_id).await?;

        if verification.missing.is_empty() {
            return Ok(Reconciliation {
                verification,
                resend: ResendReport::default(),
            });
        }

        tracing::info!(
            event_id,
            missing = verification.missing.len(),
            "Resending to missing recipients"
        );
        let result = self
            .writer
            .write_notifications(&event, &verification.missing)
            .await;

        let newly_created: Vec<&str> = result.newly_created_ids().collect();
        let push_prepared = self.send_push(&event, &newly_created).await;

        let resend = ResendReport {
            attempted: verification.missing.len(),
            succeeded: result.created(),
            push_prepared,
        };
        tracing::info!(
            event_id,
            attempted = resend.attempted,
            succeeded = resend.succeeded,
            "Resend finished"
        );

        Ok(Reconciliation {
            verification,
            resend,
        })
    }

    async fn send_push(&self, event: &Event, recipients: &[&str]) -> usize {
        let Some(gateway) = &self.push else {
            return 0;
        };
        if recipients.is_empty() {
            return 0;
        }

        let lookups = join_all(
            recipients
                .iter()
                .map(|id| UserRepo::find_by_id(&*self.store, id)),
        )
        .await;

        let mut users: Vec<User> = Vec::with_capacity(recipients.len());
        for (id, lookup) in recipients.iter().zip(lookups) {
            match lookup {
                Ok(Some(user)) => users.push(user),
                Ok(None) => {
                    tracing::debug!(event_id = %event.id, user_id = *id, "Recipient gone before push");
                }
                Err(e) => {
                    tracing::warn!(event_id = %event.id, user_id = *id, error = %e, "Push recipient lookup failed");
                }
            }
        }
        send_event_push(gateway.as_ref(), event, &users).await
    }

    async fn load_event(&self, event_id: &str) -> Result<Event, VerifyError> {
        EventRepo::find_by_id(&*self.store, event_id)
            .await
            .map_err(|e| VerifyError::VerificationIncomplete(e.to_string()))?
            .ok_or_else(|| VerifyError::EventNotFound(event_id.to_string()))
    }
}
