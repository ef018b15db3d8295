//! Event creation entry point.

use std::sync::Arc;

use pulse_db::models::event::{Event, EventDraft};
use pulse_db::models::outbox::TaskKind;
use pulse_db::repositories::EventRepo;
use pulse_db::StoreHandle;
use validator::Validate;

use crate::directory::{LookupError, UserDirectory};
use crate::error::PublishError;
use crate::outbox::Outbox;
use crate::push::{LocalAlert, LocalAlerter};

/// Validates, persists and schedules delivery of new events.
#[derive(Clone)]
pub struct EventPublisher {
    store: StoreHandle,
    directory: UserDirectory,
    outbox: Outbox,
    alerter: Arc<dyn LocalAlerter>,
}

impl EventPublisher {
    pub fn new(
        store: StoreHandle,
        directory: UserDirectory,
        outbox: Outbox,
        alerter: Arc<dyn LocalAlerter>,
    ) -> Self {
        Self {
            store,
            directory,
            outbox,
            alerter,
        }
    }

    /// Create an event on behalf of `admin_id` and schedule its fan-out.
    ///
    /// `admin_id` may be a user id or an account id. Returns once the event
    /// is persisted; delivery happens in the outbox worker, and a failure to
    /// schedule it is logged rather than returned (verify-and-resend
    /// recovers the event later).
    pub async fn create_event_and_notify(
        &self,
        draft: EventDraft,
        admin_id: &str,
    ) -> Result<Event, PublishError> {
        draft.validate()?;

        let admin = match self.directory.resolve(admin_id).await {
            Ok(resolved) => resolved.user,
            Err(LookupError::NotFound(_)) => return Err(PublishError::UnknownUser(admin_id.into())),
            Err(LookupError::Store(e)) => return Err(PublishError::Store(e)),
        };
        if !admin.role.is_admin() {
            tracing::warn!(user_id = %admin.id, "Non-admin attempted to create an event");
            return Err(PublishError::Forbidden(admin.id));
        }

        let event = EventRepo::create(&*self.store, &draft, &admin.id).await?;
        tracing::info!(event_id = %event.id, created_by = %admin.id, name = %event.name, "Event created");

        if let Err(e) = self.outbox.enqueue_now(TaskKind::FanOut, &event.id).await {
            tracing::error!(event_id = %event.id, error = %e, "Failed to schedule event fan-out");
        }

        if let Err(e) = self
            .alerter
            .alert(&admin.id, &LocalAlert::for_event(&event))
            .await
        {
            tracing::warn!(event_id = %event.id, error = %e, "Local alert failed");
        }

        Ok(event)
    }
}
