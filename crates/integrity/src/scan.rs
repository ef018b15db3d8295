//! Diagnosis and repair of orphaned creator references.
//!
//! [`ReferenceScanner::diagnose`] inspects a bounded sample of content
//! records against a bounded sample of users. A creator unknown to the
//! sample is looked up in the store (id, then alias) before the record is
//! reported as orphaned, so a sample smaller than the directory never
//! produces false orphans.

use pulse_core::config::IntegrityConfig;
use pulse_core::types::DocId;
use pulse_db::models::content::CreatorRef;
use pulse_db::repositories::ContentRepo;
use pulse_db::StoreHandle;
use pulse_events::{LookupError, ResolvedVia, UserDirectory};
use serde::Serialize;

use crate::error::IntegrityError;
use crate::reference::{classify, Classification, OrphanReason, UserIndex, HEALTH_HEALTHY, HEALTH_WARNING};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedRecord {
    pub record_id: DocId,
    pub reason: OrphanReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub total_records: usize,
    pub valid: usize,
    pub valid_by_alias: usize,
    pub orphaned: Vec<OrphanedRecord>,
}

impl Diagnosis {
    pub fn health(&self) -> &'static str {
        if self.orphaned.is_empty() {
            HEALTH_HEALTHY
        } else {
            HEALTH_WARNING
        }
    }
}

/// One record whose creator could not be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("Failed to repair {record_id}: {cause}")]
pub struct RepairFailed {
    pub record_id: DocId,
    pub cause: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub attempted: usize,
    pub fixed: usize,
    pub errors: Vec<RepairFailed>,
}

// ---------------------------------------------------------------------------
// ReferenceScanner
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ReferenceScanner {
    store: StoreHandle,
    directory: UserDirectory,
    config: IntegrityConfig,
}

impl ReferenceScanner {
    pub fn new(store: StoreHandle, directory: UserDirectory, config: IntegrityConfig) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    /// Classify the first `record_cap` content records.
    pub async fn diagnose(&self) -> Result<Diagnosis, IntegrityError> {
        let users = self.directory.list_page(0, self.config.user_cap).await?;
        let index = UserIndex::new(&users);
        let records = ContentRepo::list_page(&*self.store, 0, self.config.record_cap).await?;

        let mut diagnosis = Diagnosis {
            total_records: records.len(),
            ..Diagnosis::default()
        };

        for record in &records {
            let classification = match classify(&record.creator, &index) {
                Classification::Orphaned {
                    reason: OrphanReason::UnknownUser(_),
                } => self.resolve_outside_sample(&record.creator).await?,
                other => other,
            };

            match classification {
                Classification::Valid => diagnosis.valid += 1,
                Classification::ValidByAlias => diagnosis.valid_by_alias += 1,
                Classification::Orphaned { reason } => {
                    tracing::debug!(record_id = %record.id, %reason, "Orphaned content record");
                    diagnosis.orphaned.push(OrphanedRecord {
                        record_id: record.id.clone(),
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            total_records = diagnosis.total_records,
            sampled_users = index.len(),
            valid = diagnosis.valid,
            valid_by_alias = diagnosis.valid_by_alias,
            orphaned = diagnosis.orphaned.len(),
            "Creator reference diagnosis complete"
        );
        Ok(diagnosis)
    }

    async fn resolve_outside_sample(&self, creator: &CreatorRef) -> Result<Classification, IntegrityError> {
        let Some(id) = creator.as_id() else {
            return Ok(classify(creator, &UserIndex::default()));
        };

        match self.directory.resolve(id).await {
            Ok(resolved) => Ok(match resolved.via {
                ResolvedVia::Id => Classification::Valid,
                ResolvedVia::AccountId => Classification::ValidByAlias,
            }),
            Err(LookupError::NotFound(_)) => Ok(Classification::Orphaned {
                reason: OrphanReason::UnknownUser(id.to_string()),
            }),
            Err(LookupError::Store(e)) => Err(e.into()),
        }
    }

    /// Point every orphaned record of `diagnosis` at `fallback_user_id`.
    ///
    /// One update per record; a failed update is recorded and the rest
    /// still run.
    pub async fn repair(
        &self,
        diagnosis: &Diagnosis,
        fallback_user_id: &str,
    ) -> Result<RepairReport, IntegrityError> {
        let fallback = match self.directory.by_id(fallback_user_id).await {
            Ok(user) => user,
            Err(LookupError::NotFound(_)) => {
                return Err(IntegrityError::FallbackUserNotFound(fallback_user_id.to_string()))
            }
            Err(LookupError::Store(e)) => return Err(e.into()),
        };

        let mut report = RepairReport::default();
        for orphan in &diagnosis.orphaned {
            report.attempted += 1;
            match ContentRepo::update_creator(&*self.store, &orphan.record_id, &fallback.id).await {
                Ok(true) => report.fixed += 1,
                Ok(false) => report.errors.push(RepairFailed {
                    record_id: orphan.record_id.clone(),
                    cause: "record no longer exists".into(),
                }),
                Err(e) => {
                    tracing::warn!(record_id = %orphan.record_id, error = %e, "Creator repair failed");
                    report.errors.push(RepairFailed {
                        record_id: orphan.record_id.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            fallback_user_id = %fallback.id,
            attempted = report.attempted,
            fixed = report.fixed,
            errors = report.errors.len(),
            "Creator reference repair complete"
        );
        Ok(report)
    }
}
