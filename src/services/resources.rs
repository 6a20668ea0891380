//! Resource status synchronization
//!
//! Resource status is only ever written from here. The allowed moves are:
//!
//! ```text
//! Available           -> Loaned
//! Loaned              -> Available | Damaged
//! Damaged             -> InMaintenance | InRepair | AwaitingParts | Available
//! InMaintenance       -> InRepair | AwaitingParts | PartiallyRepaired | RepairedPendingTest | Available
//! InRepair            -> PartiallyRepaired | AwaitingParts | RepairedPendingTest | Available
//! PartiallyRepaired   -> InRepair | AwaitingParts | RepairedPendingTest | Available
//! AwaitingParts       -> InRepair | PartiallyRepaired | Available
//! RepairedPendingTest -> InRepair | Available
//! ```
//!
//! Moving a resource under maintenance back to `Available` only happens once
//! every incident is closed and at least one was completed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{
        damage_report::DamageReport,
        enums::ResourceStatus,
        loan::ResourceStatusChange,
        maintenance::MaintenanceResourceSummary,
        resource::Resource,
    },
    repository::Repository,
};

use super::maintenance::MaintenanceIncidentAggregator;

/// Resource state machine and the writes that drive it
pub struct ResourceStatusSync;

impl ResourceStatusSync {
    /// Whether `from -> to` is an allowed resource transition
    pub fn can_transition(from: ResourceStatus, to: ResourceStatus) -> bool {
        use ResourceStatus::*;

        match from {
            Available => matches!(to, Loaned),
            Loaned => matches!(to, Available | Damaged),
            Damaged => matches!(to, InMaintenance | InRepair | AwaitingParts | Available),
            InMaintenance => matches!(
                to,
                InRepair | AwaitingParts | PartiallyRepaired | RepairedPendingTest | Available
            ),
            InRepair => matches!(to, PartiallyRepaired | AwaitingParts | RepairedPendingTest | Available),
            PartiallyRepaired => matches!(to, InRepair | AwaitingParts | RepairedPendingTest | Available),
            AwaitingParts => matches!(to, InRepair | PartiallyRepaired | Available),
            RepairedPendingTest => matches!(to, InRepair | Available),
        }
    }

    /// Status a loaned resource takes when its loan comes back
    pub fn status_after_return(report: Option<&DamageReport>) -> ResourceStatus {
        match report {
            Some(report) if report.has_damage() => ResourceStatus::Damaged,
            _ => ResourceStatus::Available,
        }
    }

    /// Status to move to once maintenance is finished, if any
    pub fn settled_status(current: ResourceStatus, finished: bool) -> Option<ResourceStatus> {
        (finished && current.needs_maintenance() && Self::can_transition(current, ResourceStatus::Available))
            .then_some(ResourceStatus::Available)
    }

    /// Resolve every resource of a returned loan. Exactly one write per resource.
    pub async fn apply_return(
        repository: &Repository,
        conn: &mut PgConnection,
        resources: &[Resource],
        reports: &HashMap<i32, DamageReport>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ResourceStatusChange>> {
        let mut changes = Vec::with_capacity(resources.len());

        for resource in resources {
            let status = Self::status_after_return(reports.get(&resource.id));

            if resource.status != ResourceStatus::Loaned {
                tracing::warn!(
                    "Resource {} returned while in status {}, resolving to {}",
                    resource.id,
                    resource.status,
                    status
                );
            }

            repository.resources.set_status(conn, resource.id, status, now).await?;
            changes.push(ResourceStatusChange {
                resource_id: resource.id,
                previous: resource.status,
                status,
            });
        }

        Ok(changes)
    }

    /// Hand resources out for an authorized loan
    pub async fn mark_loaned(
        repository: &Repository,
        conn: &mut PgConnection,
        resources: &[Resource],
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        for resource in resources {
            if !Self::can_transition(resource.status, ResourceStatus::Loaned) {
                return Err(AppError::BusinessRule(format!(
                    "Resource {} is not available (status: {})",
                    resource.id, resource.status
                )));
            }
        }
        for resource in resources {
            repository
                .resources
                .set_status(conn, resource.id, ResourceStatus::Loaned, now)
                .await?;
        }
        Ok(())
    }

    /// Release a resource whose maintenance is finished, then store its
    /// refreshed summary. Returns the resource as it now stands.
    pub async fn settle(
        repository: &Repository,
        conn: &mut PgConnection,
        resource: &Resource,
        now: DateTime<Utc>,
    ) -> AppResult<(Resource, MaintenanceResourceSummary)> {
        let incidents = repository.maintenance.list_for_resource(&mut *conn, resource.id).await?;
        let finished = MaintenanceIncidentAggregator::is_finished(&incidents);

        let mut resource = resource.clone();
        if let Some(status) = Self::settled_status(resource.status, finished) {
            repository.resources.set_status(&mut *conn, resource.id, status, now).await?;
            tracing::info!("Resource {} maintenance finished, now {}", resource.id, status);
            resource.status = status;
            resource.modif_date = Some(now);
        }

        let summary = MaintenanceIncidentAggregator::summarize(resource.id, resource.status, &incidents, now);
        repository.maintenance.upsert_summary(conn, &summary).await?;
        Ok((resource, summary))
    }
}

#[derive(Clone)]
pub struct ResourcesService {
    repository: Repository,
}

impl ResourcesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Resource> {
        self.repository.resources.get_by_id(id).await
    }

    /// Move a resource along the maintenance workflow (assignment, parts ordered, repair, test)
    pub async fn advance_status(&self, id: i32, to: ResourceStatus, now: DateTime<Utc>) -> AppResult<Resource> {
        if !to.is_maintenance_workflow() {
            return Err(AppError::InvalidTransition(format!(
                "{} is set by loans and maintenance completion, not directly",
                to
            )));
        }

        let mut tx = self.repository.begin().await?;
        let resource = self.repository.resources.lock(&mut tx, id).await?;
        let previous = resource.status;

        if !ResourceStatusSync::can_transition(previous, to) {
            return Err(AppError::InvalidTransition(format!(
                "Resource {} cannot go from {} to {}",
                id, previous, to
            )));
        }

        self.repository.resources.set_status(&mut tx, id, to, now).await?;
        let moved = Resource { status: to, modif_date: Some(now), ..resource };
        let (settled, _) = ResourceStatusSync::settle(&self.repository, &mut tx, &moved, now).await?;

        tx.commit().await?;

        tracing::info!("Resource {} moved from {} to {}", id, previous, settled.status);
        Ok(settled)
    }
}
