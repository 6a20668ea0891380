//! Maintenance incident aggregation
//!
//! Every damage tag reported on a return becomes one incident, numbered per
//! resource. The per-resource summary is a cache over that incident set and
//! is recomputed whenever an incident is added or changes status.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    config::MaintenanceConfig,
    error::{AppError, AppResult},
    models::{
        damage_report::DamageReport,
        enums::{IncidentStatus, OverallStatus, ResourceStatus},
        maintenance::{MaintenanceIncident, MaintenanceResourceSummary, NewIncident, ReporterContext},
        resource::Resource,
    },
    repository::Repository,
};

use super::resources::ResourceStatusSync;

/// Turns damage reports into incidents and keeps summaries current
pub struct MaintenanceIncidentAggregator;

impl MaintenanceIncidentAggregator {
    /// Initial status of new incidents, from the resource status before the return
    pub fn initial_status(prior: ResourceStatus) -> IncidentStatus {
        if prior.is_maintenance_workflow() {
            IncidentStatus::InProgress
        } else {
            IncidentStatus::Pending
        }
    }

    /// One incident per damage tag, in report order, numbered after `existing`
    pub fn plan_incidents(
        resource_id: i32,
        existing: i64,
        prior: ResourceStatus,
        report: &DamageReport,
        reporter: &ReporterContext,
        config: &MaintenanceConfig,
        now: DateTime<Utc>,
    ) -> Vec<NewIncident> {
        let description = match report.damage_note.trim() {
            "" => config.placeholder_description.clone(),
            note => note.to_string(),
        };
        let status = Self::initial_status(prior);

        report
            .damages
            .iter()
            .zip(existing + 1..)
            .map(|(tag, number)| NewIncident {
                resource_id,
                incident_number: number as i32,
                damage_type: tag.clone(),
                description: description.clone(),
                reporter: reporter.clone(),
                status,
                priority: config.default_priority,
                created_at: now,
            })
            .collect()
    }

    /// Roll-up of a resource's incidents
    pub fn summarize(
        resource_id: i32,
        current: ResourceStatus,
        incidents: &[MaintenanceIncident],
        now: DateTime<Utc>,
    ) -> MaintenanceResourceSummary {
        let total = incidents.len() as i32;
        let completed = incidents
            .iter()
            .filter(|i| i.status == IncidentStatus::Completed)
            .count() as i32;

        let completion_percentage = if total == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / total as f64
        };

        let overall_status = if total > 0 && completed == total {
            OverallStatus::Completed
        } else {
            OverallStatus::from(current)
        };

        let primary_reporter = incidents
            .iter()
            .max_by_key(|i| (i.created_at, i.incident_number))
            .and_then(|i| i.reporter_name.clone());

        MaintenanceResourceSummary {
            resource_id,
            total_incidents: total,
            completed_incidents: completed,
            completion_percentage,
            overall_status,
            primary_reporter,
            updated_at: now,
        }
    }

    /// Whether maintenance of a resource is over: every incident closed and
    /// at least one actually completed. Cancelled incidents keep the
    /// percentage under 100 but do not hold the resource back.
    pub fn is_finished(incidents: &[MaintenanceIncident]) -> bool {
        incidents.iter().all(|i| i.status.is_closed())
            && incidents.iter().any(|i| i.status == IncidentStatus::Completed)
    }

    /// Whether setting `incident_id` to `status` would close every incident of
    /// the resource without any completed, leaving no way back to service
    pub fn would_strand(incidents: &[MaintenanceIncident], incident_id: i32, status: IncidentStatus) -> bool {
        let statuses = || {
            incidents
                .iter()
                .map(move |i| if i.id == incident_id { status } else { i.status })
        };
        statuses().all(IncidentStatus::is_closed) && !statuses().any(|s| s == IncidentStatus::Completed)
    }

    /// Allowed incident status changes
    pub fn can_transition(from: IncidentStatus, to: IncidentStatus) -> bool {
        use IncidentStatus::*;

        match from {
            Pending => matches!(to, InProgress | Completed | Cancelled),
            InProgress => matches!(to, Completed | Cancelled),
            Completed | Cancelled => false,
        }
    }

    /// Create incidents for one damaged resource of a return event. Returns how many were created.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_return(
        repository: &Repository,
        conn: &mut PgConnection,
        resource_id: i32,
        prior: ResourceStatus,
        report: &DamageReport,
        reporter: &ReporterContext,
        config: &MaintenanceConfig,
        now: DateTime<Utc>,
    ) -> AppResult<usize> {
        let existing = repository.maintenance.count_for_resource(conn, resource_id).await?;
        let planned = Self::plan_incidents(resource_id, existing, prior, report, reporter, config, now);

        for incident in &planned {
            let created = repository.maintenance.insert(conn, incident).await?;
            tracing::debug!(
                "Created incident #{} ({}) for resource {}",
                created.incident_number,
                created.damage_type,
                resource_id
            );
        }

        Ok(planned.len())
    }

    /// Recompute and store the summary of a resource
    pub async fn refresh_summary(
        repository: &Repository,
        conn: &mut PgConnection,
        resource: &Resource,
        now: DateTime<Utc>,
    ) -> AppResult<MaintenanceResourceSummary> {
        let incidents = repository.maintenance.list_for_resource(&mut *conn, resource.id).await?;
        let summary = Self::summarize(resource.id, resource.status, &incidents, now);
        repository.maintenance.upsert_summary(conn, &summary).await?;
        Ok(summary)
    }
}

#[derive(Clone)]
pub struct MaintenanceService {
    repository: Repository,
}

impl MaintenanceService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Current maintenance summary of a resource
    pub async fn get_resource_maintenance_state(&self, resource_id: i32) -> AppResult<MaintenanceResourceSummary> {
        let resource = self.repository.resources.get_by_id(resource_id).await?;

        match self.repository.maintenance.get_summary(resource_id).await? {
            Some(summary) => Ok(summary),
            None => Ok(MaintenanceIncidentAggregator::summarize(
                resource_id,
                resource.status,
                &[],
                resource.modif_date.unwrap_or_else(Utc::now),
            )),
        }
    }

    /// Incidents of a resource, by incident number
    pub async fn list_incidents(&self, resource_id: i32) -> AppResult<Vec<MaintenanceIncident>> {
        self.repository.resources.get_by_id(resource_id).await?;
        self.repository.maintenance.get_for_resource(resource_id).await
    }

    /// Complete, cancel or start an incident, then refresh the summary and
    /// release the resource when all its incidents are completed.
    pub async fn update_incident_status(
        &self,
        incident_id: i32,
        status: IncidentStatus,
        now: DateTime<Utc>,
    ) -> AppResult<(MaintenanceIncident, MaintenanceResourceSummary)> {
        let mut tx = self.repository.begin().await?;

        // resource first, same lock order as returns
        let resource_id = self
            .repository
            .maintenance
            .get_incident(&mut *tx, incident_id)
            .await?
            .resource_id;
        let resource = self.repository.resources.lock(&mut tx, resource_id).await?;
        let incident = self.repository.maintenance.lock_incident(&mut tx, incident_id).await?;

        if !MaintenanceIncidentAggregator::can_transition(incident.status, status) {
            return Err(AppError::InvalidTransition(format!(
                "Incident {} cannot go from {} to {}",
                incident_id, incident.status, status
            )));
        }

        let incidents = self.repository.maintenance.list_for_resource(&mut *tx, resource_id).await?;
        if MaintenanceIncidentAggregator::would_strand(&incidents, incident_id, status) {
            return Err(AppError::InvalidTransition(format!(
                "Cancelling incident {} would close every incident of resource {} without a repair",
                incident_id, resource_id
            )));
        }

        let updated = self
            .repository
            .maintenance
            .set_incident_status(&mut tx, incident_id, status, now)
            .await?;
        let (_, summary) = ResourceStatusSync::settle(&self.repository, &mut tx, &resource, now).await?;

        tx.commit().await?;

        tracing::info!(
            "Incident {} of resource {} is now {} ({}% complete)",
            incident_id,
            resource_id,
            status,
            summary.completion_percentage
        );
        Ok((updated, summary))
    }
}
