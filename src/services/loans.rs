//! Loan lifecycle service
//!
//! Status and overdue days of a loan are never stored on their own: they are
//! always the output of [`compute_status`] and [`compute_overdue_days`] for
//! the loan's dates and a caller-supplied `now`.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgConnection;

use crate::{
    config::{LoansConfig, MaintenanceConfig},
    error::{AppError, AppResult},
    models::{
        damage_report::{DamageReport, DecodedNotes},
        enums::{LoanStatus, ResourceStatus},
        loan::{CreateLoan, DamageInput, LoanDetails, ReturnOutcome},
        resource::Resource,
    },
    notes,
    repository::Repository,
};

use super::{maintenance::MaintenanceIncidentAggregator, resources::ResourceStatusSync};

/// Status of an authorized loan at `now`
pub fn compute_status(
    expected_return: DateTime<Utc>,
    actual_return: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> LoanStatus {
    if actual_return.is_some() {
        LoanStatus::Returned
    } else if expected_return < now {
        LoanStatus::Overdue
    } else {
        LoanStatus::Active
    }
}

/// Whole days between expected and actual return, never negative
pub fn compute_overdue_days(
    expected_return: Option<DateTime<Utc>>,
    actual_return: Option<DateTime<Utc>>,
) -> Option<i32> {
    let (expected, actual) = (expected_return?, actual_return?);
    let days = (actual - expected).num_days().max(0);
    Some(i32::try_from(days).unwrap_or(i32::MAX))
}

/// Structured reports must name resources the notes grammar can carry
fn check_report_ids(reports: &[DamageReport]) -> AppResult<()> {
    match reports
        .iter()
        .find(|r| !r.is_empty() && !notes::is_writable_resource_id(&r.resource_id))
    {
        Some(report) => Err(AppError::Validation(format!(
            "Invalid resource id in damage report: {:?}",
            report.resource_id
        ))),
        None => Ok(()),
    }
}

/// A loan cannot come back before it went out
fn check_return_date(loan_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> AppResult<()> {
    if returned_at < loan_date {
        return Err(AppError::Validation(format!(
            "Return date {} is before the loan date {}",
            returned_at, loan_date
        )));
    }
    Ok(())
}

/// Reports matched to the loan's resources, plus the resource ids that matched nothing
#[derive(Debug, Default)]
struct AssignedReports {
    by_resource: HashMap<i32, DamageReport>,
    unattached: Vec<String>,
}

/// Match decoded reports to the loan's resources. A report without a
/// resource marker goes to the loan's only resource, if it has exactly one.
/// Damage without a marker on a loan with several resources cannot be placed
/// and fails the return.
fn assign_reports(attached: &[i32], reports: Vec<DamageReport>) -> AppResult<AssignedReports> {
    let mut assigned = AssignedReports::default();

    for report in reports {
        let target = if report.resource_id == notes::DEFAULT_RESOURCE {
            match attached {
                [only] => Some(*only),
                _ if report.has_damage() => {
                    return Err(AppError::BadRequest(format!(
                        "Damage reported without a resource marker on a loan with {} resources",
                        attached.len()
                    )));
                }
                _ => {
                    tracing::warn!(
                        "Ignoring suggestions without resource marker on a loan with {} resources",
                        attached.len()
                    );
                    continue;
                }
            }
        } else {
            report
                .resource_id
                .parse::<i32>()
                .ok()
                .filter(|id| attached.contains(id))
        };

        let Some(resource_id) = target else {
            assigned.unattached.push(report.resource_id);
            continue;
        };

        match assigned.by_resource.get_mut(&resource_id) {
            Some(existing) => merge_report(existing, report),
            None => {
                assigned.by_resource.insert(resource_id, report);
            }
        }
    }

    Ok(assigned)
}

fn merge_report(into: &mut DamageReport, from: DamageReport) {
    into.damages.extend(from.damages);
    into.suggestions.extend(from.suggestions);
    for (target, note) in [
        (&mut into.damage_note, from.damage_note),
        (&mut into.suggestion_note, from.suggestion_note),
    ] {
        if note.is_empty() {
            continue;
        }
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(&note);
    }
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
    maintenance: MaintenanceConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig, maintenance: MaintenanceConfig) -> Self {
        Self {
            repository,
            config,
            maintenance,
        }
    }

    /// Get a loan with its resources
    pub async fn get_loan(&self, loan_id: i32) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        let resource_ids = self.repository.loans.get_resource_ids(loan_id).await?;
        Ok(LoanDetails { loan, resource_ids })
    }

    /// Decode the damage reports written into a loan's notes at return
    pub async fn get_loan_damage_reports(&self, loan_id: i32) -> AppResult<DecodedNotes> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        if loan.actual_return.is_none() {
            return Ok(DecodedNotes::default());
        }
        Ok(notes::decode(loan.notes.as_deref().map(notes::latest_event)))
    }

    /// Request a loan. It stays pending until authorized.
    pub async fn create_loan(&self, data: &CreateLoan, now: DateTime<Utc>) -> AppResult<LoanDetails> {
        let mut resource_ids = data.resource_ids.clone();
        resource_ids.sort_unstable();
        resource_ids.dedup();

        let expected_return = data
            .expected_return
            .unwrap_or_else(|| now + Duration::days(self.config.default_duration_days));
        if expected_return <= now {
            return Err(AppError::Validation(
                "Expected return date must be in the future".to_string(),
            ));
        }

        let mut tx = self.repository.begin().await?;

        if !self.repository.loans.borrower_exists(&mut tx, data.borrower_id).await? {
            return Err(AppError::NotFound(format!("Borrower {} not found", data.borrower_id)));
        }

        let resources = self.repository.resources.lock_many(&mut tx, &resource_ids).await?;
        if let Some(busy) = resources.iter().find(|r| r.status != ResourceStatus::Available) {
            return Err(AppError::BusinessRule(format!(
                "Resource {} is not available (status: {})",
                busy.id, busy.status
            )));
        }

        let loan = self
            .repository
            .loans
            .create(&mut tx, data.borrower_id, now, expected_return, data.notes.as_deref())
            .await?;
        self.repository.loans.attach_resources(&mut tx, loan.id, &resource_ids).await?;

        tx.commit().await?;

        tracing::info!("Loan {} requested by borrower {}", loan.id, loan.borrower_id);
        Ok(LoanDetails { loan, resource_ids })
    }

    /// Authorize a pending loan and hand its resources out
    pub async fn authorize_loan(&self, loan_id: i32, now: DateTime<Utc>) -> AppResult<LoanDetails> {
        let mut tx = self.repository.begin().await?;

        let mut loan = self.repository.loans.lock(&mut tx, loan_id).await?;
        if loan.status != LoanStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Loan {} is {}, only pending loans can be authorized",
                loan_id, loan.status
            )));
        }

        let resource_ids = self.repository.loans.resource_ids(&mut *tx, loan_id).await?;
        let resources = self.repository.resources.lock_many(&mut tx, &resource_ids).await?;
        ResourceStatusSync::mark_loaned(&self.repository, &mut tx, &resources, now).await?;

        loan.status = compute_status(loan.expected_return, loan.actual_return, now);
        self.repository.loans.set_status(&mut tx, loan_id, loan.status).await?;

        tx.commit().await?;

        tracing::info!("Loan {} authorized ({})", loan_id, loan.status);
        Ok(LoanDetails { loan, resource_ids })
    }

    /// Recompute the status of every unreturned authorized loan. Returns how many changed.
    pub async fn refresh_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tx = self.repository.begin().await?;

        let mut changed = 0;
        for loan in self.repository.loans.lock_open(&mut tx).await? {
            let status = compute_status(loan.expected_return, loan.actual_return, now);
            if status != loan.status {
                self.repository.loans.set_status(&mut tx, loan.id, status).await?;
                changed += 1;
            }
        }

        tx.commit().await?;

        if changed > 0 {
            tracing::info!("Overdue refresh updated {} loans", changed);
        }
        Ok(changed)
    }

    /// Return a loan.
    ///
    /// One transaction covers the loan update, every resource status write and
    /// the incidents created from the damage reports: either all of it is
    /// committed or nothing is.
    pub async fn return_loan(
        &self,
        loan_id: i32,
        input: Option<DamageInput>,
        now: DateTime<Utc>,
    ) -> AppResult<ReturnOutcome> {
        let mut tx = self.repository.begin().await?;

        // row lock: a concurrent return waits here, then sees AlreadyReturned
        let loan = self.repository.loans.lock(&mut tx, loan_id).await?;
        if loan.actual_return.is_some() || loan.status == LoanStatus::Returned {
            return Err(AppError::AlreadyReturned(loan_id));
        }
        if loan.status == LoanStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Loan {} was never authorized",
                loan_id
            )));
        }

        check_return_date(loan.loan_date, now)?;

        let event_notes = self.event_notes(input, now)?;
        let decoded = notes::decode(event_notes.as_deref());
        tracing::debug!("Loan {} return carries {} damage reports", loan_id, decoded.reports.len());

        let resource_ids = self.repository.loans.resource_ids(&mut *tx, loan_id).await?;
        let assigned = assign_reports(&resource_ids, decoded.reports)?;
        self.reject_unattached(&mut tx, loan_id, &assigned.unattached).await?;

        let resources = self.repository.resources.lock_many(&mut tx, &resource_ids).await?;

        let status = compute_status(loan.expected_return, Some(now), now);
        let overdue_days = compute_overdue_days(Some(loan.expected_return), Some(now));
        let loan_notes = notes::append_event(loan.notes.as_deref(), event_notes.as_deref());
        self.repository
            .loans
            .mark_returned(&mut tx, loan_id, now, status, overdue_days, loan_notes.as_deref())
            .await?;

        let changes = ResourceStatusSync::apply_return(
            &self.repository,
            &mut tx,
            &resources,
            &assigned.by_resource,
            now,
        )
        .await?;

        let reporter = self.repository.loans.reporter(&mut tx, loan.borrower_id).await?;
        let mut incidents_created = 0;

        for (resource, change) in resources.iter().zip(&changes) {
            let Some(report) = assigned.by_resource.get(&resource.id).filter(|r| r.has_damage()) else {
                continue;
            };

            incidents_created += MaintenanceIncidentAggregator::record_return(
                &self.repository,
                &mut tx,
                resource.id,
                change.previous,
                report,
                &reporter,
                &self.maintenance,
                now,
            )
            .await?;

            let current = Resource {
                status: change.status,
                modif_date: Some(now),
                ..resource.clone()
            };
            MaintenanceIncidentAggregator::refresh_summary(&self.repository, &mut tx, &current, now).await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Loan {} returned ({}, {} days overdue), {} resources resolved, {} incidents created",
            loan_id,
            status,
            overdue_days.unwrap_or(0),
            changes.len(),
            incidents_created
        );

        Ok(ReturnOutcome {
            loan_id,
            status,
            overdue_days,
            resources: changes,
            incidents_created,
        })
    }

    /// Notes text of one return event, in the persisted format
    fn event_notes(&self, input: Option<DamageInput>, now: DateTime<Utc>) -> AppResult<Option<String>> {
        let Some(input) = input else {
            return Ok(None);
        };
        match input {
            DamageInput::Reports(reports) => {
                check_report_ids(&reports)?;
                let mut timestamp = String::new();
                if write!(timestamp, "{}", now.format(&self.config.notes_timestamp_format)).is_err() {
                    timestamp = now.to_rfc3339();
                }
                Ok(Some(notes::encode(&reports, Some(&timestamp))).filter(|text| !text.is_empty()))
            }
            DamageInput::Notes(text) => Ok(Some(text).filter(|text| !text.trim().is_empty())),
        }
    }

    /// Fail when a report names a resource that is missing or not on this loan
    async fn reject_unattached(&self, conn: &mut PgConnection, loan_id: i32, unattached: &[String]) -> AppResult<()> {
        let Some(resource_id) = unattached.first() else {
            return Ok(());
        };

        let exists = match resource_id.parse::<i32>() {
            Ok(id) => self.repository.resources.exists(conn, id).await?,
            Err(_) => false,
        };

        if exists {
            Err(AppError::BadRequest(format!(
                "Resource {} is not part of loan {}",
                resource_id, loan_id
            )))
        } else {
            Err(AppError::ResourceNotFound(resource_id.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn report(id: &str, damages: &[&str], note: &str) -> DamageReport {
        DamageReport {
            resource_id: id.to_string(),
            damages: damages.iter().map(|s| s.to_string()).collect(),
            damage_note: note.to_string(),
            ..DamageReport::default()
        }
    }

    #[test]
    fn test_overdue_days() {
        assert_eq!(compute_overdue_days(Some(date(2024, 1, 10)), Some(date(2024, 1, 15))), Some(5));
        assert_eq!(compute_overdue_days(Some(date(2024, 1, 10)), Some(date(2024, 1, 5))), Some(0));
        assert_eq!(compute_overdue_days(Some(date(2024, 1, 10)), None), None);
        assert_eq!(compute_overdue_days(None, Some(date(2024, 1, 10))), None);
    }

    #[test]
    fn test_overdue_days_counts_whole_days() {
        let expected = date(2024, 1, 10);
        assert_eq!(compute_overdue_days(Some(expected), Some(expected + Duration::hours(23))), Some(0));
        assert_eq!(compute_overdue_days(Some(expected), Some(expected + Duration::hours(49))), Some(2));
    }

    #[test]
    fn test_status_derivation() {
        let today = date(2024, 1, 10);
        let tomorrow = today + Duration::days(1);
        let yesterday = today - Duration::days(1);

        assert_eq!(compute_status(tomorrow, None, today), LoanStatus::Active);
        assert_eq!(compute_status(yesterday, None, today), LoanStatus::Overdue);
        assert_eq!(compute_status(yesterday, Some(today), today), LoanStatus::Returned);
        assert_eq!(compute_status(tomorrow, Some(today), today), LoanStatus::Returned);
        assert_eq!(compute_status(today, None, today), LoanStatus::Active);
    }

    #[test]
    fn test_return_date_not_before_loan_date() {
        let loan_date = date(2024, 1, 10);
        assert!(check_return_date(loan_date, loan_date).is_ok());
        assert!(check_return_date(loan_date, date(2024, 1, 12)).is_ok());
        assert!(matches!(
            check_return_date(loan_date, date(2024, 1, 9)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_report_ids_must_be_writable() {
        assert!(check_report_ids(&[report("12", &["Dent"], "")]).is_ok());
        assert!(check_report_ids(&[report("7]", &[], "")]).is_ok());
        assert!(matches!(
            check_report_ids(&[report("12", &["Dent"], ""), report("7]", &["Crack"], "")]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            check_report_ids(&[report("5\nDamages: [Injected]", &[], "wipe")]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_default_report_goes_to_single_resource() {
        let assigned = assign_reports(&[12], vec![report(notes::DEFAULT_RESOURCE, &["Dent"], "")]).unwrap();
        assert!(assigned.unattached.is_empty());
        assert_eq!(assigned.by_resource[&12].damages, vec!["Dent"]);
    }

    #[test]
    fn test_unmarked_damage_on_multi_resource_loan_is_rejected() {
        let decoded = notes::decode(Some("Damages: [Cracked Screen] | Notes: \"dropped\""));
        assert!(matches!(
            assign_reports(&[1, 2], decoded.reports),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_unmarked_suggestions_on_multi_resource_loan_are_skipped() {
        let decoded = notes::decode(Some("Suggestions: [Add case]"));
        let assigned = assign_reports(&[1, 2], decoded.reports).unwrap();
        assert!(assigned.by_resource.is_empty());
        assert!(assigned.unattached.is_empty());
    }

    #[test]
    fn test_unknown_resources_are_reported() {
        let assigned =
            assign_reports(&[1, 2], vec![report("R1", &["Dent"], ""), report("3", &["Scratch"], "")]).unwrap();
        assert_eq!(assigned.unattached, vec!["R1".to_string(), "3".to_string()]);
    }

    #[test]
    fn test_reports_for_same_resource_are_merged() {
        let assigned = assign_reports(
            &[4],
            vec![report(notes::DEFAULT_RESOURCE, &["Dent"], "left"), report("4", &["Crack"], "right")],
        )
        .unwrap();
        let merged = &assigned.by_resource[&4];
        assert_eq!(merged.damages, vec!["Dent", "Crack"]);
        assert_eq!(merged.damage_note, "left right");
    }

    #[test]
    fn test_return_pipeline_scenario() {
        // notes -> reports -> resource status -> incidents, without the database
        let decoded = notes::decode(Some(
            "[Resource ID 1]\nDamages: [Cracked Screen, Broken Hinge] | Notes: \"dropped\"",
        ));
        let assigned = assign_reports(&[1, 2], decoded.reports).unwrap();
        assert!(assigned.unattached.is_empty());

        let statuses: Vec<_> = [1, 2]
            .iter()
            .map(|id| ResourceStatusSync::status_after_return(assigned.by_resource.get(id)))
            .collect();
        assert_eq!(statuses, vec![ResourceStatus::Damaged, ResourceStatus::Available]);
        assert!(statuses.iter().all(|s| *s != ResourceStatus::Loaned));

        let incidents = MaintenanceIncidentAggregator::plan_incidents(
            1,
            0,
            ResourceStatus::Loaned,
            &assigned.by_resource[&1],
            &Default::default(),
            &MaintenanceConfig::default(),
            date(2024, 1, 15),
        );
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].incident_number, 1);
        assert_eq!(incidents[1].incident_number, 2);
        assert_eq!(incidents[0].description, "dropped");
    }
}
