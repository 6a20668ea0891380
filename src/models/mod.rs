//! Data models for the equipment loan pipeline

pub mod damage_report;
pub mod enums;
pub mod loan;
pub mod maintenance;
pub mod resource;

// Re-export commonly used types
pub use damage_report::{DamageReport, DecodedNotes};
pub use enums::{IncidentPriority, IncidentStatus, LoanStatus, OverallStatus, ResourceStatus};
pub use loan::{DamageInput, Loan, LoanDetails, ReturnOutcome};
pub use maintenance::{MaintenanceIncident, MaintenanceResourceSummary, NewIncident, ReporterContext};
pub use resource::Resource;
