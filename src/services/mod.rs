//! Business logic services

pub mod loans;
pub mod maintenance;
pub mod resources;

use crate::{
    config::{LoansConfig, MaintenanceConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub loans: loans::LoansService,
    pub resources: resources::ResourcesService,
    pub maintenance: maintenance::MaintenanceService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, loans_config: LoansConfig, maintenance_config: MaintenanceConfig) -> Self {
        Self {
            loans: loans::LoansService::new(repository.clone(), loans_config, maintenance_config),
            resources: resources::ResourcesService::new(repository.clone()),
            maintenance: maintenance::MaintenanceService::new(repository.clone()),
            repository,
        }
    }
}
