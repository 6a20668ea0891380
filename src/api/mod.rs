//! API handlers for the equipment loan REST endpoints

pub mod health;
pub mod loans;
pub mod maintenance;
pub mod openapi;
pub mod resources;
