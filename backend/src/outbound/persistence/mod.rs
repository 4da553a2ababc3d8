//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories are thin: they translate between Diesel rows and domain
//! aggregates and map failures onto port errors. Rows (`models.rs`) and table
//! definitions (`schema.rs`) never leave this module.
//!
//! # Example
//!
//! ```ignore
//! use clinic_backend::outbound::persistence::{DbPool, DieselPatientRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/clinic")).await?;
//! let patients = DieselPatientRepository::new(pool);
//! ```

mod diesel_error_mapping;
mod diesel_invoice_repository;
mod diesel_operation_repository;
mod diesel_patient_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_invoice_repository::DieselInvoiceRepository;
pub use diesel_operation_repository::DieselOperationRepository;
pub use diesel_patient_repository::DieselPatientRepository;
pub use migrations::{
    MIGRATIONS, MigrationError, run_pending_migrations, run_pending_migrations_async,
};
pub use pool::{DbPool, PoolConfig, PoolError};
