//! Clinic operations core: patient operations, invoices, and their storage.
//!
//! `domain` holds aggregates, the validation pipeline, services, and the port
//! traits they drive; `outbound` implements those ports over PostgreSQL and the
//! local filesystem.

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
