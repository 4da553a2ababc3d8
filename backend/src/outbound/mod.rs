//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **storage**: asset bytes written beneath a local directory
//! - **ids**: UUID-based identifier generation
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod ids;
pub mod persistence;
pub mod storage;

pub use ids::UuidIdGenerator;
pub use storage::DirectoryObjectStorage;
