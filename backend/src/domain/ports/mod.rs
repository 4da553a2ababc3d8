//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports cover the operation and invoice stores, the patient registry
//! lookup, identifier generation, and asset object storage. Time comes from
//! [`mockable::Clock`].

mod macros;
pub(crate) use macros::define_port_error;

mod id_generator;
mod invoice_repository;
mod object_storage;
mod operation_repository;
mod patient_repository;

#[cfg(test)]
pub use id_generator::MockIdGenerator;
pub use id_generator::IdGenerator;
#[cfg(test)]
pub use invoice_repository::MockInvoiceRepository;
pub use invoice_repository::{InvoiceRepository, InvoiceRepositoryError};
#[cfg(test)]
pub use object_storage::MockObjectStorage;
pub use object_storage::{ObjectStorage, ObjectStorageError, asset_object_key};
#[cfg(test)]
pub use operation_repository::MockOperationRepository;
pub use operation_repository::{
    OperationRepository, OperationRepositoryError, PATIENT_OPERATIONS_PAGE_SIZE,
};
#[cfg(test)]
pub use patient_repository::MockPatientRepository;
pub use patient_repository::{PatientRepository, PatientRepositoryError};
