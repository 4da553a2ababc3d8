//! Operation orchestration service.
//!
//! Every mutation follows the same order: validate the request, resolve the
//! referenced aggregate, then write. Failures before the write leave storage
//! untouched.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, info};

use crate::domain::Error;
use crate::domain::ports::{
    IdGenerator, ObjectStorage, ObjectStorageError, OperationRepository,
    OperationRepositoryError, PatientRepository, PatientRepositoryError, asset_object_key,
};
use crate::domain::validation::{CompositeValidator, OperationValidator, ValidationError};
use crate::domain::{
    AssetUpload, CreateOperationRequest, OperationId, OperationInvariantError, OperationRevision,
    PatientId, PatientOperation, PatientOperationDraft, UpdateOperationRequest,
};

pub(crate) fn map_operation_repository_error(error: OperationRepositoryError) -> Error {
    match error {
        OperationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("operation repository unavailable: {message}"))
        }
        OperationRepositoryError::Query { message } => {
            Error::internal(format!("operation repository error: {message}"))
        }
    }
}

fn map_patient_repository_error(error: PatientRepositoryError) -> Error {
    match error {
        PatientRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("patient repository unavailable: {message}"))
        }
        PatientRepositoryError::Query { message } => {
            Error::internal(format!("patient repository error: {message}"))
        }
    }
}

fn map_storage_error(error: ObjectStorageError) -> Error {
    match error {
        ObjectStorageError::InvalidKey { key } => {
            Error::invalid_request(format!("asset cannot be stored under '{key}'"))
        }
        ObjectStorageError::Upload { .. } => Error::internal(error.to_string()),
    }
}

pub(crate) fn map_validation_error(error: ValidationError) -> Error {
    Error::invalid_request(error.to_string())
}

fn map_invariant_error(error: OperationInvariantError) -> Error {
    Error::invalid_request(error.to_string())
}

fn operation_not_found(operation_id: &OperationId) -> Error {
    Error::not_found(format!("operation {operation_id} not found"))
}

fn validate_note_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        Err(ValidationError::BlankNote)
    } else if content.contains('\0') {
        Err(ValidationError::NulInNote)
    } else {
        Ok(())
    }
}

/// Asset names are stored verbatim and used as the last object key segment.
fn validate_asset_name(name: &str) -> Result<(), ValidationError> {
    let is_bare_file_name = !name.trim().is_empty()
        && name.trim() == name
        && !matches!(name, "." | "..")
        && !name.contains(['/', '\\', '\0']);
    if is_bare_file_name {
        Ok(())
    } else {
        Err(ValidationError::InvalidAssetName {
            name: name.to_owned(),
        })
    }
}

/// Domain service for creating and mutating patient operations.
#[derive(Clone)]
pub struct OperationService<O, P> {
    operations: Arc<O>,
    patients: Arc<P>,
    ids: Arc<dyn IdGenerator>,
    storage: Arc<dyn ObjectStorage>,
    clock: Arc<dyn Clock>,
    validator: Arc<dyn OperationValidator>,
}

impl<O, P> OperationService<O, P> {
    /// Create a service using the standard validation pipeline.
    pub fn new(
        operations: Arc<O>,
        patients: Arc<P>,
        ids: Arc<dyn IdGenerator>,
        storage: Arc<dyn ObjectStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            operations,
            patients,
            ids,
            storage,
            clock,
            validator: Arc::new(CompositeValidator::standard()),
        }
    }

    /// Replace the validation pipeline.
    pub fn with_validator(mut self, validator: Arc<dyn OperationValidator>) -> Self {
        self.validator = validator;
        self
    }
}

impl<O, P> OperationService<O, P>
where
    O: OperationRepository,
    P: PatientRepository,
{
    /// Validate, confirm the patient exists, then persist a fresh operation.
    pub async fn create_operation(
        &self,
        request: CreateOperationRequest,
    ) -> Result<PatientOperation, Error> {
        let CreateOperationRequest {
            patient_id,
            operation,
        } = request;

        self.validator
            .validate(&operation)
            .map_err(map_validation_error)?;

        self.patients
            .retrieve(&patient_id)
            .await
            .map_err(map_patient_repository_error)?
            .ok_or_else(|| Error::not_found(format!("patient {patient_id} not found")))?;

        let id = self.ids.new_operation_id();
        let now = self.clock.utc();
        let aggregate = PatientOperation::new(PatientOperationDraft {
            id,
            patient_id,
            operation_type: operation.operation_type,
            description: operation.description,
            executor: operation.executor,
            assets: Vec::new(),
            additional_notes: Vec::new(),
            creation_date_time: now,
            last_update: now,
            estimated_cost: operation.estimated_cost,
            details: operation.details,
        })
        .map_err(map_invariant_error)?;

        let saved = self
            .operations
            .save(&aggregate)
            .await
            .map_err(map_operation_repository_error)?;
        info!(
            operation_id = %saved.id(),
            patient_id = %saved.patient_id(),
            "operation created"
        );
        Ok(saved)
    }

    /// Re-save an existing operation with new content and asset list.
    ///
    /// Notes and creation time are preserved.
    pub async fn update_operation(
        &self,
        operation_id: &OperationId,
        request: UpdateOperationRequest,
    ) -> Result<PatientOperation, Error> {
        let UpdateOperationRequest { operation, assets } = request;

        self.validator
            .validate(&operation)
            .map_err(map_validation_error)?;
        assets
            .iter()
            .try_for_each(|asset| validate_asset_name(asset))
            .map_err(map_validation_error)?;

        let current = self.get_operation(operation_id).await?;
        let revised = current
            .revise(
                OperationRevision {
                    operation_type: operation.operation_type,
                    description: operation.description,
                    executor: operation.executor,
                    assets,
                    estimated_cost: operation.estimated_cost,
                    details: operation.details,
                },
                self.clock.utc(),
            )
            .map_err(map_invariant_error)?;

        let saved = self
            .operations
            .save(&revised)
            .await
            .map_err(map_operation_repository_error)?;
        info!(operation_id = %saved.id(), "operation updated");
        Ok(saved)
    }

    /// Fetch an operation, failing with not-found when absent.
    pub async fn get_operation(
        &self,
        operation_id: &OperationId,
    ) -> Result<PatientOperation, Error> {
        self.operations
            .retrieve(operation_id)
            .await
            .map_err(map_operation_repository_error)?
            .ok_or_else(|| operation_not_found(operation_id))
    }

    /// Most recent operations for a patient.
    pub async fn list_patient_operations(
        &self,
        patient_id: &PatientId,
    ) -> Result<Vec<PatientOperation>, Error> {
        self.operations
            .find_by_patient_id(patient_id)
            .await
            .map_err(map_operation_repository_error)
    }

    /// Append a note to an operation.
    pub async fn add_operation_note(
        &self,
        operation_id: &OperationId,
        content: &str,
    ) -> Result<PatientOperation, Error> {
        validate_note_content(content).map_err(map_validation_error)?;

        let updated = self
            .operations
            .add_note(operation_id, content)
            .await
            .map_err(map_operation_repository_error)?
            .ok_or_else(|| operation_not_found(operation_id))?;
        info!(operation_id = %operation_id, "operation note added");
        Ok(updated)
    }

    /// Upload an asset and record its reference on the operation.
    ///
    /// The reference is only recorded once the upload succeeds.
    pub async fn add_operation_asset(
        &self,
        operation_id: &OperationId,
        upload: AssetUpload,
    ) -> Result<PatientOperation, Error> {
        validate_asset_name(&upload.asset_name).map_err(map_validation_error)?;
        self.get_operation(operation_id).await?;

        let key = asset_object_key(operation_id, &upload.asset_name);
        self.storage
            .upload(&key, &upload.bytes, &upload.content_type)
            .await
            .map_err(map_storage_error)?;
        debug!(key = %key, bytes = upload.bytes.len(), "asset uploaded");

        let updated = self
            .operations
            .add_asset(operation_id, &upload.asset_name)
            .await
            .map_err(map_operation_repository_error)?
            .ok_or_else(|| operation_not_found(operation_id))?;
        info!(operation_id = %operation_id, asset = %upload.asset_name, "operation asset added");
        Ok(updated)
    }
}

#[cfg(test)]
#[path = "operation_service_tests.rs"]
mod tests;
