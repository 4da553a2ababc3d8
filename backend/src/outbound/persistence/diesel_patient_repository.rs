//! PostgreSQL-backed patient lookup.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PatientRepository, PatientRepositoryError};
use crate::domain::{Patient, PatientId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::PatientRow;
use super::pool::DbPool;
use super::schema::patients;

/// Diesel-backed implementation of the patient repository port.
#[derive(Clone)]
pub struct DieselPatientRepository {
    pool: DbPool,
}

impl DieselPatientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_patient(row: PatientRow) -> Result<Patient, PatientRepositoryError> {
    let id = PatientId::new(row.id)
        .map_err(|err| PatientRepositoryError::query(format!("decode patient id: {err}")))?;
    Ok(Patient::new(id, row.full_name))
}

#[async_trait]
impl PatientRepository for DieselPatientRepository {
    async fn retrieve(
        &self,
        patient_id: &PatientId,
    ) -> Result<Option<Patient>, PatientRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, PatientRepositoryError::connection))?;

        patients::table
            .find(patient_id.as_str())
            .select(PatientRow::as_select())
            .first::<PatientRow>(&mut conn)
            .await
            .optional()
            .map_err(|err| {
                map_diesel_error(
                    err,
                    PatientRepositoryError::query,
                    PatientRepositoryError::connection,
                )
            })?
            .map(row_to_patient)
            .transpose()
    }
}
