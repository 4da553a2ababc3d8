//! PostgreSQL-backed `OperationRepository` implementation using Diesel ORM.
//!
//! The aggregate spans `operations`, `operation_notes`, and
//! `operation_assets`. Every write path runs in one transaction; reads
//! assemble children for a batch of parents with one query per child table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Timestamptz;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{
    OperationRepository, OperationRepositoryError, PATIENT_OPERATIONS_PAGE_SIZE,
};
use crate::domain::{
    CurrencyCode, Detail, Money, OperationId, OperationNote, PatientId, PatientOperation,
    PatientOperationDraft, stored_precision,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    AssetRow, NewAssetRow, NewNoteRow, NewOperationRow, NoteRow, OperationRow, OperationUpdate,
};
use super::pool::DbPool;
use super::schema::{operation_assets, operation_notes, operations};

/// Diesel-backed implementation of the operation repository port.
#[derive(Clone)]
pub struct DieselOperationRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselOperationRepository {
    /// `clock` stamps notes and `last_update` on the append paths.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn diesel_error(error: diesel::result::Error) -> OperationRepositoryError {
    map_diesel_error(
        error,
        OperationRepositoryError::query,
        OperationRepositoryError::connection,
    )
}

fn encode_details(details: &[Detail]) -> Result<serde_json::Value, OperationRepositoryError> {
    serde_json::to_value(details)
        .map_err(|err| OperationRepositoryError::query(format!("serialise details: {err}")))
}

fn decode_details(details: serde_json::Value) -> Result<Vec<Detail>, OperationRepositoryError> {
    serde_json::from_value(details)
        .map_err(|err| OperationRepositoryError::query(format!("decode details: {err}")))
}

fn decode_query<T, E: std::fmt::Display>(
    value: Result<T, E>,
    field: &str,
) -> Result<T, OperationRepositoryError> {
    value.map_err(|err| OperationRepositoryError::query(format!("decode {field}: {err}")))
}

/// Assemble one aggregate from its parent row and already-ordered children.
fn row_to_operation(
    row: OperationRow,
    notes: Vec<OperationNote>,
    assets: Vec<String>,
) -> Result<PatientOperation, OperationRepositoryError> {
    let OperationRow {
        id,
        patient_id,
        operation_type,
        description,
        executor,
        estimated_cost_amount,
        estimated_cost_currency,
        details,
        created_at,
        last_update,
    } = row;

    let currency = decode_query(CurrencyCode::new(estimated_cost_currency), "currency")?;
    PatientOperation::new(PatientOperationDraft {
        id: decode_query(OperationId::new(id), "operation id")?,
        patient_id: decode_query(PatientId::new(patient_id), "patient id")?,
        operation_type,
        description,
        executor,
        assets,
        additional_notes: notes,
        creation_date_time: created_at,
        last_update,
        estimated_cost: Money::new(estimated_cost_amount, currency),
        details: decode_details(details)?,
    })
    .map_err(|err| OperationRepositoryError::query(err.to_string()))
}

/// Load notes and assets for `rows` and assemble aggregates in row order.
async fn assemble(
    conn: &mut AsyncPgConnection,
    rows: Vec<OperationRow>,
) -> Result<Vec<PatientOperation>, OperationRepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();

    let note_rows: Vec<NoteRow> = operation_notes::table
        .filter(operation_notes::operation_id.eq_any(ids.clone()))
        .order((operation_notes::created_at.desc(), operation_notes::id.desc()))
        .select(NoteRow::as_select())
        .load(conn)
        .await
        .map_err(diesel_error)?;
    let asset_rows: Vec<AssetRow> = operation_assets::table
        .filter(operation_assets::operation_id.eq_any(ids))
        .order(operation_assets::id.asc())
        .select(AssetRow::as_select())
        .load(conn)
        .await
        .map_err(diesel_error)?;

    let mut notes: HashMap<String, Vec<OperationNote>> = HashMap::new();
    for note in note_rows {
        notes
            .entry(note.operation_id)
            .or_default()
            .push(OperationNote::new(note.content, note.created_at));
    }
    let mut assets: HashMap<String, Vec<String>> = HashMap::new();
    for asset in asset_rows {
        assets
            .entry(asset.operation_id)
            .or_default()
            .push(asset.asset_name);
    }

    rows.into_iter()
        .map(|row| {
            let row_notes = notes.remove(&row.id).unwrap_or_default();
            let row_assets = assets.remove(&row.id).unwrap_or_default();
            row_to_operation(row, row_notes, row_assets)
        })
        .collect()
}

async fn load_operation(
    conn: &mut AsyncPgConnection,
    operation_id: &OperationId,
) -> Result<Option<PatientOperation>, OperationRepositoryError> {
    let row = operations::table
        .find(operation_id.as_str())
        .select(OperationRow::as_select())
        .first::<OperationRow>(conn)
        .await
        .optional()
        .map_err(diesel_error)?;
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(assemble(conn, vec![row]).await?.pop())
}

/// Bump the parent's `last_update` (never backwards), taking its row lock for
/// the rest of the transaction. Returns `false` when the operation does not
/// exist.
async fn touch_parent(
    conn: &mut AsyncPgConnection,
    operation_id: &OperationId,
    now: DateTime<Utc>,
) -> QueryResult<bool> {
    let bumped = sql::<Timestamptz>("GREATEST(last_update, ")
        .bind::<Timestamptz, _>(now)
        .sql(")");
    let touched = diesel::update(operations::table.find(operation_id.as_str()))
        .set(operations::last_update.eq(bumped))
        .execute(conn)
        .await?;
    Ok(touched == 1)
}

#[async_trait]
impl OperationRepository for DieselOperationRepository {
    async fn retrieve(
        &self,
        operation_id: &OperationId,
    ) -> Result<Option<PatientOperation>, OperationRepositoryError> {
        let mut pooled = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, OperationRepositoryError::connection))?;
        load_operation(&mut pooled, operation_id).await
    }

    async fn save(
        &self,
        operation: &PatientOperation,
    ) -> Result<PatientOperation, OperationRepositoryError> {
        let details = encode_details(operation.details())?;
        let cost = operation.estimated_cost();
        let id = operation.id().as_str();

        let new_row = NewOperationRow {
            id,
            patient_id: operation.patient_id().as_str(),
            operation_type: operation.operation_type(),
            description: operation.description(),
            executor: operation.executor(),
            estimated_cost_amount: cost.amount(),
            estimated_cost_currency: cost.currency().as_str(),
            details: &details,
            created_at: operation.creation_date_time(),
            last_update: operation.last_update(),
        };
        let update = OperationUpdate {
            patient_id: new_row.patient_id,
            operation_type: new_row.operation_type,
            description: new_row.description,
            executor: new_row.executor,
            estimated_cost_amount: new_row.estimated_cost_amount,
            estimated_cost_currency: new_row.estimated_cost_currency,
            details: &details,
            last_update: new_row.last_update,
        };
        // Oldest first so the serial id breaks creation-time ties newest first.
        let note_rows: Vec<NewNoteRow<'_>> = operation
            .additional_notes()
            .iter()
            .rev()
            .map(|note| NewNoteRow {
                operation_id: id,
                content: note.content(),
                created_at: note.creation_time(),
            })
            .collect();
        let asset_rows: Vec<NewAssetRow<'_>> = operation
            .assets()
            .iter()
            .map(|asset| NewAssetRow {
                operation_id: id,
                asset_name: asset.as_str(),
            })
            .collect();

        let mut pooled = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, OperationRepositoryError::connection))?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let inserted = conn
            .transaction(|conn| {
                async move {
                    let inserted = diesel::insert_into(operations::table)
                        .values(&new_row)
                        .on_conflict(operations::id)
                        .do_nothing()
                        .execute(conn)
                        .await?
                        == 1;

                    if inserted {
                        if !note_rows.is_empty() {
                            diesel::insert_into(operation_notes::table)
                                .values(&note_rows)
                                .execute(conn)
                                .await?;
                        }
                    } else {
                        diesel::update(operations::table.find(id))
                            .set(&update)
                            .execute(conn)
                            .await?;
                        diesel::delete(
                            operation_assets::table.filter(operation_assets::operation_id.eq(id)),
                        )
                        .execute(conn)
                        .await?;
                    }

                    if !asset_rows.is_empty() {
                        diesel::insert_into(operation_assets::table)
                            .values(&asset_rows)
                            .execute(conn)
                            .await?;
                    }
                    Ok(inserted)
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        debug!(operation_id = id, inserted, "operation saved");
        Ok(operation.clone())
    }

    async fn find_by_patient_id(
        &self,
        patient_id: &PatientId,
    ) -> Result<Vec<PatientOperation>, OperationRepositoryError> {
        let mut pooled = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, OperationRepositoryError::connection))?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let page_size = i64::try_from(PATIENT_OPERATIONS_PAGE_SIZE).unwrap_or(i64::MAX);
        let rows: Vec<OperationRow> = operations::table
            .filter(operations::patient_id.eq(patient_id.as_str()))
            .order((operations::created_at.desc(), operations::id.desc()))
            .limit(page_size)
            .select(OperationRow::as_select())
            .load(conn)
            .await
            .map_err(diesel_error)?;

        assemble(conn, rows).await
    }

    async fn add_note(
        &self,
        operation_id: &OperationId,
        content: &str,
    ) -> Result<Option<PatientOperation>, OperationRepositoryError> {
        let now = stored_precision(self.clock.utc());
        let mut pooled = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, OperationRepositoryError::connection))?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let appended = conn
            .transaction(|conn| {
                async move {
                    if !touch_parent(conn, operation_id, now).await? {
                        return Ok(false);
                    }
                    diesel::insert_into(operation_notes::table)
                        .values(&NewNoteRow {
                            operation_id: operation_id.as_str(),
                            content,
                            created_at: now,
                        })
                        .execute(conn)
                        .await?;
                    Ok(true)
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        if !appended {
            return Ok(None);
        }
        load_operation(conn, operation_id).await
    }

    async fn add_asset(
        &self,
        operation_id: &OperationId,
        asset_name: &str,
    ) -> Result<Option<PatientOperation>, OperationRepositoryError> {
        let now = stored_precision(self.clock.utc());
        let mut pooled = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, OperationRepositoryError::connection))?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let appended = conn
            .transaction(|conn| {
                async move {
                    if !touch_parent(conn, operation_id, now).await? {
                        return Ok(false);
                    }
                    diesel::insert_into(operation_assets::table)
                        .values(&NewAssetRow {
                            operation_id: operation_id.as_str(),
                            asset_name,
                        })
                        .execute(conn)
                        .await?;
                    Ok(true)
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        if !appended {
            return Ok(None);
        }
        load_operation(conn, operation_id).await
    }
}

#[cfg(test)]
mod tests {
    //! Row conversion coverage; database behaviour lives in
    //! `tests/diesel_repositories.rs`.

    use rstest::rstest;
    use rust_decimal::Decimal;

    use super::*;
    use crate::test_support::fixtures::{at, eur};

    fn row() -> OperationRow {
        OperationRow {
            id: "op-1".to_owned(),
            patient_id: "patient-1".to_owned(),
            operation_type: "filling".to_owned(),
            description: "composite".to_owned(),
            executor: "dr-lee".to_owned(),
            estimated_cost_amount: Decimal::new(3077, 2),
            estimated_cost_currency: "EUR".to_owned(),
            details: serde_json::json!([
                {"toothNumber": 11, "estimatedCost": {"amount": "10.33", "currency": "EUR"}},
                {"toothNumber": 21, "estimatedCost": {"amount": "20.44", "currency": "EUR"}},
            ]),
            created_at: at(9, 0),
            last_update: at(10, 0),
        }
    }

    #[rstest]
    fn row_assembles_with_children() {
        let operation = row_to_operation(
            row(),
            vec![OperationNote::new("note", at(9, 30))],
            vec!["scan1.png".to_owned()],
        )
        .expect("valid row");

        assert_eq!(operation.estimated_cost(), &eur(3077));
        assert_eq!(operation.details()[1].estimated_cost, eur(2044));
        assert_eq!(operation.assets(), ["scan1.png".to_owned()]);
        assert_eq!(operation.additional_notes()[0].content(), "note");
    }

    #[rstest]
    fn details_round_trip_through_json() {
        let details = vec![Detail::new(11, eur(1033))];
        let encoded = encode_details(&details).expect("encode");
        assert_eq!(decode_details(encoded).expect("decode"), details);
    }

    #[rstest]
    fn inconsistent_stored_breakdown_is_a_query_error() {
        let mut stored = row();
        stored.estimated_cost_amount = Decimal::new(1, 0);

        let error = row_to_operation(stored, vec![], vec![]).expect_err("mismatch");
        assert!(matches!(error, OperationRepositoryError::Query { .. }));
    }

    #[rstest]
    fn invalid_currency_is_a_query_error() {
        let mut stored = row();
        stored.estimated_cost_currency = "euro".to_owned();

        let error = row_to_operation(stored, vec![], vec![]).expect_err("bad currency");
        assert!(error.to_string().contains("decode currency"));
    }
}
