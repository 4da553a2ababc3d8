//! PostgreSQL-backed `InvoiceRepository` implementation using Diesel ORM.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Timestamptz;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use mockable::Clock;

use crate::domain::ports::{InvoiceRepository, InvoiceRepositoryError};
use crate::domain::{
    CurrencyCode, Invoice, InvoiceDraft, InvoiceId, InvoiceStatus, Money, OperationId, PatientId,
    stored_precision,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{InvoiceRow, NewInvoiceRow};
use super::pool::DbPool;
use super::schema::{invoices, operations};

/// Diesel-backed implementation of the invoice repository port.
#[derive(Clone)]
pub struct DieselInvoiceRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselInvoiceRepository {
    /// `clock` stamps `last_update` on status transitions.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    async fn connection(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<'_, AsyncPgConnection>,
        InvoiceRepositoryError,
    > {
        self.pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, InvoiceRepositoryError::connection))
    }
}

fn diesel_error(error: diesel::result::Error) -> InvoiceRepositoryError {
    map_diesel_error(
        error,
        InvoiceRepositoryError::query,
        InvoiceRepositoryError::connection,
    )
}

fn decode<T, E: std::fmt::Display>(
    value: Result<T, E>,
    field: &str,
) -> Result<T, InvoiceRepositoryError> {
    value.map_err(|err| InvoiceRepositoryError::query(format!("decode {field}: {err}")))
}

fn row_to_invoice(row: InvoiceRow) -> Result<Invoice, InvoiceRepositoryError> {
    let InvoiceRow {
        id,
        operation_id,
        amount,
        currency,
        status,
        created_at,
        last_update,
    } = row;

    Invoice::new(InvoiceDraft {
        id: decode(InvoiceId::new(id), "invoice id")?,
        operation_id: decode(OperationId::new(operation_id), "operation id")?,
        amount: Money::new(amount, decode(CurrencyCode::new(currency), "currency")?),
        status: decode(status.parse::<InvoiceStatus>(), "status")?,
        creation_date_time: created_at,
        last_update,
    })
    .map_err(|err| InvoiceRepositoryError::query(err.to_string()))
}

fn rows_to_invoices(rows: Vec<InvoiceRow>) -> Result<Vec<Invoice>, InvoiceRepositoryError> {
    rows.into_iter().map(row_to_invoice).collect()
}

#[async_trait]
impl InvoiceRepository for DieselInvoiceRepository {
    async fn retrieve(
        &self,
        invoice_id: &InvoiceId,
    ) -> Result<Option<Invoice>, InvoiceRepositoryError> {
        let mut conn = self.connection().await?;
        invoices::table
            .find(invoice_id.as_str())
            .select(InvoiceRow::as_select())
            .first::<InvoiceRow>(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?
            .map(row_to_invoice)
            .transpose()
    }

    async fn find_by_operation_id(
        &self,
        operation_id: &OperationId,
    ) -> Result<Vec<Invoice>, InvoiceRepositoryError> {
        let mut conn = self.connection().await?;
        let rows: Vec<InvoiceRow> = invoices::table
            .filter(invoices::operation_id.eq(operation_id.as_str()))
            .order((invoices::created_at.desc(), invoices::id.desc()))
            .select(InvoiceRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows_to_invoices(rows)
    }

    async fn find_by_patient_id(
        &self,
        patient_id: &PatientId,
    ) -> Result<Vec<Invoice>, InvoiceRepositoryError> {
        let mut conn = self.connection().await?;
        let rows: Vec<InvoiceRow> = invoices::table
            .inner_join(operations::table)
            .filter(operations::patient_id.eq(patient_id.as_str()))
            .order((invoices::created_at.desc(), invoices::id.desc()))
            .select(InvoiceRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows_to_invoices(rows)
    }

    async fn save(&self, invoice: &Invoice) -> Result<Invoice, InvoiceRepositoryError> {
        let mut conn = self.connection().await?;
        let row = NewInvoiceRow {
            id: invoice.id().as_str(),
            operation_id: invoice.operation_id().as_str(),
            amount: invoice.amount().amount(),
            currency: invoice.amount().currency().as_str(),
            status: invoice.status().as_str(),
            created_at: invoice.creation_date_time(),
            last_update: invoice.last_update(),
        };

        let stored: InvoiceRow = diesel::insert_into(invoices::table)
            .values(&row)
            .on_conflict(invoices::id)
            .do_update()
            .set((
                invoices::amount.eq(excluded(invoices::amount)),
                invoices::currency.eq(excluded(invoices::currency)),
                invoices::status.eq(excluded(invoices::status)),
                invoices::last_update.eq(excluded(invoices::last_update)),
            ))
            .returning(InvoiceRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;
        row_to_invoice(stored)
    }

    async fn update_status(
        &self,
        invoice_id: &InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, InvoiceRepositoryError> {
        let now = stored_precision(self.clock.utc());
        let mut conn = self.connection().await?;
        let stamped = sql::<Timestamptz>("GREATEST(created_at, ")
            .bind::<Timestamptz, _>(now)
            .sql(")");
        diesel::update(invoices::table.find(invoice_id.as_str()))
            .set((
                invoices::status.eq(status.as_str()),
                invoices::last_update.eq(stamped),
            ))
            .returning(InvoiceRow::as_returning())
            .get_result::<InvoiceRow>(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?
            .map(row_to_invoice)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal::Decimal;

    use super::*;
    use crate::test_support::fixtures::{at, eur};

    fn row(status: &str) -> InvoiceRow {
        InvoiceRow {
            id: "inv-1".to_owned(),
            operation_id: "op-1".to_owned(),
            amount: Decimal::new(3077, 2),
            currency: "EUR".to_owned(),
            status: status.to_owned(),
            created_at: at(9, 0),
            last_update: at(9, 0),
        }
    }

    #[rstest]
    #[case("pending", InvoiceStatus::Pending)]
    #[case("paid", InvoiceStatus::Paid)]
    #[case("cancelled", InvoiceStatus::Cancelled)]
    fn rows_decode_stored_statuses(#[case] stored: &str, #[case] expected: InvoiceStatus) {
        let invoice = row_to_invoice(row(stored)).expect("valid row");
        assert_eq!(invoice.status(), expected);
        assert_eq!(invoice.amount(), &eur(3077));
    }

    #[rstest]
    fn unknown_status_is_a_query_error() {
        let error = row_to_invoice(row("refunded")).expect_err("unknown status");
        assert!(error.to_string().contains("decode status"));
    }

    #[rstest]
    fn last_update_before_creation_is_rejected() {
        let mut stored = row("paid");
        stored.last_update = at(8, 0);
        assert!(row_to_invoice(stored).is_err());
    }
}
