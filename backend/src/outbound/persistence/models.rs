//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer; repositories convert them
//! into domain aggregates through the validating constructors.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{invoices, operation_assets, operation_notes, operations, patients};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = patients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PatientRow {
    pub id: String,
    pub full_name: String,
}

// ---------------------------------------------------------------------------
// Operation aggregate rows
// ---------------------------------------------------------------------------

/// Parent row of the operation aggregate.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = operations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OperationRow {
    pub id: String,
    pub patient_id: String,
    pub operation_type: String,
    pub description: String,
    pub executor: String,
    pub estimated_cost_amount: Decimal,
    pub estimated_cost_currency: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = operations)]
pub(crate) struct NewOperationRow<'a> {
    pub id: &'a str,
    pub patient_id: &'a str,
    pub operation_type: &'a str,
    pub description: &'a str,
    pub executor: &'a str,
    pub estimated_cost_amount: Decimal,
    pub estimated_cost_currency: &'a str,
    pub details: &'a serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

/// Scalars overwritten by a re-save. Identity and `created_at` are kept.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = operations)]
pub(crate) struct OperationUpdate<'a> {
    pub patient_id: &'a str,
    pub operation_type: &'a str,
    pub description: &'a str,
    pub executor: &'a str,
    pub estimated_cost_amount: Decimal,
    pub estimated_cost_currency: &'a str,
    pub details: &'a serde_json::Value,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = operation_notes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NoteRow {
    pub operation_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = operation_notes)]
pub(crate) struct NewNoteRow<'a> {
    pub operation_id: &'a str,
    pub content: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = operation_assets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AssetRow {
    pub operation_id: String,
    pub asset_name: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = operation_assets)]
pub(crate) struct NewAssetRow<'a> {
    pub operation_id: &'a str,
    pub asset_name: &'a str,
}

// ---------------------------------------------------------------------------
// Invoice rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InvoiceRow {
    pub id: String,
    pub operation_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invoices)]
pub(crate) struct NewInvoiceRow<'a> {
    pub id: &'a str,
    pub operation_id: &'a str,
    pub amount: Decimal,
    pub currency: &'a str,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}
