//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a migration
//! changes a table, update the matching block here (`diesel print-schema`
//! against a migrated database produces the same shape).

diesel::table! {
    /// Patients known to the clinic. Owned by the patient registry; this
    /// backend only reads it.
    patients (id) {
        id -> Text,
        full_name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Parent rows of the patient operation aggregate.
    operations (id) {
        id -> Text,
        patient_id -> Text,
        operation_type -> Text,
        description -> Text,
        executor -> Text,
        /// Exact decimal estimate; currency stored alongside.
        estimated_cost_amount -> Numeric,
        /// ISO 4217 alphabetic code.
        estimated_cost_currency -> Text,
        /// Per-tooth cost breakdown as a JSON array.
        details -> Jsonb,
        created_at -> Timestamptz,
        last_update -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only note history. Read newest first by `(created_at, id)`.
    operation_notes (id) {
        id -> Int8,
        operation_id -> Text,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Asset references. The serial `id` records insertion order.
    operation_assets (id) {
        id -> Int8,
        operation_id -> Text,
        asset_name -> Text,
    }
}

diesel::table! {
    /// Invoices. `operation_id` is a weak reference with no foreign key.
    invoices (id) {
        id -> Text,
        operation_id -> Text,
        amount -> Numeric,
        currency -> Text,
        status -> Text,
        created_at -> Timestamptz,
        last_update -> Timestamptz,
    }
}

diesel::joinable!(operations -> patients (patient_id));
diesel::joinable!(operation_notes -> operations (operation_id));
diesel::joinable!(operation_assets -> operations (operation_id));
diesel::joinable!(invoices -> operations (operation_id));

diesel::allow_tables_to_appear_in_same_query!(
    invoices,
    operation_assets,
    operation_notes,
    operations,
    patients,
);
