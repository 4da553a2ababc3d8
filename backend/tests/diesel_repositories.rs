//! Diesel adapters against PostgreSQL, checked with the shared repository
//! behaviour suite.
//!
//! Each test seeds its own patient and prefixes every identifier with a fresh
//! scope, so suites can run repeatedly against one database.

use std::sync::Arc;

use clinic_backend::domain::PatientId;
use clinic_backend::domain::ports::{OperationRepository, PatientRepository};
use clinic_backend::outbound::persistence::{
    DbPool, DieselInvoiceRepository, DieselOperationRepository, DieselPatientRepository,
    PoolConfig,
};
use clinic_backend::test_support::fixtures::{at, operation_id, patient_id, sample_operation};
use clinic_backend::test_support::{MutableClock, repository_behaviour as behaviour};

mod support;

use support::{migrated_database_url, seed_patient, unique_scope};

struct Harness {
    operations: DieselOperationRepository,
    invoices: DieselInvoiceRepository,
    patients: DieselPatientRepository,
    clock: Arc<MutableClock>,
    patient: PatientId,
    scope: String,
}

async fn harness(label: &str) -> Option<Harness> {
    let url = migrated_database_url(label)?;
    let scope = unique_scope(label);
    let patient = seed_patient(&url, &scope).await;

    let pool = DbPool::new(PoolConfig::new(url).with_max_size(2))
        .await
        .expect("create pool");
    let clock = Arc::new(MutableClock::new(at(9, 0)));
    Some(Harness {
        operations: DieselOperationRepository::new(pool.clone(), clock.clone()),
        invoices: DieselInvoiceRepository::new(pool.clone(), clock.clone()),
        patients: DieselPatientRepository::new(pool),
        clock,
        patient,
        scope,
    })
}

#[tokio::test]
async fn save_round_trips() {
    let Some(h) = harness("save-round-trip").await else {
        return;
    };
    behaviour::save_round_trips(&h.operations, &h.clock, &h.patient, &h.scope).await;
}

#[tokio::test]
async fn sub_microsecond_times_round_trip() {
    let Some(h) = harness("precise-times").await else {
        return;
    };
    behaviour::sub_microsecond_times_round_trip(&h.operations, &h.clock, &h.patient, &h.scope)
        .await;
}

#[tokio::test]
async fn resave_replaces_assets_and_keeps_notes() {
    let Some(h) = harness("resave").await else {
        return;
    };
    behaviour::resave_replaces_assets_and_keeps_notes(&h.operations, &h.clock, &h.patient, &h.scope)
        .await;
}

#[tokio::test]
async fn add_note_prepends_and_stamps_clock() {
    let Some(h) = harness("add-note").await else {
        return;
    };
    behaviour::add_note_prepends_and_stamps_clock(&h.operations, &h.clock, &h.patient, &h.scope)
        .await;
}

#[tokio::test]
async fn add_asset_appends_and_bumps_last_update() {
    let Some(h) = harness("add-asset").await else {
        return;
    };
    behaviour::add_asset_appends_and_bumps_last_update(
        &h.operations,
        &h.clock,
        &h.patient,
        &h.scope,
    )
    .await;
}

#[tokio::test]
async fn unknown_operations_are_absent() {
    let Some(h) = harness("unknown-operation").await else {
        return;
    };
    behaviour::unknown_operations_are_absent(&h.operations, &h.scope).await;
}

#[tokio::test]
async fn patient_listing_is_bounded_and_newest_first() {
    let Some(h) = harness("listing").await else {
        return;
    };
    behaviour::patient_listing_is_bounded_and_newest_first(
        &h.operations,
        &h.clock,
        &h.patient,
        &h.scope,
    )
    .await;
}

#[tokio::test]
async fn invoice_status_transition_touches_only_status() {
    let Some(h) = harness("invoice-status").await else {
        return;
    };
    behaviour::invoice_status_transition_touches_only_status(
        &h.invoices,
        &h.operations,
        &h.clock,
        &h.patient,
        &h.scope,
    )
    .await;
}

#[tokio::test]
async fn invoice_listings_are_newest_first() {
    let Some(h) = harness("invoice-listing").await else {
        return;
    };
    behaviour::invoice_listings_are_newest_first(
        &h.invoices,
        &h.operations,
        &h.clock,
        &h.patient,
        &h.scope,
    )
    .await;
}

#[tokio::test]
async fn invoice_resave_overwrites_amount_and_status() {
    let Some(h) = harness("invoice-resave").await else {
        return;
    };
    behaviour::invoice_resave_overwrites_amount_and_status(
        &h.invoices,
        &h.operations,
        &h.clock,
        &h.patient,
        &h.scope,
    )
    .await;
}

#[tokio::test]
async fn patient_lookup_finds_seeded_rows_only() {
    let Some(h) = harness("patients").await else {
        return;
    };

    let found = h
        .patients
        .retrieve(&h.patient)
        .await
        .expect("lookup succeeds")
        .expect("seeded patient exists");
    assert_eq!(found.id(), &h.patient);
    assert_eq!(found.full_name(), "Test Patient");

    let missing = patient_id(&format!("{}-nobody", h.scope));
    assert_eq!(h.patients.retrieve(&missing).await.expect("lookup"), None);
}

#[tokio::test]
async fn failed_note_insert_rolls_back_the_parent_bump() {
    let Some(h) = harness("note-rollback").await else {
        return;
    };
    let operation = sample_operation(
        operation_id(&format!("{}-op-rollback", h.scope)),
        h.patient.clone(),
        at(9, 0),
    );
    h.operations.save(&operation).await.expect("save succeeds");

    // The parent row is bumped first; PostgreSQL then refuses NUL in TEXT.
    h.clock.set(at(15, 0));
    h.operations
        .add_note(operation.id(), "a\0b")
        .await
        .expect_err("note insert fails");

    let stored = h
        .operations
        .retrieve(operation.id())
        .await
        .expect("retrieve succeeds")
        .expect("operation still stored");
    assert_eq!(stored.last_update(), at(9, 0));
    assert_eq!(stored.additional_notes(), operation.additional_notes());
    assert_eq!(stored, operation);
}
