//! Repository behaviour suite shared by every adapter.
//!
//! Each check panics on failure. `scope` prefixes generated identifiers so
//! runs against a persistent database do not collide, and `patient` must
//! already exist in the adapter's patient table.

use chrono::TimeDelta;

use crate::domain::ports::{InvoiceRepository, OperationRepository};
use crate::domain::{
    Invoice, InvoiceDraft, InvoiceId, InvoiceStatus, OperationRevision, PatientId,
    PatientOperation, stored_precision,
};
use crate::test_support::MutableClock;
use crate::test_support::fixtures::{at, eur, operation_id, sample_operation};

/// Unwraps a check's intermediate value, panicking with `context`.
trait OrPanic<T> {
    fn or_panic(self, context: &str) -> T;
}

impl<T, E: std::fmt::Display> OrPanic<T> for Result<T, E> {
    fn or_panic(self, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(error) => panic!("{context}: {error}"),
        }
    }
}

impl<T> OrPanic<T> for Option<T> {
    fn or_panic(self, context: &str) -> T {
        match self {
            Some(value) => value,
            None => panic!("{context}"),
        }
    }
}

fn invoice_id(raw: &str) -> InvoiceId {
    match InvoiceId::new(raw) {
        Ok(id) => id,
        Err(error) => panic!("fixture invoice id: {error}"),
    }
}

async fn saved_operation<O>(repo: &O, patient: &PatientId, raw_id: &str) -> PatientOperation
where
    O: OperationRepository + ?Sized,
{
    let operation = sample_operation(operation_id(raw_id), patient.clone(), at(9, 0));
    match repo.save(&operation).await {
        Ok(saved) => saved,
        Err(error) => panic!("save {raw_id}: {error}"),
    }
}

async fn must_retrieve<O>(repo: &O, operation: &PatientOperation) -> Option<PatientOperation>
where
    O: OperationRepository + ?Sized,
{
    match repo.retrieve(operation.id()).await {
        Ok(found) => found,
        Err(error) => panic!("retrieve {}: {error}", operation.id()),
    }
}

/// Saving then retrieving yields the same aggregate, twice over.
pub async fn save_round_trips<O>(repo: &O, _clock: &MutableClock, patient: &PatientId, scope: &str)
where
    O: OperationRepository + ?Sized,
{
    let operation = sample_operation(
        operation_id(&format!("{scope}-op-round-trip")),
        patient.clone(),
        at(9, 0),
    );

    let saved = repo.save(&operation).await.or_panic("save succeeds");
    assert_eq!(saved, operation);

    let first = must_retrieve(repo, &operation).await;
    assert_eq!(first.as_ref(), Some(&operation));
    let second = must_retrieve(repo, &operation).await;
    assert_eq!(first, second);
}

/// Clock readings finer than a microsecond are stored and returned at
/// microsecond precision, so a returned aggregate equals its re-read copy.
pub async fn sub_microsecond_times_round_trip<O>(
    repo: &O,
    clock: &MutableClock,
    patient: &PatientId,
    scope: &str,
) where
    O: OperationRepository + ?Sized,
{
    let precise = at(9, 0) + TimeDelta::nanoseconds(123_456_789);
    let operation = sample_operation(
        operation_id(&format!("{scope}-op-precise")),
        patient.clone(),
        precise,
    );
    let saved = repo.save(&operation).await.or_panic("save succeeds");
    assert_eq!(saved.creation_date_time(), stored_precision(precise));
    assert_eq!(must_retrieve(repo, &operation).await.as_ref(), Some(&saved));

    let later = at(10, 0) + TimeDelta::nanoseconds(987_654_321);
    clock.set(later);
    let noted = repo
        .add_note(operation.id(), "Checked bite")
        .await
        .or_panic("add note succeeds")
        .or_panic("operation exists");
    assert_eq!(noted.last_update(), stored_precision(later));
    assert_eq!(
        noted.additional_notes()[0].creation_time(),
        stored_precision(later)
    );
    assert_eq!(must_retrieve(repo, &operation).await, Some(noted));
}

/// Re-saving an existing id replaces assets and scalars but not notes.
pub async fn resave_replaces_assets_and_keeps_notes<O>(
    repo: &O,
    _clock: &MutableClock,
    patient: &PatientId,
    scope: &str,
) where
    O: OperationRepository + ?Sized,
{
    let operation = saved_operation(repo, patient, &format!("{scope}-op-resave")).await;

    let revised = operation
        .clone()
        .revise(
            OperationRevision {
                operation_type: "crown".to_owned(),
                description: "ceramic crown".to_owned(),
                executor: "dr-okafor".to_owned(),
                assets: vec!["xray2.png".to_owned()],
                estimated_cost: eur(50_000),
                details: vec![],
            },
            at(10, 0),
        )
        .or_panic("valid revision");
    repo.save(&revised).await.or_panic("re-save succeeds");

    let stored = must_retrieve(repo, &operation)
        .await
        .or_panic("operation still stored");
    assert_eq!(stored.assets(), ["xray2.png".to_owned()]);
    assert_eq!(stored.additional_notes(), operation.additional_notes());
    assert_eq!(stored.operation_type(), "crown");
    assert_eq!(stored.estimated_cost(), &eur(50_000));
    assert!(stored.details().is_empty());
    assert_eq!(stored.creation_date_time(), at(9, 0));
    assert_eq!(stored.last_update(), at(10, 0));
}

/// A new note is listed first and stamped with the clock's time.
pub async fn add_note_prepends_and_stamps_clock<O>(
    repo: &O,
    clock: &MutableClock,
    patient: &PatientId,
    scope: &str,
) where
    O: OperationRepository + ?Sized,
{
    let operation = saved_operation(repo, patient, &format!("{scope}-op-note")).await;
    clock.set(at(11, 0));

    let updated = repo
        .add_note(operation.id(), "Follow-up done")
        .await
        .or_panic("add note succeeds")
        .or_panic("operation exists");

    let notes = updated.additional_notes();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].content(), "Follow-up done");
    assert_eq!(notes[0].creation_time(), at(11, 0));
    assert_eq!(notes[1].content(), "note");
    assert_eq!(updated.last_update(), at(11, 0));
    assert_eq!(must_retrieve(repo, &operation).await, Some(updated));
}

/// A new asset is appended after the existing ones.
pub async fn add_asset_appends_and_bumps_last_update<O>(
    repo: &O,
    clock: &MutableClock,
    patient: &PatientId,
    scope: &str,
) where
    O: OperationRepository + ?Sized,
{
    let operation = saved_operation(repo, patient, &format!("{scope}-op-asset")).await;
    clock.set(at(12, 0));

    let updated = repo
        .add_asset(operation.id(), "xray2.png")
        .await
        .or_panic("add asset succeeds")
        .or_panic("operation exists");

    assert_eq!(
        updated.assets(),
        ["scan1.png".to_owned(), "xray2.png".to_owned()]
    );
    assert_eq!(updated.last_update(), at(12, 0));
    assert_eq!(updated.additional_notes(), operation.additional_notes());
}

/// Reads and appends against an unknown id yield `None` and write nothing.
pub async fn unknown_operations_are_absent<O>(repo: &O, scope: &str)
where
    O: OperationRepository + ?Sized,
{
    let missing = operation_id(&format!("{scope}-op-missing"));

    assert_eq!(repo.retrieve(&missing).await.or_panic("retrieve"), None);
    assert_eq!(repo.add_note(&missing, "orphan").await.or_panic("add note"), None);
    assert_eq!(repo.add_asset(&missing, "orphan.png").await.or_panic("add asset"), None);
    assert_eq!(repo.retrieve(&missing).await.or_panic("retrieve"), None);
}

/// Listing returns at most one page, newest creation time first.
pub async fn patient_listing_is_bounded_and_newest_first<O>(
    repo: &O,
    _clock: &MutableClock,
    patient: &PatientId,
    scope: &str,
) where
    O: OperationRepository + ?Sized,
{
    for minute in 0..12 {
        let operation = sample_operation(
            operation_id(&format!("{scope}-op-list-{minute:02}")),
            patient.clone(),
            at(8, minute),
        );
        repo.save(&operation).await.or_panic("save succeeds");
    }

    let listed = repo
        .find_by_patient_id(patient)
        .await
        .or_panic("listing succeeds");

    assert_eq!(listed.len(), crate::domain::ports::PATIENT_OPERATIONS_PAGE_SIZE);
    assert_eq!(listed[0].creation_date_time(), at(8, 11));
    assert!(
        listed
            .windows(2)
            .all(|pair| pair[0].creation_date_time() >= pair[1].creation_date_time())
    );
    assert!(listed.iter().all(|operation| !operation.assets().is_empty()));
    assert!(
        listed
            .iter()
            .all(|operation| operation.additional_notes().len() == 1)
    );
}

/// `update_status` changes status and `last_update` only.
pub async fn invoice_status_transition_touches_only_status<I, O>(
    invoices: &I,
    operations: &O,
    clock: &MutableClock,
    patient: &PatientId,
    scope: &str,
) where
    I: InvoiceRepository + ?Sized,
    O: OperationRepository + ?Sized,
{
    let operation = saved_operation(operations, patient, &format!("{scope}-op-billed")).await;
    let invoice = Invoice::issue(
        invoice_id(&format!("{scope}-inv-status")),
        operation.id().clone(),
        eur(3077),
        at(9, 30),
    );
    assert_eq!(invoices.save(&invoice).await.or_panic("save invoice"), invoice);

    clock.set(at(13, 0));
    let paid = invoices
        .update_status(invoice.id(), InvoiceStatus::Paid)
        .await
        .or_panic("update succeeds")
        .or_panic("invoice exists");

    assert_eq!(paid.status(), InvoiceStatus::Paid);
    assert_eq!(paid.last_update(), at(13, 0));
    assert_eq!(paid.amount(), invoice.amount());
    assert_eq!(paid.operation_id(), invoice.operation_id());
    assert_eq!(paid.creation_date_time(), invoice.creation_date_time());
    assert_eq!(
        invoices.retrieve(invoice.id()).await.or_panic("retrieve"),
        Some(paid)
    );

    let reopened = invoices
        .update_status(invoice.id(), InvoiceStatus::Pending)
        .await
        .or_panic("update succeeds")
        .or_panic("invoice exists");
    assert_eq!(reopened.status(), InvoiceStatus::Pending);

    let missing = invoice_id(&format!("{scope}-inv-missing"));
    assert_eq!(
        invoices
            .update_status(&missing, InvoiceStatus::Paid)
            .await
            .or_panic("update succeeds"),
        None
    );
}

/// Both invoice listings order by creation time, newest first.
pub async fn invoice_listings_are_newest_first<I, O>(
    invoices: &I,
    operations: &O,
    _clock: &MutableClock,
    patient: &PatientId,
    scope: &str,
) where
    I: InvoiceRepository + ?Sized,
    O: OperationRepository + ?Sized,
{
    let first = saved_operation(operations, patient, &format!("{scope}-op-inv-a")).await;
    let second = saved_operation(operations, patient, &format!("{scope}-op-inv-b")).await;

    let issued = [
        (format!("{scope}-inv-a1"), &first, at(9, 10)),
        (format!("{scope}-inv-b1"), &second, at(9, 15)),
        (format!("{scope}-inv-a2"), &first, at(9, 20)),
    ];
    for (raw_id, operation, created) in &issued {
        let invoice = Invoice::issue(
            invoice_id(raw_id),
            operation.id().clone(),
            eur(1000),
            *created,
        );
        invoices.save(&invoice).await.or_panic("save invoice");
    }

    let by_operation: Vec<_> = invoices
        .find_by_operation_id(first.id())
        .await
        .or_panic("listing succeeds")
        .iter()
        .map(|invoice| invoice.id().to_string())
        .collect();
    assert_eq!(
        by_operation,
        [format!("{scope}-inv-a2"), format!("{scope}-inv-a1")]
    );

    let by_patient: Vec<_> = invoices
        .find_by_patient_id(patient)
        .await
        .or_panic("listing succeeds")
        .iter()
        .map(|invoice| invoice.id().to_string())
        .collect();
    assert_eq!(
        by_patient,
        [
            format!("{scope}-inv-a2"),
            format!("{scope}-inv-b1"),
            format!("{scope}-inv-a1"),
        ]
    );
}

/// Saving an existing invoice id overwrites amount, status, and
/// `last_update`.
pub async fn invoice_resave_overwrites_amount_and_status<I, O>(
    invoices: &I,
    operations: &O,
    _clock: &MutableClock,
    patient: &PatientId,
    scope: &str,
) where
    I: InvoiceRepository + ?Sized,
    O: OperationRepository + ?Sized,
{
    let operation = saved_operation(operations, patient, &format!("{scope}-op-rebill")).await;
    let invoice = Invoice::issue(
        invoice_id(&format!("{scope}-inv-rebill")),
        operation.id().clone(),
        eur(3077),
        at(9, 30),
    );
    invoices.save(&invoice).await.or_panic("save invoice");

    let corrected = Invoice::new(InvoiceDraft {
        id: invoice.id().clone(),
        operation_id: invoice.operation_id().clone(),
        amount: eur(2500),
        status: InvoiceStatus::Cancelled,
        creation_date_time: invoice.creation_date_time(),
        last_update: at(10, 0),
    })
    .or_panic("valid invoice");
    invoices.save(&corrected).await.or_panic("re-save invoice");

    let stored = invoices
        .retrieve(invoice.id())
        .await
        .or_panic("retrieve")
        .or_panic("invoice exists");
    assert_eq!(stored, corrected);
    assert_eq!(
        invoices
            .find_by_operation_id(operation.id())
            .await
            .or_panic("listing succeeds")
            .len(),
        1
    );
}
