//! Tests for the invoice service.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{MockIdGenerator, MockInvoiceRepository, MockOperationRepository};
use crate::domain::{ErrorCode, Money};
use crate::test_support::MutableClock;
use crate::test_support::fixtures::{at, eur, operation_id, patient_id, sample_operation};

struct Mocks {
    invoices: MockInvoiceRepository,
    operations: MockOperationRepository,
    ids: MockIdGenerator,
}

#[fixture]
fn mocks() -> Mocks {
    Mocks {
        invoices: MockInvoiceRepository::new(),
        operations: MockOperationRepository::new(),
        ids: MockIdGenerator::new(),
    }
}

impl Mocks {
    fn into_service(self) -> InvoiceService<MockInvoiceRepository, MockOperationRepository> {
        InvoiceService::new(
            Arc::new(self.invoices),
            Arc::new(self.operations),
            Arc::new(self.ids),
            Arc::new(MutableClock::new(at(14, 0))),
        )
    }
}

fn invoice_id(raw: &str) -> InvoiceId {
    InvoiceId::new(raw).expect("valid invoice id")
}

fn issued(status: InvoiceStatus) -> Invoice {
    Invoice::issue(invoice_id("inv-1"), operation_id("op-1"), eur(3077), at(9, 0))
        .transition_to(status, at(10, 0))
}

fn request(amount: Money) -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        operation_id: operation_id("op-1"),
        amount,
    }
}

#[rstest]
#[tokio::test]
async fn create_invoice_starts_pending_at_clock_time(mut mocks: Mocks) {
    mocks.operations.expect_retrieve().times(1).returning(|id| {
        Ok(Some(sample_operation(id.clone(), patient_id("patient-1"), at(9, 0))))
    });
    mocks
        .ids
        .expect_new_invoice_id()
        .times(1)
        .returning(|| invoice_id("inv-7"));
    mocks
        .invoices
        .expect_save()
        .times(1)
        .returning(|invoice| Ok(invoice.clone()));

    let invoice = mocks
        .into_service()
        .create_invoice(request(eur(3077)))
        .await
        .expect("invoice created");

    assert_eq!(invoice.id().as_str(), "inv-7");
    assert_eq!(invoice.status(), InvoiceStatus::Pending);
    assert_eq!(invoice.creation_date_time(), at(14, 0));
    assert_eq!(invoice.last_update(), at(14, 0));
    assert_eq!(invoice.amount(), &eur(3077));
}

#[rstest]
#[tokio::test]
async fn create_invoice_for_unknown_operation_is_not_found(mut mocks: Mocks) {
    mocks.operations.expect_retrieve().returning(|_| Ok(None));
    mocks.ids.expect_new_invoice_id().times(0);
    mocks.invoices.expect_save().times(0);

    let error = mocks
        .into_service()
        .create_invoice(request(eur(3077)))
        .await
        .expect_err("operation missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
    assert!(error.message().contains("op-1"));
}

#[rstest]
#[tokio::test]
async fn create_invoice_rejects_negative_amount(mut mocks: Mocks) {
    mocks.operations.expect_retrieve().times(0);
    mocks.invoices.expect_save().times(0);

    let error = mocks
        .into_service()
        .create_invoice(request(eur(-1)))
        .await
        .expect_err("negative amount");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn create_invoice_accepts_zero_amount(mut mocks: Mocks) {
    mocks.operations.expect_retrieve().returning(|id| {
        Ok(Some(sample_operation(id.clone(), patient_id("patient-1"), at(9, 0))))
    });
    mocks
        .ids
        .expect_new_invoice_id()
        .returning(|| invoice_id("inv-0"));
    mocks
        .invoices
        .expect_save()
        .returning(|invoice| Ok(invoice.clone()));

    let invoice = mocks
        .into_service()
        .create_invoice(request(eur(0)))
        .await
        .expect("zero is billable");

    assert_eq!(invoice.amount(), &eur(0));
}

#[rstest]
#[case(InvoiceStatus::Pending, InvoiceStatus::Paid)]
#[case(InvoiceStatus::Pending, InvoiceStatus::Cancelled)]
#[case(InvoiceStatus::Paid, InvoiceStatus::Pending)]
#[case(InvoiceStatus::Cancelled, InvoiceStatus::Paid)]
#[tokio::test]
async fn update_status_accepts_any_transition(
    mut mocks: Mocks,
    #[case] from: InvoiceStatus,
    #[case] to: InvoiceStatus,
) {
    mocks
        .invoices
        .expect_retrieve()
        .times(1)
        .returning(move |_| Ok(Some(issued(from))));
    mocks
        .invoices
        .expect_update_status()
        .times(1)
        .withf(move |id, status| id.as_str() == "inv-1" && *status == to)
        .returning(move |_, status| Ok(Some(issued(status))));

    let updated = mocks
        .into_service()
        .update_invoice_status(&invoice_id("inv-1"), to)
        .await
        .expect("transition applied");

    assert_eq!(updated.status(), to);
}

#[rstest]
#[tokio::test]
async fn update_status_of_unknown_invoice_is_not_found(mut mocks: Mocks) {
    mocks.invoices.expect_retrieve().returning(|_| Ok(None));
    mocks.invoices.expect_update_status().times(0);

    let error = mocks
        .into_service()
        .update_invoice_status(&invoice_id("inv-404"), InvoiceStatus::Paid)
        .await
        .expect_err("missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(InvoiceRepositoryError::connection("pool exhausted"), ErrorCode::ServiceUnavailable)]
#[case(InvoiceRepositoryError::query("syntax"), ErrorCode::InternalError)]
#[tokio::test]
async fn listing_maps_repository_failures(
    mut mocks: Mocks,
    #[case] failure: InvoiceRepositoryError,
    #[case] expected: ErrorCode,
) {
    mocks
        .invoices
        .expect_find_by_patient_id()
        .times(1)
        .return_once(move |_| Err(failure));

    let error = mocks
        .into_service()
        .list_patient_invoices(&patient_id("patient-1"))
        .await
        .expect_err("failure surfaces");

    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn operation_listing_delegates_to_repository(mut mocks: Mocks) {
    mocks
        .invoices
        .expect_find_by_operation_id()
        .times(1)
        .withf(|id| id.as_str() == "op-1")
        .returning(|_| Ok(vec![issued(InvoiceStatus::Paid)]));

    let listed = mocks
        .into_service()
        .list_operation_invoices(&operation_id("op-1"))
        .await
        .expect("listed");

    assert_eq!(listed.len(), 1);
}
