//! Validation pipeline coverage.

use mockall::Sequence;
use rstest::{fixture, rstest};
use rust_decimal::Decimal;

use super::*;
use crate::domain::{CurrencyCode, Detail, Money};

fn money(minor: i64, currency: &str) -> Money {
    Money::new(
        Decimal::new(minor, 2),
        CurrencyCode::new(currency).expect("valid currency"),
    )
}

fn eur(minor: i64) -> Money {
    money(minor, "EUR")
}

#[fixture]
fn request() -> OperationRequest {
    OperationRequest {
        operation_type: "filling".to_owned(),
        description: "composite filling on upper incisors".to_owned(),
        executor: "dr-lee".to_owned(),
        estimated_cost: eur(3077),
        details: vec![Detail::new(11, eur(1033)), Detail::new(21, eur(2044))],
    }
}

#[rstest]
fn cost_consistency_accepts_exact_cent_sum(request: OperationRequest) {
    assert_eq!(CostConsistencyValidator.validate(&request), Ok(()));
}

#[rstest]
#[case(3076)]
#[case(3078)]
#[case(0)]
fn cost_consistency_rejects_mismatched_sum(mut request: OperationRequest, #[case] estimate: i64) {
    request.estimated_cost = eur(estimate);

    let error = CostConsistencyValidator
        .validate(&request)
        .expect_err("mismatch should fail");

    assert_eq!(
        error,
        ValidationError::CostMismatch {
            estimated: eur(estimate),
            sum: eur(3077),
        }
    );
    assert!(error.to_string().contains("does not equal sum of details"));
}

#[rstest]
fn cost_consistency_ignores_empty_details(mut request: OperationRequest) {
    request.details.clear();
    request.estimated_cost = eur(1000);
    assert_eq!(CostConsistencyValidator.validate(&request), Ok(()));
}

#[rstest]
fn cost_consistency_rejects_mixed_currencies(mut request: OperationRequest) {
    request.details = vec![Detail::new(11, eur(1033)), Detail::new(21, money(2044, "USD"))];

    let error = CostConsistencyValidator
        .validate(&request)
        .expect_err("mixed currencies should fail");

    assert!(matches!(error, ValidationError::Currency(_)));
}

#[rstest]
#[case(11, true)]
#[case(18, true)]
#[case(48, true)]
#[case(55, true)]
#[case(85, true)]
#[case(10, false)]
#[case(19, false)]
#[case(56, false)]
#[case(91, false)]
#[case(0, false)]
fn fdi_tooth_numbers(#[case] tooth: u8, #[case] valid: bool) {
    assert_eq!(required_fields::is_fdi_tooth(tooth), valid);
}

#[rstest]
fn required_fields_rejects_blank_type(mut request: OperationRequest) {
    request.operation_type = "  ".to_owned();
    assert_eq!(
        RequiredFieldsValidator.validate(&request),
        Err(ValidationError::MissingField { field: "type" })
    );
}

#[rstest]
fn required_fields_rejects_blank_executor(mut request: OperationRequest) {
    request.executor = String::new();
    assert_eq!(
        RequiredFieldsValidator.validate(&request),
        Err(ValidationError::MissingField { field: "executor" })
    );
}

#[rstest]
fn required_fields_rejects_unknown_tooth(mut request: OperationRequest) {
    request.details.push(Detail::new(99, eur(0)));
    assert_eq!(
        RequiredFieldsValidator.validate(&request),
        Err(ValidationError::InvalidToothNumber { tooth_number: 99 })
    );
}

#[rstest]
fn composite_stops_at_first_failure(request: OperationRequest) {
    let failure = ValidationError::MissingField { field: "type" };
    let mut first = MockOperationValidator::new();
    let returned = failure.clone();
    first
        .expect_validate()
        .times(1)
        .return_once(move |_| Err(returned));
    let mut second = MockOperationValidator::new();
    second.expect_validate().times(0);

    let composite = CompositeValidator::new(vec![Box::new(first), Box::new(second)]);

    assert_eq!(composite.validate(&request), Err(failure));
}

#[rstest]
fn composite_runs_validators_in_order(request: OperationRequest) {
    let mut sequence = Sequence::new();
    let mut first = MockOperationValidator::new();
    first
        .expect_validate()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    let mut second = MockOperationValidator::new();
    second
        .expect_validate()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));

    let composite = CompositeValidator::default().with(first).with(second);

    assert_eq!(composite.len(), 2);
    assert_eq!(composite.validate(&request), Ok(()));
}

#[rstest]
fn empty_composite_passes(request: OperationRequest) {
    let composite = CompositeValidator::default();
    assert!(composite.is_empty());
    assert_eq!(composite.validate(&request), Ok(()));
}

#[rstest]
fn standard_pipeline_checks_fields_before_costs(mut request: OperationRequest) {
    request.executor = String::new();
    request.estimated_cost = eur(1);

    assert_eq!(
        CompositeValidator::standard().validate(&request),
        Err(ValidationError::MissingField { field: "executor" })
    );
}
