//! Sample values shared across suites.
//!
//! Timestamps are whole seconds so they survive PostgreSQL's microsecond
//! precision unchanged.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    CurrencyCode, Detail, Money, OperationId, OperationNote, OperationRequest, PatientId,
    PatientOperation, PatientOperationDraft,
};

/// 2026-03-02 at `hour:minute` UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).single() {
        Some(value) => value,
        None => panic!("invalid fixture time {hour}:{minute}"),
    }
}

/// Euro amount from minor units, e.g. `eur(3077)` is 30.77 EUR.
pub fn eur(minor: i64) -> Money {
    match CurrencyCode::new("EUR") {
        Ok(code) => Money::new(Decimal::new(minor, 2), code),
        Err(error) => panic!("fixture currency: {error}"),
    }
}

pub fn operation_id(raw: &str) -> OperationId {
    match OperationId::new(raw) {
        Ok(id) => id,
        Err(error) => panic!("fixture operation id: {error}"),
    }
}

pub fn patient_id(raw: &str) -> PatientId {
    match PatientId::new(raw) {
        Ok(id) => id,
        Err(error) => panic!("fixture patient id: {error}"),
    }
}

/// Request with details `10.33 + 20.44` against an estimate of `30.77`.
pub fn filling_request() -> OperationRequest {
    OperationRequest {
        operation_type: "filling".to_owned(),
        description: "composite filling on upper incisors".to_owned(),
        executor: "dr-lee".to_owned(),
        estimated_cost: eur(3077),
        details: vec![Detail::new(11, eur(1033)), Detail::new(21, eur(2044))],
    }
}

/// Operation created at `created`, carrying one asset and one note.
pub fn sample_operation(
    id: OperationId,
    patient_id: PatientId,
    created: DateTime<Utc>,
) -> PatientOperation {
    let request = filling_request();
    let draft = PatientOperationDraft {
        id,
        patient_id,
        operation_type: request.operation_type,
        description: request.description,
        executor: request.executor,
        assets: vec!["scan1.png".to_owned()],
        additional_notes: vec![OperationNote::new("note", created)],
        creation_date_time: created,
        last_update: created,
        estimated_cost: request.estimated_cost,
        details: request.details,
    };
    match PatientOperation::new(draft) {
        Ok(operation) => operation,
        Err(error) => panic!("fixture operation: {error}"),
    }
}
