//! Shared helpers for backend integration tests.
//!
//! Database suites run against the PostgreSQL instance named by
//! `CLINIC_TEST_DATABASE_URL`. When it is unset the suites print a
//! `SKIP-TEST-DB` marker and pass without touching a database.

use std::sync::OnceLock;

use clinic_backend::domain::PatientId;
use clinic_backend::outbound::persistence::run_pending_migrations;
use diesel::sql_types::Text;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

const TEST_DATABASE_URL_ENV: &str = "CLINIC_TEST_DATABASE_URL";

/// Returns the test database URL once migrations have been applied, or
/// `None` after printing a skip marker when no database is configured.
///
/// Migrations run once per test binary.
pub fn migrated_database_url(suite: &str) -> Option<String> {
    static MIGRATED: OnceLock<Result<(), String>> = OnceLock::new();

    let Some(url) = std::env::var(TEST_DATABASE_URL_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
    else {
        eprintln!("SKIP-TEST-DB: {suite}: {TEST_DATABASE_URL_ENV} is not set");
        return None;
    };

    let outcome = MIGRATED.get_or_init(|| {
        run_pending_migrations(&url)
            .map(|_| ())
            .map_err(|error| error.to_string())
    });
    if let Err(error) = outcome {
        panic!("migrating {TEST_DATABASE_URL_ENV} failed: {error}");
    }
    Some(url)
}

/// Unique prefix for identifiers written by one test.
pub fn unique_scope(label: &str) -> String {
    format!("{label}-{}", Uuid::new_v4().simple())
}

/// Insert a patient row and return its id.
pub async fn seed_patient(database_url: &str, scope: &str) -> PatientId {
    let raw_id = format!("{scope}-patient");
    let mut conn = AsyncPgConnection::establish(database_url)
        .await
        .expect("connect to test database");
    diesel::sql_query("INSERT INTO patients (id, full_name) VALUES ($1, $2)")
        .bind::<Text, _>(raw_id.clone())
        .bind::<Text, _>("Test Patient")
        .execute(&mut conn)
        .await
        .expect("seed patient");
    PatientId::new(raw_id).expect("valid patient id")
}
