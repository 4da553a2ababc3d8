//! Runtime configuration loaded via OrthoConfig.
//!
//! Values come from `CLINIC_*` environment variables (or a config file when
//! one is present); every field has a default except the database URL.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CHECKOUT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ASSET_ROOT: &str = "clinic-assets";

/// Log output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Configuration for the clinic backend binary.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CLINIC")]
pub struct ClinicSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub db_checkout_timeout_secs: Option<u64>,
    /// Directory that receives uploaded operation assets.
    pub asset_root: Option<PathBuf>,
    /// `json` (default) or `pretty`.
    pub log_format: Option<String>,
}

impl ClinicSettings {
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    pub fn db_checkout_timeout(&self) -> Duration {
        Duration::from_secs(
            self.db_checkout_timeout_secs
                .unwrap_or(DEFAULT_CHECKOUT_TIMEOUT_SECS),
        )
    }

    pub fn asset_root(&self) -> PathBuf {
        self.asset_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_ROOT))
    }

    /// Unrecognised values fall back to JSON.
    pub fn log_format(&self) -> LogFormat {
        match self.log_format.as_deref().map(str::trim) {
            Some(format) if format.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 5] = [
        "CLINIC_DATABASE_URL",
        "CLINIC_DB_MAX_CONNECTIONS",
        "CLINIC_DB_CHECKOUT_TIMEOUT_SECS",
        "CLINIC_ASSET_ROOT",
        "CLINIC_LOG_FORMAT",
    ];

    fn load_from_empty_args() -> ClinicSettings {
        ClinicSettings::load_from_iter([OsString::from("clinic")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), None);
        assert_eq!(settings.db_max_connections(), DEFAULT_MAX_CONNECTIONS);
        assert_eq!(
            settings.db_checkout_timeout(),
            Duration::from_secs(DEFAULT_CHECKOUT_TIMEOUT_SECS)
        );
        assert_eq!(settings.asset_root(), PathBuf::from(DEFAULT_ASSET_ROOT));
        assert_eq!(settings.log_format(), LogFormat::Json);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            (
                "CLINIC_DATABASE_URL",
                Some("postgres://clinic@localhost/clinic".to_owned()),
            ),
            ("CLINIC_DB_MAX_CONNECTIONS", Some("4".to_owned())),
            ("CLINIC_DB_CHECKOUT_TIMEOUT_SECS", Some("5".to_owned())),
            ("CLINIC_ASSET_ROOT", Some("/var/lib/clinic".to_owned())),
            ("CLINIC_LOG_FORMAT", Some("Pretty".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.database_url(),
            Some("postgres://clinic@localhost/clinic")
        );
        assert_eq!(settings.db_max_connections(), 4);
        assert_eq!(settings.db_checkout_timeout(), Duration::from_secs(5));
        assert_eq!(settings.asset_root(), PathBuf::from("/var/lib/clinic"));
        assert_eq!(settings.log_format(), LogFormat::Pretty);
    }

    #[rstest]
    fn blank_url_and_zero_pool_size_fall_back() {
        let _guard = lock_env([
            ("CLINIC_DATABASE_URL", Some("  ".to_owned())),
            ("CLINIC_DB_MAX_CONNECTIONS", Some("0".to_owned())),
            ("CLINIC_DB_CHECKOUT_TIMEOUT_SECS", None),
            ("CLINIC_ASSET_ROOT", None),
            ("CLINIC_LOG_FORMAT", Some("xml".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), None);
        assert_eq!(settings.db_max_connections(), DEFAULT_MAX_CONNECTIONS);
        assert_eq!(settings.log_format(), LogFormat::Json);
    }
}
