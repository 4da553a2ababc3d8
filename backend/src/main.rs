//! `clinic`: administrative CLI over the operation and invoice services.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use clinic_backend::config::{ClinicSettings, LogFormat};
use clinic_backend::domain::ports::IdGenerator;
use clinic_backend::domain::{
    AssetUpload, CreateInvoiceRequest, CreateOperationRequest, CurrencyCode, Detail,
    InvoiceId, InvoiceService, InvoiceStatus, Money, OperationId, OperationRequest,
    OperationService, PatientId, UpdateOperationRequest,
};
use clinic_backend::outbound::persistence::{
    DbPool, DieselInvoiceRepository, DieselOperationRepository, DieselPatientRepository,
    PoolConfig, run_pending_migrations_async,
};
use clinic_backend::outbound::{DirectoryObjectStorage, UuidIdGenerator};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// `clinic` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "clinic",
    about = "Record dental operations and bill them from the command line",
    version
)]
struct Cli {
    /// Database connection URL. Falls back to `CLINIC_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Record a new operation for an existing patient.
    CreateOperation {
        #[arg(long = "patient-id", value_name = "id")]
        patient_id: String,
        #[command(flatten)]
        operation: OperationArgs,
    },
    /// Replace an operation's content and asset list; notes are kept.
    UpdateOperation {
        #[arg(long = "operation-id", value_name = "id")]
        operation_id: String,
        #[command(flatten)]
        operation: OperationArgs,
        /// Asset reference to keep; repeat for several.
        #[arg(long = "asset", value_name = "name")]
        assets: Vec<String>,
    },
    ShowOperation {
        #[arg(long = "operation-id", value_name = "id")]
        operation_id: String,
    },
    /// Show a patient's most recent operations.
    ListOperations {
        #[arg(long = "patient-id", value_name = "id")]
        patient_id: String,
    },
    AddNote {
        #[arg(long = "operation-id", value_name = "id")]
        operation_id: String,
        #[arg(long = "content", value_name = "text")]
        content: String,
    },
    /// Upload a file and attach it to an operation.
    AttachAsset {
        #[arg(long = "operation-id", value_name = "id")]
        operation_id: String,
        #[arg(long = "file", value_name = "path")]
        file: PathBuf,
        /// Stored asset name. Defaults to the file name.
        #[arg(long = "name", value_name = "name")]
        name: Option<String>,
        #[arg(long = "content-type", value_name = "mime", default_value = DEFAULT_CONTENT_TYPE)]
        content_type: String,
    },
    /// Bill an operation with a pending invoice.
    CreateInvoice {
        #[arg(long = "operation-id", value_name = "id")]
        operation_id: String,
        #[arg(long = "amount", value_name = "decimal")]
        amount: Decimal,
        #[arg(long = "currency", value_name = "code")]
        currency: String,
    },
    ShowInvoice {
        #[arg(long = "invoice-id", value_name = "id")]
        invoice_id: String,
    },
    SetInvoiceStatus {
        #[arg(long = "invoice-id", value_name = "id")]
        invoice_id: String,
        /// `pending`, `paid`, or `cancelled`.
        #[arg(long = "status", value_name = "status")]
        status: InvoiceStatus,
    },
    /// List invoices for one operation or across a patient's operations.
    #[command(group(clap::ArgGroup::new("owner").required(true)))]
    ListInvoices {
        #[arg(long = "operation-id", value_name = "id", group = "owner")]
        operation_id: Option<String>,
        #[arg(long = "patient-id", value_name = "id", group = "owner")]
        patient_id: Option<String>,
    },
}

/// Business fields shared by `create-operation` and `update-operation`.
#[derive(Debug, Args)]
struct OperationArgs {
    #[arg(long = "type", value_name = "type")]
    operation_type: String,
    #[arg(long = "description", value_name = "text", default_value = "")]
    description: String,
    #[arg(long = "executor", value_name = "name")]
    executor: String,
    /// Estimated total cost.
    #[arg(long = "cost", value_name = "decimal")]
    cost: Decimal,
    #[arg(long = "currency", value_name = "code")]
    currency: String,
    /// Per-tooth cost as `tooth=amount`; repeat for several teeth.
    #[arg(long = "detail", value_name = "tooth=amount", value_parser = parse_detail)]
    details: Vec<(u8, Decimal)>,
}

impl OperationArgs {
    fn into_request(self) -> Result<OperationRequest> {
        let currency = CurrencyCode::new(self.currency).wrap_err("invalid currency")?;
        let details = self
            .details
            .into_iter()
            .map(|(tooth, amount)| Detail::new(tooth, Money::new(amount, currency.clone())))
            .collect();
        Ok(OperationRequest {
            operation_type: self.operation_type,
            description: self.description,
            executor: self.executor,
            estimated_cost: Money::new(self.cost, currency),
            details,
        })
    }
}

fn parse_detail(raw: &str) -> Result<(u8, Decimal), String> {
    let (tooth, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("detail '{raw}' must look like tooth=amount"))?;
    let tooth = tooth
        .trim()
        .parse::<u8>()
        .map_err(|error| format!("invalid tooth number in '{raw}': {error}"))?;
    let amount = amount
        .trim()
        .parse::<Decimal>()
        .map_err(|error| format!("invalid amount in '{raw}': {error}"))?;
    Ok((tooth, amount))
}

type Operations = OperationService<DieselOperationRepository, DieselPatientRepository>;
type Invoices = InvoiceService<DieselInvoiceRepository, DieselOperationRepository>;

struct Services {
    operations: Operations,
    invoices: Invoices,
}

impl Services {
    async fn connect(settings: &ClinicSettings) -> Result<Self> {
        let config = PoolConfig::from_settings(settings).wrap_err("configure database pool")?;
        let pool = DbPool::new(config)
            .await
            .wrap_err("create database pool")?;
        let storage = DirectoryObjectStorage::open(settings.asset_root())
            .wrap_err_with(|| format!("open asset root '{}'", settings.asset_root().display()))?;

        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidIdGenerator);
        let operation_repo = Arc::new(DieselOperationRepository::new(
            pool.clone(),
            Arc::clone(&clock),
        ));
        let invoice_repo = Arc::new(DieselInvoiceRepository::new(
            pool.clone(),
            Arc::clone(&clock),
        ));
        let patient_repo = Arc::new(DieselPatientRepository::new(pool));

        Ok(Self {
            operations: OperationService::new(
                Arc::clone(&operation_repo),
                patient_repo,
                Arc::clone(&ids),
                Arc::new(storage),
                Arc::clone(&clock),
            ),
            invoices: InvoiceService::new(invoice_repo, operation_repo, ids, clock),
        })
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let settings = ClinicSettings::load_from_iter([OsString::from("clinic")])
        .map_err(|error| eyre!("load configuration: {error}"))?;
    init_tracing(settings.log_format());

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(run(cli, settings))
}

fn init_tracing(format: LogFormat) {
    let builder = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    if let Err(e) = result {
        warn!(error = %e, "tracing init failed");
    }
}

/// Apply a `--database-url` override on top of the loaded settings.
fn with_database_url(explicit: Option<String>, settings: ClinicSettings) -> Result<ClinicSettings> {
    let Some(value) = explicit else {
        return Ok(settings);
    };
    if value.trim().is_empty() {
        return Err(eyre!("--database-url must not be empty when provided"));
    }
    Ok(ClinicSettings {
        database_url: Some(value),
        ..settings
    })
}

async fn run(cli: Cli, settings: ClinicSettings) -> Result<()> {
    let settings = with_database_url(cli.database_url, settings)?;
    let database_url = settings
        .database_url()
        .map(str::to_owned)
        .ok_or_else(|| eyre!("database URL missing: set --database-url or CLINIC_DATABASE_URL"))?;

    let command = match cli.command {
        Command::Migrate => {
            let applied = run_pending_migrations_async(database_url)
                .await
                .wrap_err("apply migrations")?;
            return print_json(&applied);
        }
        command => command,
    };

    let services = Services::connect(&settings).await?;
    match command {
        // Handled before connecting.
        Command::Migrate => Ok(()),
        Command::CreateOperation {
            patient_id,
            operation,
        } => {
            let request = CreateOperationRequest {
                patient_id: PatientId::new(patient_id)?,
                operation: operation.into_request()?,
            };
            print_json(&services.operations.create_operation(request).await?)
        }
        Command::UpdateOperation {
            operation_id,
            operation,
            assets,
        } => {
            let request = UpdateOperationRequest {
                operation: operation.into_request()?,
                assets,
            };
            let updated = services
                .operations
                .update_operation(&OperationId::new(operation_id)?, request)
                .await?;
            print_json(&updated)
        }
        Command::ShowOperation { operation_id } => {
            let operation = services
                .operations
                .get_operation(&OperationId::new(operation_id)?)
                .await?;
            print_json(&operation)
        }
        Command::ListOperations { patient_id } => {
            let operations = services
                .operations
                .list_patient_operations(&PatientId::new(patient_id)?)
                .await?;
            print_json(&operations)
        }
        Command::AddNote {
            operation_id,
            content,
        } => {
            let updated = services
                .operations
                .add_operation_note(&OperationId::new(operation_id)?, &content)
                .await?;
            print_json(&updated)
        }
        Command::AttachAsset {
            operation_id,
            file,
            name,
            content_type,
        } => {
            let (file_name, bytes) = read_upload(&file)?;
            let upload = AssetUpload {
                asset_name: name.unwrap_or(file_name),
                content_type,
                bytes,
            };
            let updated = services
                .operations
                .add_operation_asset(&OperationId::new(operation_id)?, upload)
                .await?;
            print_json(&updated)
        }
        Command::CreateInvoice {
            operation_id,
            amount,
            currency,
        } => {
            let request = CreateInvoiceRequest {
                operation_id: OperationId::new(operation_id)?,
                amount: Money::new(amount, CurrencyCode::new(currency)?),
            };
            print_json(&services.invoices.create_invoice(request).await?)
        }
        Command::ShowInvoice { invoice_id } => {
            let invoice = services
                .invoices
                .get_invoice(&InvoiceId::new(invoice_id)?)
                .await?;
            print_json(&invoice)
        }
        Command::SetInvoiceStatus { invoice_id, status } => {
            let invoice = services
                .invoices
                .update_invoice_status(&InvoiceId::new(invoice_id)?, status)
                .await?;
            print_json(&invoice)
        }
        Command::ListInvoices {
            operation_id,
            patient_id,
        } => {
            let invoices = match (operation_id, patient_id) {
                (Some(operation_id), _) => {
                    services
                        .invoices
                        .list_operation_invoices(&OperationId::new(operation_id)?)
                        .await?
                }
                (None, Some(patient_id)) => {
                    services
                        .invoices
                        .list_patient_invoices(&PatientId::new(patient_id)?)
                        .await?
                }
                (None, None) => return Err(eyre!("--operation-id or --patient-id is required")),
            };
            print_json(&invoices)
        }
    }
}

fn read_upload(path: &Path) -> Result<(String, Vec<u8>)> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| eyre!("'{}' does not name a UTF-8 file", path.display()))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())
        .wrap_err_with(|| format!("open directory '{}'", parent.display()))?;
    let bytes = directory
        .read(file_name)
        .wrap_err_with(|| format!("read '{}'", path.display()))?;
    Ok((file_name.to_owned(), bytes))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).wrap_err("render JSON output")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Unit tests for CLI parsing helpers.

    use std::io::Write;

    use rstest::rstest;
    use tempfile::NamedTempFile;

    use super::*;

    #[rstest]
    fn detail_parser_accepts_tooth_and_amount() {
        let (tooth, amount) = parse_detail("11=10.33").expect("detail should parse");
        assert_eq!(tooth, 11);
        assert_eq!(amount, Decimal::new(1033, 2));
    }

    #[rstest]
    #[case("11", "tooth=amount")]
    #[case("eleven=10", "invalid tooth number")]
    #[case("11=ten", "invalid amount")]
    fn detail_parser_rejects_malformed_input(#[case] raw: &str, #[case] expected: &str) {
        let error = parse_detail(raw).expect_err("detail should fail");
        assert!(error.contains(expected), "unexpected error: {error}");
    }

    #[rstest]
    fn operation_args_share_one_currency() {
        let cli = Cli::try_parse_from([
            "clinic",
            "create-operation",
            "--patient-id",
            "patient-1",
            "--type",
            "filling",
            "--executor",
            "Dr. Rossi",
            "--cost",
            "30.77",
            "--currency",
            "EUR",
            "--detail",
            "11=10.33",
            "--detail",
            "21=20.44",
        ])
        .expect("arguments should parse");

        let Command::CreateOperation { operation, .. } = cli.command else {
            panic!("expected create-operation");
        };
        let request = operation.into_request().expect("valid request");
        assert_eq!(request.details.len(), 2);
        assert_eq!(request.estimated_cost.currency().as_str(), "EUR");
        assert!(
            request
                .details
                .iter()
                .all(|detail| detail.estimated_cost.currency().as_str() == "EUR")
        );
    }

    #[rstest]
    fn list_invoices_requires_an_owner() {
        let result = Cli::try_parse_from(["clinic", "list-invoices"]);
        assert!(result.is_err());
    }

    #[rstest]
    fn invoice_status_parses_case_insensitively() {
        let cli = Cli::try_parse_from([
            "clinic",
            "set-invoice-status",
            "--invoice-id",
            "inv-1",
            "--status",
            "Paid",
        ])
        .expect("arguments should parse");
        assert!(matches!(
            cli.command,
            Command::SetInvoiceStatus {
                status: InvoiceStatus::Paid,
                ..
            }
        ));
    }

    #[rstest]
    fn upload_reads_file_name_and_bytes() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"xray").expect("write temp file");

        let (name, bytes) = read_upload(file.path()).expect("upload should read");
        assert_eq!(bytes, b"xray");
        assert_eq!(
            Some(name.as_str()),
            file.path().file_name().and_then(|n| n.to_str())
        );
    }

    #[rstest]
    fn database_url_override_replaces_configured_value() {
        let settings = ClinicSettings {
            database_url: Some("postgres://configured".to_owned()),
            db_max_connections: None,
            db_checkout_timeout_secs: None,
            asset_root: None,
            log_format: None,
        };
        assert!(with_database_url(Some(" ".to_owned()), settings.clone()).is_err());

        let kept = with_database_url(None, settings.clone()).expect("settings kept");
        assert_eq!(kept.database_url(), Some("postgres://configured"));

        let overridden = with_database_url(Some("postgres://cli".to_owned()), settings)
            .expect("override applies");
        assert_eq!(overridden.database_url(), Some("postgres://cli"));
    }
}
