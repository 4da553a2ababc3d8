//! In-memory adapters mirroring the Diesel repositories' semantics.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mockable::Clock;

use crate::domain::ports::{
    IdGenerator, InvoiceRepository, InvoiceRepositoryError, ObjectStorage, ObjectStorageError,
    OperationRepository, OperationRepositoryError, PATIENT_OPERATIONS_PAGE_SIZE,
    PatientRepository, PatientRepositoryError,
};
use crate::domain::{
    Invoice, InvoiceDraft, InvoiceId, InvoiceStatus, OperationId, OperationNote, Patient,
    PatientId, PatientOperation, PatientOperationDraft,
};

#[derive(Default)]
struct Tables {
    patients: HashMap<PatientId, Patient>,
    operations: HashMap<OperationId, PatientOperation>,
    invoices: HashMap<InvoiceId, Invoice>,
}

/// Patients, operations, and invoices held in one locked table set.
///
/// Implements every repository port so services can share one instance.
pub struct InMemoryClinicStore {
    tables: Mutex<Tables>,
    clock: Arc<dyn Clock>,
}

impl InMemoryClinicStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            clock,
        }
    }

    /// Register a patient so operations can reference it.
    pub fn insert_patient(&self, patient: Patient) {
        self.lock().patients.insert(patient.id().clone(), patient);
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clinic store mutex"),
        }
    }
}

/// Merge a re-saved aggregate onto the stored one: scalars and assets come
/// from `incoming`, notes and creation time stay as stored.
fn merge_resave(
    stored: &PatientOperation,
    incoming: &PatientOperation,
) -> Result<PatientOperation, OperationRepositoryError> {
    PatientOperation::new(PatientOperationDraft {
        id: stored.id().clone(),
        patient_id: incoming.patient_id().clone(),
        operation_type: incoming.operation_type().to_owned(),
        description: incoming.description().to_owned(),
        executor: incoming.executor().to_owned(),
        assets: incoming.assets().to_vec(),
        additional_notes: stored.additional_notes().to_vec(),
        creation_date_time: stored.creation_date_time(),
        last_update: incoming.last_update(),
        estimated_cost: incoming.estimated_cost().clone(),
        details: incoming.details().to_vec(),
    })
    .map_err(|error| OperationRepositoryError::query(error.to_string()))
}

#[async_trait]
impl OperationRepository for InMemoryClinicStore {
    async fn retrieve(
        &self,
        operation_id: &OperationId,
    ) -> Result<Option<PatientOperation>, OperationRepositoryError> {
        Ok(self.lock().operations.get(operation_id).cloned())
    }

    async fn save(
        &self,
        operation: &PatientOperation,
    ) -> Result<PatientOperation, OperationRepositoryError> {
        let mut tables = self.lock();
        let row = match tables.operations.get(operation.id()) {
            Some(stored) => merge_resave(stored, operation)?,
            None => operation.clone(),
        };
        tables.operations.insert(row.id().clone(), row);
        Ok(operation.clone())
    }

    async fn find_by_patient_id(
        &self,
        patient_id: &PatientId,
    ) -> Result<Vec<PatientOperation>, OperationRepositoryError> {
        let tables = self.lock();
        let mut found: Vec<_> = tables
            .operations
            .values()
            .filter(|operation| operation.patient_id() == patient_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.creation_date_time()
                .cmp(&a.creation_date_time())
                .then_with(|| b.id().cmp(a.id()))
        });
        found.truncate(PATIENT_OPERATIONS_PAGE_SIZE);
        Ok(found)
    }

    async fn add_note(
        &self,
        operation_id: &OperationId,
        content: &str,
    ) -> Result<Option<PatientOperation>, OperationRepositoryError> {
        let now = self.clock.utc();
        let mut tables = self.lock();
        Ok(tables.operations.get_mut(operation_id).map(|operation| {
            operation.append_note(OperationNote::new(content, now));
            operation.clone()
        }))
    }

    async fn add_asset(
        &self,
        operation_id: &OperationId,
        asset_name: &str,
    ) -> Result<Option<PatientOperation>, OperationRepositoryError> {
        let now = self.clock.utc();
        let mut tables = self.lock();
        Ok(tables.operations.get_mut(operation_id).map(|operation| {
            operation.append_asset(asset_name, now);
            operation.clone()
        }))
    }
}

fn newest_first(invoices: &mut [Invoice]) {
    invoices.sort_by(|a, b| {
        b.creation_date_time()
            .cmp(&a.creation_date_time())
            .then_with(|| b.id().cmp(a.id()))
    });
}

#[async_trait]
impl InvoiceRepository for InMemoryClinicStore {
    async fn retrieve(
        &self,
        invoice_id: &InvoiceId,
    ) -> Result<Option<Invoice>, InvoiceRepositoryError> {
        Ok(self.lock().invoices.get(invoice_id).cloned())
    }

    async fn find_by_operation_id(
        &self,
        operation_id: &OperationId,
    ) -> Result<Vec<Invoice>, InvoiceRepositoryError> {
        let tables = self.lock();
        let mut found: Vec<_> = tables
            .invoices
            .values()
            .filter(|invoice| invoice.operation_id() == operation_id)
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn find_by_patient_id(
        &self,
        patient_id: &PatientId,
    ) -> Result<Vec<Invoice>, InvoiceRepositoryError> {
        let tables = self.lock();
        let mut found: Vec<_> = tables
            .invoices
            .values()
            .filter(|invoice| {
                tables
                    .operations
                    .get(invoice.operation_id())
                    .is_some_and(|operation| operation.patient_id() == patient_id)
            })
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn save(&self, invoice: &Invoice) -> Result<Invoice, InvoiceRepositoryError> {
        let mut tables = self.lock();
        let row = match tables.invoices.get(invoice.id()) {
            Some(stored) => Invoice::new(InvoiceDraft {
                id: stored.id().clone(),
                operation_id: stored.operation_id().clone(),
                amount: invoice.amount().clone(),
                status: invoice.status(),
                creation_date_time: stored.creation_date_time(),
                last_update: invoice.last_update(),
            })
            .map_err(|error| InvoiceRepositoryError::query(error.to_string()))?,
            None => invoice.clone(),
        };
        tables.invoices.insert(row.id().clone(), row.clone());
        Ok(row)
    }

    async fn update_status(
        &self,
        invoice_id: &InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, InvoiceRepositoryError> {
        let now = self.clock.utc();
        let mut tables = self.lock();
        let Some(current) = tables.invoices.remove(invoice_id) else {
            return Ok(None);
        };
        let updated = current.transition_to(status, now);
        tables.invoices.insert(invoice_id.clone(), updated.clone());
        Ok(Some(updated))
    }
}

#[async_trait]
impl PatientRepository for InMemoryClinicStore {
    async fn retrieve(
        &self,
        patient_id: &PatientId,
    ) -> Result<Option<Patient>, PatientRepositoryError> {
        Ok(self.lock().patients.get(patient_id).cloned())
    }
}

/// Generates `op-1`, `op-2`, ... and `inv-1`, `inv-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    fn next_suffix(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn new_operation_id(&self) -> OperationId {
        match OperationId::new(format!("op-{}", self.next_suffix())) {
            Ok(id) => id,
            Err(error) => panic!("sequential operation id: {error}"),
        }
    }

    fn new_invoice_id(&self) -> InvoiceId {
        match InvoiceId::new(format!("inv-{}", self.next_suffix())) {
            Ok(id) => id,
            Err(error) => panic!("sequential invoice id: {error}"),
        }
    }
}

/// Stored object and its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object storage that keeps uploads in memory, or refuses them all.
#[derive(Debug, Default)]
pub struct RecordingObjectStorage {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    refuse_uploads: bool,
}

impl RecordingObjectStorage {
    /// Storage whose every upload fails.
    pub fn failing() -> Self {
        Self {
            objects: Mutex::default(),
            refuse_uploads: true,
        }
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredObject>> {
        match self.objects.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("object storage mutex"),
        }
    }
}

#[async_trait]
impl ObjectStorage for RecordingObjectStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ObjectStorageError> {
        if self.refuse_uploads {
            return Err(ObjectStorageError::upload(key, "storage offline"));
        }
        self.lock().insert(
            key.to_owned(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_owned(),
            },
        );
        Ok(())
    }
}
