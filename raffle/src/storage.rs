//! Durable storage for sold tickets.
//!
//! The store is a single key holding the whole list of SOLD records. Reads
//! return the full list, writes replace it. AVAILABLE and SELECTED state is
//! never stored.

use crate::error::StorageError;
use crate::types::SoldTicketRecord;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Default key (file stem) of the sold-ticket sheet
pub const STORAGE_KEY: &str = "rifa_digital_sheet_v2";

/// Key-value holder for the set of sold-ticket records.
///
/// Returns `BoxFuture` instead of using async fn so the trait stays
/// object-safe and can be injected as `Arc<dyn TicketStore>`.
pub trait TicketStore: Send + Sync {
    /// Loads every persisted record; `Ok(None)` when nothing was ever written.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the value cannot be read or parsed.
    fn load_sold(&self) -> BoxFuture<'_, Result<Option<Vec<SoldTicketRecord>>, StorageError>>;

    /// Replaces the persisted set with `records`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the value cannot be written.
    fn replace_sold(
        &self,
        records: Vec<SoldTicketRecord>,
    ) -> BoxFuture<'_, Result<(), StorageError>>;
}

/// Logs the synced rows, one line per ticket
fn log_sheet_sync(records: &[SoldTicketRecord]) {
    tracing::info!(rows = records.len(), "Synced sold tickets to sheet");
    for record in records {
        tracing::debug!(
            number = %record.number,
            name = %record.buyer_name,
            phone = %record.buyer_phone,
            email = %record.buyer_email,
            date = %record.purchase_date.to_rfc3339(),
            value = %record.amount_paid,
            "sheet row"
        );
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Ticket store kept in process memory.
///
/// Holds the serialized value exactly as a key-value store would, so
/// malformed data can be injected. Writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    value: RwLock<Option<String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryTicketStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose key already holds `raw`
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            value: RwLock::new(Some(raw.into())),
            ..Self::default()
        }
    }

    /// Creates a store already holding `records`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupt`] if the records cannot be serialized.
    pub fn with_records(records: &[SoldTicketRecord]) -> Result<Self, StorageError> {
        Ok(Self::with_raw(serde_json::to_string(records)?))
    }

    /// Makes subsequent writes fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw stored value
    pub async fn raw(&self) -> Option<String> {
        self.value.read().await.clone()
    }

    /// Parsed stored records; empty when the key is missing or unreadable
    pub async fn records(&self) -> Vec<SoldTicketRecord> {
        self.raw()
            .await
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

impl TicketStore for InMemoryTicketStore {
    fn load_sold(&self) -> BoxFuture<'_, Result<Option<Vec<SoldTicketRecord>>, StorageError>> {
        Box::pin(async move {
            let value = self.value.read().await;
            match value.as_deref() {
                Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
                None => Ok(None),
            }
        })
    }

    fn replace_sold(
        &self,
        records: Vec<SoldTicketRecord>,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Write("in-memory store rejected the write".into()));
            }
            let raw = serde_json::to_string(&records).map_err(encode_error)?;
            *self.value.write().await = Some(raw);
            self.writes.fetch_add(1, Ordering::SeqCst);
            log_sheet_sync(&records);
            Ok(())
        })
    }
}

/// Records that cannot be encoded are a failed write, not corrupt stored data
fn encode_error(error: serde_json::Error) -> StorageError {
    StorageError::Write(format!("could not encode sold tickets: {error}"))
}

// ============================================================================
// JSON file store
// ============================================================================

/// Ticket store backed by one JSON file.
///
/// A missing file means nothing was stored yet. Writes go to a sibling
/// temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileTicketStore {
    path: PathBuf,
}

impl JsonFileTicketStore {
    /// Creates a store for `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at `<dir>/rifa_digital_sheet_v2.json`
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{STORAGE_KEY}.json")))
    }

    /// Location of the JSON file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TicketStore for JsonFileTicketStore {
    fn load_sold(&self) -> BoxFuture<'_, Result<Option<Vec<SoldTicketRecord>>, StorageError>> {
        Box::pin(async move {
            let raw = match tokio::fs::read_to_string(&self.path).await {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(StorageError::Read(format!("{}: {e}", self.path.display())));
                },
            };
            Ok(Some(serde_json::from_str(&raw)?))
        })
    }

    fn replace_sold(
        &self,
        records: Vec<SoldTicketRecord>,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            let raw = serde_json::to_string_pretty(&records).map_err(encode_error)?;
            let write_err = |e: std::io::Error| {
                StorageError::Write(format!("{}: {e}", self.path.display()))
            };

            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            }
            let temp = self.temp_path();
            tokio::fs::write(&temp, raw).await.map_err(write_err)?;
            tokio::fs::rename(&temp, &self.path).await.map_err(write_err)?;

            log_sheet_sync(&records);
            Ok(())
        })
    }
}
