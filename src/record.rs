//! Persistence boundary for finished conversions.
//!
//! Every conversion, completed or failed, is stored as a
//! [`ConversionRecord`] owned by the user who requested it. The storage
//! backend sits behind the [`ConversionStore`] trait; [`MemoryStore`] is the
//! in-process implementation used by the CLI and in tests.

use crate::error::StoreError;
use crate::output::{ConversionResult, ConversionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Identifier assigned by the store on save.
pub type RecordId = u64;

/// One stored conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// `None` until the record has been saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub owner: String,
    pub original_filename: String,
    pub source_location: String,
    pub xml: String,
    pub status: ConversionStatus,
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
}

impl ConversionRecord {
    /// Capture `result` for `owner`, timestamped now.
    pub fn new(
        owner: impl Into<String>,
        original_filename: impl Into<String>,
        source_location: impl Into<String>,
        result: &ConversionResult,
    ) -> Self {
        Self {
            id: None,
            owner: owner.into(),
            original_filename: original_filename.into(),
            source_location: source_location.into(),
            xml: result.xml.clone(),
            status: result.status,
            page_count: result.page_count,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner == owner
    }
}

/// Storage backend for conversion records.
#[async_trait]
pub trait ConversionStore: Send + Sync {
    /// Persist `record` and return its newly assigned id.
    async fn save(&self, record: ConversionRecord) -> Result<RecordId, StoreError>;

    async fn find_by_id(&self, id: RecordId) -> Result<Option<ConversionRecord>, StoreError>;

    /// All records of `owner`, newest first.
    async fn find_all_by_owner(&self, owner: &str) -> Result<Vec<ConversionRecord>, StoreError>;
}

/// Fetch record `id` on behalf of `owner`.
///
/// Returns [`StoreError::NotFound`] when no such record exists and
/// [`StoreError::NotAuthorized`] when it belongs to someone else.
pub async fn find_owned(
    store: &dyn ConversionStore,
    id: RecordId,
    owner: &str,
) -> Result<ConversionRecord, StoreError> {
    let record = store.find_by_id(id).await?.ok_or(StoreError::NotFound)?;
    if !record.is_owned_by(owner) {
        return Err(StoreError::NotAuthorized);
    }
    Ok(record)
}

/// Append-only in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    records: RwLock<Vec<ConversionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConversionStore for MemoryStore {
    async fn save(&self, mut record: ConversionRecord) -> Result<RecordId, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        record.id = Some(id);
        debug!("Saving conversion record {} for {}", id, record.owner);
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(id)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<ConversionRecord>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.iter().find(|r| r.id == Some(id)).cloned())
    }

    async fn find_all_by_owner(&self, owner: &str) -> Result<Vec<ConversionRecord>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut owned: Vec<_> = records
            .iter()
            .filter(|r| r.is_owned_by(owner))
            .cloned()
            .collect();
        // Ids break ties between records created within the same clock tick.
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned)
    }
}
