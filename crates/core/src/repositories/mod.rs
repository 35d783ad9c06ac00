//! Storage collaborators.
//!
//! The core talks to persistence only through the traits below. The file-backed
//! implementations keep everything under the configured data directory:
//!
//! ```text
//! <data_dir>/
//! ├── options/
//! │   ├── schema.json     sections, core and custom definitions
//! │   └── backups.json    rolling bundle history
//! ├── records/
//! │   └── <id>.yaml       one intake record per file
//! └── files/              signature images (intake_files)
//! ```
//!
//! Writers replace whole documents. Concurrent writers are last-write-wins; no operation
//! here retries after a storage failure.

mod helpers;
pub mod options;
pub mod records;

pub use options::OptionFileStore;
pub use records::FileRecordStore;

use crate::bundle::BackupStore;
use crate::record::{CoreValues, CustomAnswers, IntakeRecord, RecordDraft, RecordId, RecordSummary};
use crate::schema::Schema;
use crate::IntakeResult;
use chrono::{DateTime, Utc};

/// Persistence for the three schema collections, always written together.
pub trait SchemaRepository: Send + Sync {
    /// Loads the schema; an absent document is an empty schema.
    fn load(&self) -> IntakeResult<Schema>;

    /// Replaces the stored schema.
    fn save(&self, schema: &Schema) -> IntakeResult<()>;
}

/// Persistence for the rolling bundle history.
pub trait BackupRepository: Send + Sync {
    fn load_backups(&self) -> IntakeResult<BackupStore>;

    fn save_backups(&self, backups: &BackupStore) -> IntakeResult<()>;
}

/// Provider signature applied to an existing record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSignature {
    pub provider_name: Option<String>,
    pub signature_url: String,
    pub signed_at: DateTime<Utc>,
}

/// Persistence for intake records.
pub trait RecordRepository: Send + Sync {
    /// Stores a new record and returns its freshly allocated id.
    fn create(&self, draft: RecordDraft) -> IntakeResult<RecordId>;

    fn get_by_id(&self, id: RecordId) -> IntakeResult<Option<IntakeRecord>>;

    /// Assigns `core_values` onto the record's columns and replaces its custom answers
    /// wholesale.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::NotFound` if no record has this id.
    fn update(
        &self,
        id: RecordId,
        core_values: &CoreValues,
        custom_answers: CustomAnswers,
    ) -> IntakeResult<()>;

    /// Overwrites the provider signature fields.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::NotFound` if no record has this id.
    fn sign_as_provider(&self, id: RecordId, signature: ProviderSignature) -> IntakeResult<()>;

    /// Summaries of the newest records, highest id first.
    fn list_recent(&self, limit: usize) -> IntakeResult<Vec<RecordSummary>>;
}
