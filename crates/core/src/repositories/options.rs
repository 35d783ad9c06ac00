//! JSON option documents for the schema and the backup history.

use super::helpers::{read_optional, write_atomic};
use super::{BackupRepository, SchemaRepository};
use crate::bundle::BackupStore;
use crate::config::CoreConfig;
use crate::constants::{BACKUPS_OPTION_FILENAME, SCHEMA_OPTION_FILENAME};
use crate::schema::Schema;
use crate::{IntakeError, IntakeResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// File-backed option store under `<data_dir>/options/`.
#[derive(Clone, Debug)]
pub struct OptionFileStore {
    options_dir: PathBuf,
}

impl OptionFileStore {
    pub fn new(options_dir: impl Into<PathBuf>) -> Self {
        Self {
            options_dir: options_dir.into(),
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.options_dir())
    }

    pub fn options_dir(&self) -> &Path {
        &self.options_dir
    }

    fn read_document<T>(&self, filename: &str) -> IntakeResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        match read_optional(&self.options_dir.join(filename))? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
                .map(Some)
                .map_err(IntakeError::Deserialization),
            _ => Ok(None),
        }
    }

    fn write_document<T>(&self, filename: &str, value: &T) -> IntakeResult<()>
    where
        T: Serialize,
    {
        let json = serde_json::to_vec_pretty(value).map_err(IntakeError::Serialization)?;
        write_atomic(&self.options_dir.join(filename), &json)
    }
}

impl SchemaRepository for OptionFileStore {
    fn load(&self) -> IntakeResult<Schema> {
        Ok(self
            .read_document(SCHEMA_OPTION_FILENAME)?
            .unwrap_or_default())
    }

    fn save(&self, schema: &Schema) -> IntakeResult<()> {
        self.write_document(SCHEMA_OPTION_FILENAME, schema)?;
        tracing::debug!(
            sections = schema.sections.len(),
            core = schema.core.len(),
            custom = schema.custom.len(),
            "schema document written"
        );
        Ok(())
    }
}

impl BackupRepository for OptionFileStore {
    fn load_backups(&self) -> IntakeResult<BackupStore> {
        Ok(self
            .read_document(BACKUPS_OPTION_FILENAME)?
            .unwrap_or_default())
    }

    fn save_backups(&self, backups: &BackupStore) -> IntakeResult<()> {
        self.write_document(BACKUPS_OPTION_FILENAME, backups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_documents_load_empty() {
        let temp = TempDir::new().unwrap();
        let store = OptionFileStore::new(temp.path().join("options"));
        assert!(store.load().unwrap().is_empty());
        assert!(store.load_backups().unwrap().is_empty());
    }

    #[test]
    fn schema_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = OptionFileStore::new(temp.path().join("options"));
        let schema = Schema::seed();

        store.save(&schema).unwrap();
        assert_eq!(store.load().unwrap(), schema);
    }

    #[test]
    fn corrupt_schema_is_a_storage_error() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("options");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SCHEMA_OPTION_FILENAME), "{not json").unwrap();

        let err = OptionFileStore::new(dir).load().unwrap_err();
        assert!(matches!(err, IntakeError::Deserialization(_)));
        assert!(err.is_storage());
    }
}
