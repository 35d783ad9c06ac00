//! One YAML document per intake record under `<data_dir>/records/`.
//!
//! New ids are the highest stored id plus one. The id is claimed by creating its file with
//! create-new semantics, so two writers racing for the same id cannot both win; the loser
//! moves on to the next id.

use super::helpers::{create_new_file, ensure_dir, read_optional, write_atomic, MAX_CLAIM_ATTEMPTS};
use super::{ProviderSignature, RecordRepository};
use crate::config::CoreConfig;
use crate::constants::RECORD_FILE_EXTENSION;
use crate::record::{
    CoreValues, CustomAnswers, IntakeRecord, RecordDraft, RecordId, RecordSummary,
};
use crate::{IntakeError, IntakeResult};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct FileRecordStore {
    records_dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(records_dir: impl Into<PathBuf>) -> Self {
        Self {
            records_dir: records_dir.into(),
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.records_dir())
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    fn record_path(&self, id: RecordId) -> PathBuf {
        self.records_dir
            .join(format!("{}.{}", id, RECORD_FILE_EXTENSION))
    }

    /// Ids of every stored record, ascending.
    fn stored_ids(&self) -> IntakeResult<Vec<RecordId>> {
        let entries = match fs::read_dir(&self.records_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IntakeError::FileRead(e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(IntakeError::FileRead)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_FILE_EXTENSION) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<RecordId>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn load(&self, id: RecordId) -> IntakeResult<Option<IntakeRecord>> {
        match read_optional(&self.record_path(id))? {
            Some(raw) => serde_yaml::from_str(&raw)
                .map(Some)
                .map_err(IntakeError::YamlDeserialization),
            None => Ok(None),
        }
    }

    fn load_existing(&self, id: RecordId) -> IntakeResult<IntakeRecord> {
        self.load(id)?
            .ok_or_else(|| IntakeError::NotFound(format!("intake record {id}")))
    }

    fn store(&self, record: &IntakeRecord) -> IntakeResult<()> {
        let yaml = serde_yaml::to_string(record).map_err(IntakeError::YamlSerialization)?;
        write_atomic(&self.record_path(record.id), yaml.as_bytes())
    }
}

impl RecordRepository for FileRecordStore {
    fn create(&self, draft: RecordDraft) -> IntakeResult<RecordId> {
        ensure_dir(&self.records_dir)?;

        let mut candidate = self
            .stored_ids()?
            .last()
            .map_or(RecordId::new(1), |id| id.next());

        for _attempt in 0..MAX_CLAIM_ATTEMPTS {
            let path = self.record_path(candidate);
            let Some(mut file) = create_new_file(&path)? else {
                candidate = candidate.next();
                continue;
            };

            let record = draft.into_record(candidate);
            let yaml = serde_yaml::to_string(&record).map_err(|e| {
                let _ = fs::remove_file(&path);
                IntakeError::YamlSerialization(e)
            })?;
            if let Err(e) = file.write_all(yaml.as_bytes()).and_then(|()| file.sync_all()) {
                let _ = fs::remove_file(&path);
                return Err(IntakeError::FileWrite(e));
            }

            tracing::info!(record_id = %candidate, "intake record created");
            return Ok(candidate);
        }

        Err(IntakeError::FileWrite(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("failed to allocate a record id after {MAX_CLAIM_ATTEMPTS} attempts"),
        )))
    }

    fn get_by_id(&self, id: RecordId) -> IntakeResult<Option<IntakeRecord>> {
        self.load(id)
    }

    fn update(
        &self,
        id: RecordId,
        core_values: &CoreValues,
        custom_answers: CustomAnswers,
    ) -> IntakeResult<()> {
        let mut record = self.load_existing(id)?;
        record.columns.apply(core_values);
        record.custom_answers = custom_answers;
        self.store(&record)?;
        tracing::info!(record_id = %id, "intake record updated");
        Ok(())
    }

    fn sign_as_provider(&self, id: RecordId, signature: ProviderSignature) -> IntakeResult<()> {
        let mut record = self.load_existing(id)?;
        if record.provider_signature_url.is_some() {
            tracing::info!(record_id = %id, "replacing existing provider signature");
        }
        record.provider_name = signature.provider_name;
        record.provider_signature_url = Some(signature.signature_url);
        record.provider_signed_at = Some(signature.signed_at);
        self.store(&record)?;
        tracing::info!(record_id = %id, "provider signature recorded");
        Ok(())
    }

    fn list_recent(&self, limit: usize) -> IntakeResult<Vec<RecordSummary>> {
        let ids = self.stored_ids()?;
        let mut summaries = Vec::with_capacity(limit.min(ids.len()));
        for id in ids.into_iter().rev().take(limit) {
            if let Some(record) = self.load(id)? {
                summaries.push(RecordSummary::from(&record));
            }
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CoreColumns, CoreValue, CustomAnswer};
    use chrono::{TimeZone, Utc};
    use intake_types::Slug;
    use tempfile::TempDir;

    fn draft(name: &str) -> RecordDraft {
        let mut columns = CoreColumns::default();
        columns.full_name = Some(name.to_owned());
        RecordDraft {
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
            ip_address: Some("10.0.0.1".into()),
            user_agent: None,
            columns,
            signature_url: Some("https://clinic.example/files/sig".into()),
            signed_at: None,
            custom_answers: CustomAnswers::new(),
            honeypot: None,
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> CustomAnswers {
        pairs
            .iter()
            .map(|(k, v)| (Slug::parse(k).unwrap(), Some(CustomAnswer::Text((*v).into()))))
            .collect()
    }

    #[test]
    fn create_allocates_sequential_ids() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path().join("records"));

        let first = store.create(draft("Jane")).unwrap();
        let second = store.create(draft("John")).unwrap();
        assert_eq!(first, RecordId::new(1));
        assert_eq!(second, RecordId::new(2));

        let loaded = store.get_by_id(second).unwrap().unwrap();
        assert_eq!(loaded.id, second);
        assert_eq!(loaded.columns.full_name.as_deref(), Some("John"));
        assert!(store.get_by_id(RecordId::new(99)).unwrap().is_none());
    }

    #[test]
    fn create_ignores_non_record_files() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path().join("records"));
        store.create(draft("Jane")).unwrap();

        fs::write(store.records_dir().join("notes.txt"), "x").unwrap();
        let id = store.create(draft("John")).unwrap();
        assert_eq!(id, RecordId::new(2));
    }

    #[test]
    fn update_replaces_custom_answers_wholesale() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path().join("records"));
        let id = store.create(draft("Jane")).unwrap();

        store
            .update(id, &CoreValues::new(), answers(&[("goal", "rest"), ("diet", "vegan")]))
            .unwrap();
        store.update(id, &CoreValues::new(), answers(&[("goal", "energy")])).unwrap();

        let record = store.get_by_id(id).unwrap().unwrap();
        assert_eq!(record.custom_answers, answers(&[("goal", "energy")]));
    }

    #[test]
    fn update_assigns_core_columns() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path().join("records"));
        let id = store.create(draft("Jane")).unwrap();

        let mut values = CoreValues::new();
        values.insert(Slug::parse("city").unwrap(), CoreValue::Text("Leeds".into()));
        store.update(id, &values, CustomAnswers::new()).unwrap();

        let record = store.get_by_id(id).unwrap().unwrap();
        assert_eq!(record.columns.city.as_deref(), Some("Leeds"));
        assert_eq!(record.columns.full_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn missing_record_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path().join("records"));

        let err = store
            .update(RecordId::new(7), &CoreValues::new(), CustomAnswers::new())
            .unwrap_err();
        assert!(matches!(err, IntakeError::NotFound(_)));

        let err = store
            .sign_as_provider(
                RecordId::new(7),
                ProviderSignature {
                    provider_name: None,
                    signature_url: "u".into(),
                    signed_at: Utc::now(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, IntakeError::NotFound(_)));
    }

    #[test]
    fn provider_signature_overwrites_previous() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path().join("records"));
        let id = store.create(draft("Jane")).unwrap();

        for (name, url) in [("Dr A", "https://x/a"), ("Dr B", "https://x/b")] {
            store
                .sign_as_provider(
                    id,
                    ProviderSignature {
                        provider_name: Some(name.into()),
                        signature_url: url.into(),
                        signed_at: Utc::now(),
                    },
                )
                .unwrap();
        }

        let record = store.get_by_id(id).unwrap().unwrap();
        assert_eq!(record.provider_name.as_deref(), Some("Dr B"));
        assert_eq!(record.provider_signature_url.as_deref(), Some("https://x/b"));
    }

    #[test]
    fn list_recent_is_newest_first_and_limited() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path().join("records"));
        assert!(store.list_recent(10).unwrap().is_empty());

        for name in ["A", "B", "C"] {
            store.create(draft(name)).unwrap();
        }
        let names: Vec<_> = store
            .list_recent(2)
            .unwrap()
            .into_iter()
            .map(|s| s.full_name.unwrap())
            .collect();
        assert_eq!(names, ["C", "B"]);
    }
}
