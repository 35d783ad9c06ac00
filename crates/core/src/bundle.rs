//! Config bundles: portable snapshots of the whole schema.
//!
//! A bundle is exported on demand, and one is taken implicitly before every import or
//! restore so that either can be undone. The implicit snapshots live in a [`BackupStore`]
//! capped at [`MAX_BACKUPS`] entries keyed by unix timestamp.
//!
//! Bundle JSON looks like:
//!
//! ```json
//! {
//!   "meta": { "plugin": "intake-form", "version": "0.1.0", "exported_at": 1760000000 },
//!   "sections": [ ... ],
//!   "core": [ ... ],
//!   "custom": [ ... ]
//! }
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::constants::{BUNDLE_PLUGIN_NAME, BUNDLE_VERSION, MAX_BACKUPS};
use crate::repositories::{BackupRepository, OptionFileStore, SchemaRepository};
use crate::schema::{CoreFieldDefinition, CustomFieldDefinition, Schema, Section};
use crate::{IntakeError, IntakeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMeta {
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub exported_at: i64,
}

/// A complete schema snapshot plus export metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub meta: BundleMeta,
    pub sections: Vec<Section>,
    pub core: Vec<CoreFieldDefinition>,
    pub custom: Vec<CustomFieldDefinition>,
}

impl ConfigBundle {
    fn snapshot(schema: Schema, exported_at: i64) -> Self {
        Self {
            meta: BundleMeta {
                plugin: BUNDLE_PLUGIN_NAME.to_owned(),
                version: BUNDLE_VERSION.to_owned(),
                exported_at,
            },
            sections: schema.sections,
            core: schema.core,
            custom: schema.custom,
        }
    }

    fn into_schema(self) -> Schema {
        Schema {
            sections: self.sections,
            core: self.core,
            custom: self.custom,
        }
    }
}

/// A bundle as read from an upload, before its shape is checked.
///
/// Every member is optional here; [`BundleDocument::validate`] decides whether the
/// document is usable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDocument {
    #[serde(default)]
    pub meta: Option<BundleMeta>,
    #[serde(default)]
    pub sections: Option<Vec<Section>>,
    #[serde(default)]
    pub core: Option<Vec<CoreFieldDefinition>>,
    #[serde(default)]
    pub custom: Option<Vec<CustomFieldDefinition>>,
}

impl BundleDocument {
    /// Checks the bundle shape: `sections` present and non-empty, `core` and `custom`
    /// present (possibly empty).
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::BundleFormat` naming the first missing member.
    pub fn validate(self) -> IntakeResult<ConfigBundle> {
        let sections = match self.sections {
            Some(sections) if !sections.is_empty() => sections,
            Some(_) => return Err(IntakeError::BundleFormat("bundle has no sections".into())),
            None => return Err(IntakeError::BundleFormat("bundle is missing \"sections\"".into())),
        };
        let core = self
            .core
            .ok_or_else(|| IntakeError::BundleFormat("bundle is missing \"core\"".into()))?;
        let custom = self
            .custom
            .ok_or_else(|| IntakeError::BundleFormat("bundle is missing \"custom\"".into()))?;

        Ok(ConfigBundle {
            meta: self.meta.unwrap_or_default(),
            sections,
            core,
            custom,
        })
    }
}

impl From<ConfigBundle> for BundleDocument {
    fn from(bundle: ConfigBundle) -> Self {
        Self {
            meta: Some(bundle.meta),
            sections: Some(bundle.sections),
            core: Some(bundle.core),
            custom: Some(bundle.custom),
        }
    }
}

/// Rolling bundle history keyed by unix timestamp.
///
/// Two backups taken in the same second share a key and the later one wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupStore(BTreeMap<i64, ConfigBundle>);

impl BackupStore {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, timestamp: i64) -> Option<&ConfigBundle> {
        self.0.get(&timestamp)
    }

    /// Stores `bundle` under `timestamp`, then evicts the oldest entries until at most
    /// [`MAX_BACKUPS`] remain.
    pub fn insert(&mut self, timestamp: i64, bundle: ConfigBundle) {
        self.0.insert(timestamp, bundle);
        while self.0.len() > MAX_BACKUPS {
            if self.0.pop_first().is_none() {
                break;
            }
        }
    }

    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &ConfigBundle)> {
        self.0.iter().map(|(stamp, bundle)| (*stamp, bundle))
    }
}

/// One row of the backup listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BackupSummary {
    pub timestamp: i64,
    /// Size of the bundle as compact JSON.
    pub size_bytes: usize,
    pub sections: usize,
    pub core: usize,
    pub custom: usize,
}

/// Export, import, backup and restore of the schema.
#[derive(Clone)]
pub struct BundleManager {
    schema: Arc<dyn SchemaRepository>,
    backups: Arc<dyn BackupRepository>,
    clock: Arc<dyn Clock>,
}

impl BundleManager {
    pub fn new(
        schema: Arc<dyn SchemaRepository>,
        backups: Arc<dyn BackupRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schema,
            backups,
            clock,
        }
    }

    /// Manager over the option documents under `cfg.data_dir()`, reading wall-clock time.
    pub fn from_config(cfg: Arc<CoreConfig>) -> Self {
        let store = Arc::new(OptionFileStore::from_config(&cfg));
        Self::new(store.clone(), store, Arc::new(SystemClock))
    }

    /// Snapshot of the stored schema.
    pub fn export_bundle(&self) -> IntakeResult<ConfigBundle> {
        let schema = self.schema.load()?;
        Ok(ConfigBundle::snapshot(schema, self.clock.unix_timestamp()))
    }

    /// [`export_bundle`](Self::export_bundle) as pretty-printed JSON.
    pub fn export_json(&self) -> IntakeResult<String> {
        let bundle = self.export_bundle()?;
        serde_json::to_string_pretty(&bundle).map_err(IntakeError::Serialization)
    }

    /// Backs up the current schema, then replaces it with `document`.
    ///
    /// The backup is taken even when the document turns out to be invalid; the schema
    /// itself is only written once the document has passed validation.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::BundleFormat` if the document fails
    /// [`BundleDocument::validate`], or a storage error.
    pub fn import_bundle(&self, document: BundleDocument) -> IntakeResult<()> {
        let stamp = self.backup()?;
        let bundle = document.validate()?;
        self.apply(bundle)?;
        tracing::info!(backup = stamp, "config bundle imported");
        Ok(())
    }

    /// Parses uploaded bundle JSON and imports it.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::BundleFormat` naming the offending JSON path when `raw` is not
    /// a well-formed bundle document. Parsing happens before any backup is taken.
    pub fn import_json(&self, raw: &str) -> IntakeResult<()> {
        let document = parse_document(raw)?;
        self.import_bundle(document)
    }

    /// Backs up the current schema, then applies the backup stored under `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::NotFound` if no backup has this timestamp, or
    /// `IntakeError::BundleFormat` if the stored backup fails [`BundleDocument::validate`].
    /// Nothing is written in either case.
    pub fn restore_bundle(&self, timestamp: i64) -> IntakeResult<()> {
        let bundle = self
            .backups
            .load_backups()?
            .get(timestamp)
            .cloned()
            .ok_or_else(|| IntakeError::NotFound(format!("backup {timestamp}")))?;
        let bundle = BundleDocument::from(bundle).validate()?;

        let stamp = self.backup()?;
        self.apply(bundle)?;
        tracing::info!(restored = timestamp, backup = stamp, "config bundle restored");
        Ok(())
    }

    /// Adds a snapshot of the current schema to the backup history and returns its key.
    pub fn backup(&self) -> IntakeResult<i64> {
        let stamp = self.clock.unix_timestamp();
        let bundle = ConfigBundle::snapshot(self.schema.load()?, stamp);

        let mut backups = self.backups.load_backups()?;
        backups.insert(stamp, bundle);
        self.backups.save_backups(&backups)?;

        tracing::info!(backup = stamp, kept = backups.len(), "config backup taken");
        Ok(stamp)
    }

    /// Stored backups, oldest first.
    pub fn list_backups(&self) -> IntakeResult<Vec<BackupSummary>> {
        let backups = self.backups.load_backups()?;
        backups
            .iter()
            .map(|(timestamp, bundle)| {
                let size_bytes = serde_json::to_vec(bundle)
                    .map_err(IntakeError::Serialization)?
                    .len();
                Ok(BackupSummary {
                    timestamp,
                    size_bytes,
                    sections: bundle.sections.len(),
                    core: bundle.core.len(),
                    custom: bundle.custom.len(),
                })
            })
            .collect()
    }

    fn apply(&self, bundle: ConfigBundle) -> IntakeResult<()> {
        if !bundle.meta.version.is_empty() && bundle.meta.version != BUNDLE_VERSION {
            tracing::warn!(
                bundle_version = %bundle.meta.version,
                running_version = BUNDLE_VERSION,
                "applying a bundle exported by a different version"
            );
        }

        let mut schema = bundle.into_schema();
        for field in &mut schema.core {
            field.enforce_locks();
        }
        self.schema.save(&schema)
    }
}

fn parse_document(raw: &str) -> IntakeResult<BundleDocument> {
    let de = &mut serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(de).map_err(|e| {
        let path = e.path().to_string();
        let inner = e.into_inner();
        if path.is_empty() || path == "." {
            IntakeError::BundleFormat(format!("invalid JSON: {inner}"))
        } else {
            IntakeError::BundleFormat(format!("invalid value at {path}: {inner}"))
        }
    })
}
