//! Intake service.
//!
//! Ties the schema, the record store and the signature store together for the public
//! submission flow, the admin edit and provider-sign flows, and the builder save path.
//! Each call runs to completion against the injected collaborators; a storage failure is
//! returned to the caller as-is.

use crate::builder::apply_builder;
use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::constants::{DEFAULT_RECORD_LIST_LIMIT, PROVIDER_SIGNATURE_REQUIRED_MESSAGE};
use crate::payload::{BuilderPayload, RequestMeta, SubmissionPayload};
use crate::record::{CoreColumns, IntakeRecord, RecordDraft, RecordId, RecordSummary};
use crate::render::{render_schema, FormView};
use crate::repositories::{
    FileRecordStore, OptionFileStore, ProviderSignature, RecordRepository, SchemaRepository,
};
use crate::schema::Schema;
use crate::signature::{FileSignatureStore, SignatureImage, SignatureStore};
use crate::submission::{map_edit, validate_and_map, Screening};
use crate::{IntakeError, IntakeResult, ValidationErrors};
use intake_types::NonEmptyText;
use std::sync::Arc;

/// Result of a public submission.
///
/// Both variants are acknowledged to the submitter in the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionReceipt {
    Recorded(RecordId),
    /// Caught by the honeypot; nothing was stored.
    Discarded,
}

impl SubmissionReceipt {
    /// Reference id to show the submitter, if a record was written.
    pub fn reference(&self) -> Option<RecordId> {
        match self {
            Self::Recorded(id) => Some(*id),
            Self::Discarded => None,
        }
    }
}

#[derive(Clone)]
pub struct IntakeService {
    schema: Arc<dyn SchemaRepository>,
    records: Arc<dyn RecordRepository>,
    signatures: Arc<dyn SignatureStore>,
    clock: Arc<dyn Clock>,
}

impl IntakeService {
    pub fn new(
        schema: Arc<dyn SchemaRepository>,
        records: Arc<dyn RecordRepository>,
        signatures: Arc<dyn SignatureStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schema,
            records,
            signatures,
            clock,
        }
    }

    /// Service over the file-backed stores under `cfg.data_dir()`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the data directory cannot be created or opened.
    pub fn from_config(cfg: Arc<CoreConfig>) -> IntakeResult<Self> {
        let signatures = FileSignatureStore::new(&cfg)?;
        Ok(Self::new(
            Arc::new(OptionFileStore::from_config(&cfg)),
            Arc::new(FileRecordStore::from_config(&cfg)),
            Arc::new(signatures),
            Arc::new(SystemClock),
        ))
    }

    /// The stored schema as is.
    pub fn schema(&self) -> IntakeResult<Schema> {
        self.schema.load()
    }

    /// Writes the install-time schema.
    ///
    /// With `only_if_empty`, an existing non-empty schema is left alone. Returns whether
    /// the seed was written.
    pub fn seed_defaults(&self, only_if_empty: bool) -> IntakeResult<bool> {
        if only_if_empty && !self.schema.load()?.is_empty() {
            tracing::debug!("schema already present; seed skipped");
            return Ok(false);
        }
        self.schema.save(&Schema::seed())?;
        tracing::info!("default schema seeded");
        Ok(true)
    }

    /// The blank public form: enabled sections, enabled core fields and grouped custom
    /// fields.
    pub fn render_public_form(&self) -> IntakeResult<FormView> {
        let schema = self.schema.load()?;
        Ok(render_schema(
            &schema.sections(true),
            &schema.core_fields(true),
            &schema.group_custom_by_section(),
            None,
        ))
    }

    /// The staff edit form for an existing record, pre-filled from it.
    ///
    /// Disabled core fields are included so staff can still correct their columns.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::NotFound` if no record has this id.
    pub fn render_admin_edit(&self, id: RecordId) -> IntakeResult<FormView> {
        let record = self.get_record(id)?;
        let schema = self.schema.load()?;
        Ok(render_schema(
            &schema.sections(true),
            &schema.core_fields(false),
            &schema.group_custom_by_section(),
            Some(&record),
        ))
    }

    /// Screens, validates and stores a public submission.
    ///
    /// # Errors
    ///
    /// - `IntakeError::Validation` with every failing check
    /// - `IntakeError::SignatureDecode` if the signature is not a PNG data URI
    /// - a storage error if the image or record cannot be written
    pub fn submit(
        &self,
        payload: &SubmissionPayload,
        meta: &RequestMeta,
    ) -> IntakeResult<SubmissionReceipt> {
        let schema = self.schema.load()?;
        let screening = validate_and_map(
            payload,
            &schema.core_fields(true),
            &schema.custom_fields(true),
        )?;

        let mapped = match screening {
            Screening::Spam => {
                tracing::debug!("honeypot submission discarded");
                return Ok(SubmissionReceipt::Discarded);
            }
            Screening::Accepted(mapped) => mapped,
        };

        let now = self.clock.now();
        let signature = self.signatures.store_png(
            &mapped.signature,
            &format!("signature-{}.png", now.timestamp()),
        )?;

        let id = self.records.create(RecordDraft {
            created_at: now,
            ip_address: meta.stored_ip_address(),
            user_agent: meta.stored_user_agent(),
            columns: CoreColumns::from_values(&mapped.core_values),
            signature_url: Some(signature.url),
            signed_at: Some(now),
            custom_answers: mapped.custom_answers,
            honeypot: None,
        })?;
        Ok(SubmissionReceipt::Recorded(id))
    }

    /// Applies a staff edit. Custom answers are replaced wholesale.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::NotFound` if no record has this id, or
    /// `IntakeError::Validation` if a value check fails. Nothing is written in either case.
    pub fn edit_record(&self, id: RecordId, payload: &SubmissionPayload) -> IntakeResult<()> {
        self.get_record(id)?;
        let schema = self.schema.load()?;
        let mapping = map_edit(payload, &schema.core_fields(false), &schema.custom_fields(true))?;
        self.records
            .update(id, &mapping.core_values, mapping.custom_answers)
    }

    /// Stores a provider signature image and attaches it to the record, replacing any
    /// earlier provider signature.
    ///
    /// # Errors
    ///
    /// - `IntakeError::Validation` if `data_uri` is blank
    /// - `IntakeError::NotFound` if no record has this id
    /// - `IntakeError::SignatureDecode` if the image is not a PNG data URI
    pub fn sign_as_provider(
        &self,
        id: RecordId,
        provider_name: Option<&str>,
        data_uri: &str,
    ) -> IntakeResult<()> {
        if data_uri.trim().is_empty() {
            return Err(IntakeError::Validation(ValidationErrors::from(vec![
                PROVIDER_SIGNATURE_REQUIRED_MESSAGE.to_owned(),
            ])));
        }
        self.get_record(id)?;

        let image = SignatureImage::from_data_uri(data_uri)?;
        let now = self.clock.now();
        let stored = self
            .signatures
            .store_png(&image, &format!("provider-signature-{id}-{}.png", now.timestamp()))?;

        self.records.sign_as_provider(
            id,
            ProviderSignature {
                provider_name: provider_name
                    .and_then(NonEmptyText::sanitized)
                    .map(NonEmptyText::into_string),
                signature_url: stored.url,
                signed_at: now,
            },
        )
    }

    /// Persists a builder post as the new schema.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::Validation` for malformed rows; the stored schema is not
    /// touched in that case.
    pub fn save_builder(&self, payload: &BuilderPayload) -> IntakeResult<Schema> {
        let previous = self.schema.load()?;
        let schema = apply_builder(payload, &previous)?;
        self.schema.save(&schema)?;
        tracing::info!(
            sections = schema.sections.len(),
            core = schema.core.len(),
            custom = schema.custom.len(),
            "builder schema saved"
        );
        Ok(schema)
    }

    /// # Errors
    ///
    /// Returns `IntakeError::NotFound` if no record has this id.
    pub fn get_record(&self, id: RecordId) -> IntakeResult<IntakeRecord> {
        self.records
            .get_by_id(id)?
            .ok_or_else(|| IntakeError::NotFound(format!("intake record {id}")))
    }

    /// Newest records first; `None` lists up to the default limit.
    pub fn list_records(&self, limit: Option<usize>) -> IntakeResult<Vec<RecordSummary>> {
        self.records
            .list_recent(limit.unwrap_or(DEFAULT_RECORD_LIST_LIMIT))
    }
}
