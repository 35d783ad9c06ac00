//! # Intake Core
//!
//! Core business logic for the configurable intake and consent form.
//!
//! This crate contains the schema engine and everything that persists through it:
//! - The schema of sections, locked core fields and administrator-defined custom fields,
//!   its query layer and the form renderer built on it
//! - Submission screening, validation and mapping onto record columns and custom answers
//! - The builder save path, which never lets a post change a core key, type or lock
//! - Config bundles: export, import, a rolling backup history and restore
//! - File-backed storage under a single data directory
//!
//! **No transport concerns**: routing, sessions, nonces and HTML belong to whatever hosts
//! this crate. The `intake` CLI is one such host.

pub mod builder;
pub mod bundle;
pub mod clock;
pub mod config;
pub mod constants;
mod error;
pub mod payload;
pub mod record;
pub mod render;
pub mod repositories;
pub mod schema;
pub mod service;
pub mod signature;
pub mod submission;
pub mod validation;

pub use bundle::{BackupSummary, BundleDocument, BundleManager, ConfigBundle};
pub use config::CoreConfig;
pub use error::{IntakeError, IntakeResult, ValidationErrors};
pub use payload::{BuilderPayload, RequestMeta, SubmissionPayload};
pub use record::{IntakeRecord, RecordId, RecordSummary};
pub use schema::Schema;
pub use service::{IntakeService, SubmissionReceipt};
