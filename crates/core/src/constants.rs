//! Constants used throughout the intake core crate.

/// Default directory for persisted state when none is configured.
pub const DEFAULT_DATA_DIR: &str = "intake_data";

/// Directory (under the data dir) holding option documents.
pub const OPTIONS_DIR_NAME: &str = "options";

/// Directory (under the data dir) holding one YAML file per intake record.
pub const RECORDS_DIR_NAME: &str = "records";

/// Option document holding sections, core and custom definitions together.
pub const SCHEMA_OPTION_FILENAME: &str = "schema.json";

/// Option document holding the rolling bundle history.
pub const BACKUPS_OPTION_FILENAME: &str = "backups.json";

/// Extension of record files.
pub const RECORD_FILE_EXTENSION: &str = "yaml";

/// Maximum number of bundles kept in the backup history.
pub const MAX_BACKUPS: usize = 10;

/// Records listed by default in the admin submissions list.
pub const DEFAULT_RECORD_LIST_LIMIT: usize = 500;

/// Stored user agents are cut to this many characters.
pub const USER_AGENT_MAX_LEN: usize = 255;

/// Core fields that must be present, enabled and required for any submission to be accepted,
/// whatever the stored schema says.
pub const LOCKED_CORE_KEYS: [&str; 7] = [
    "full_name",
    "dob",
    "consent_treatment",
    "consent_financial",
    "consent_privacy",
    "signature_name",
    "signature_draw",
];

/// Payload key of the nested custom-answer mapping.
pub const CUSTOM_ANSWERS_FIELD: &str = "df";

/// Only PNG data URIs are accepted from the signature pads.
pub const SIGNATURE_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Magic bytes every PNG starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Section whose body also renders the grouped custom fields.
pub const CUSTOM_SECTION_ID: &str = "custom";

/// Group label used for custom fields saved without one.
pub const DEFAULT_CUSTOM_GROUP: &str = "Additional Questions";

/// Section assigned to core fields posted from the builder without one.
pub const DEFAULT_BUILDER_SECTION: &str = "patient";

/// Group label given to builder custom rows posted without one.
pub const BUILDER_CUSTOM_GROUP: &str = "Your Group";

pub const DEFAULT_CUSTOM_KEY: &str = "custom_field";

pub const DEFAULT_CUSTOM_LABEL: &str = "Your question";

/// Name recorded in exported bundle metadata.
pub const BUNDLE_PLUGIN_NAME: &str = "intake-form";

/// Version written into exported bundles.
pub const BUNDLE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const SIGNATURE_REQUIRED_MESSAGE: &str = "Signature pad is required.";

pub const PROVIDER_SIGNATURE_REQUIRED_MESSAGE: &str = "Provider signature is required.";

pub const LOCKED_FIELD_DISABLED_MESSAGE: &str =
    "A mandatory consent or identity field was disabled. Please contact the clinic.";

/// Fixed vocabulary for `medical_flags` answers: stored key and display label.
pub const MEDICAL_FLAGS: [(&str, &str); 15] = [
    ("congestive_heart_failure", "Congestive heart failure"),
    ("kidney_disease_dialysis", "Kidney disease or on dialysis"),
    ("hypertension_uncontrolled", "Uncontrolled hypertension (>160/100)"),
    ("diabetes", "Diabetes"),
    ("asthma_copd", "Asthma / COPD"),
    ("seizure_disorder", "Seizure disorder"),
    ("thyroid_disorder", "Thyroid disorder"),
    ("liver_disease", "Liver disease / hepatitis"),
    ("clotting_disorder", "Blood clotting disorder"),
    ("cancer_active", "Cancer (active)"),
    ("anemia", "Anemia"),
    ("g6pd_deficiency", "G6PD deficiency"),
    ("pregnant_breastfeeding", "Currently pregnant or breastfeeding"),
    ("venous_device", "Port / PICC / central line"),
    ("none", "None of the above"),
];
