//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the core services as
//! an `Arc<CoreConfig>`. Request handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_DATA_DIR, OPTIONS_DIR_NAME, RECORDS_DIR_NAME};
use crate::validation::validate_base_url;
use crate::{IntakeError, IntakeResult};
use std::path::{Path, PathBuf};

/// Default public prefix for stored signature images.
pub const DEFAULT_SIGNATURE_BASE_URL: &str = "http://localhost/intake-files";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    signature_base_url: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidInput` if `data_dir` is empty or the base URL is not an
    /// absolute `http(s)` URL.
    pub fn new(data_dir: PathBuf, signature_base_url: String) -> IntakeResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(IntakeError::InvalidInput("data_dir cannot be empty".into()));
        }
        validate_base_url(&signature_base_url)?;

        Ok(Self {
            data_dir,
            signature_base_url: signature_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn options_dir(&self) -> PathBuf {
        self.data_dir.join(OPTIONS_DIR_NAME)
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join(RECORDS_DIR_NAME)
    }

    /// Base URL without a trailing slash.
    pub fn signature_base_url(&self) -> &str {
        &self.signature_base_url
    }
}

/// Resolve the data directory from an optional environment value.
///
/// `None` or blank values fall back to [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Resolve the signature base URL from an optional environment value.
///
/// `None` or blank values fall back to [`DEFAULT_SIGNATURE_BASE_URL`]; anything else is
/// validated when the `CoreConfig` is built.
pub fn signature_base_url_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_SIGNATURE_BASE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_strips_trailing_slash() {
        let cfg = CoreConfig::new("data".into(), "https://clinic.example/files/".into()).unwrap();
        assert_eq!(cfg.signature_base_url(), "https://clinic.example/files");
        assert_eq!(cfg.records_dir(), PathBuf::from("data").join("records"));
        assert_eq!(cfg.options_dir(), PathBuf::from("data").join("options"));
    }

    #[test]
    fn new_rejects_empty_data_dir() {
        let err = CoreConfig::new(PathBuf::new(), DEFAULT_SIGNATURE_BASE_URL.into()).unwrap_err();
        assert!(matches!(err, IntakeError::InvalidInput(_)));
    }

    #[test]
    fn new_rejects_non_http_base_url() {
        assert!(CoreConfig::new("data".into(), "ftp://clinic.example".into()).is_err());
        assert!(CoreConfig::new("data".into(), "".into()).is_err());
    }

    #[test]
    fn env_values_fall_back_to_defaults() {
        assert_eq!(
            data_dir_from_env_value(Some("   ".into())),
            PathBuf::from(DEFAULT_DATA_DIR)
        );
        assert_eq!(
            data_dir_from_env_value(Some("/srv/intake".into())),
            PathBuf::from("/srv/intake")
        );
        assert_eq!(
            signature_base_url_from_env_value(None),
            DEFAULT_SIGNATURE_BASE_URL
        );
    }
}
