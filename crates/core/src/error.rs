use std::fmt;

/// Ordered, human-readable validation messages.
///
/// Every failing check appends here so the caller can redisplay all problems at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Appends `message` unless an identical message is already present.
    pub fn push_unique(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.0.contains(&message) {
            self.0.push(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded, otherwise [`IntakeError::Validation`].
    pub fn into_result(self) -> IntakeResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(IntakeError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl From<Vec<String>> for ValidationErrors {
    fn from(messages: Vec<String>) -> Self {
        Self(messages)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("invalid signature image: {0}")]
    SignatureDecode(String),
    #[error("invalid config bundle: {0}")]
    BundleFormat(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize JSON: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize JSON: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("file storage error: {0}")]
    Files(#[from] intake_files::FilesError),
}

impl IntakeError {
    /// True for failures of a storage collaborator. These are never retried here; the
    /// request fails outright.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::StorageDirCreation(_)
                | Self::FileWrite(_)
                | Self::FileRead(_)
                | Self::Serialization(_)
                | Self::Deserialization(_)
                | Self::YamlSerialization(_)
                | Self::YamlDeserialization(_)
                | Self::Files(_)
        )
    }

    /// Validation messages, when this is a validation failure.
    pub fn validation_messages(&self) -> Option<&[String]> {
        match self {
            Self::Validation(errors) => Some(errors.messages()),
            _ => None,
        }
    }
}

pub type IntakeResult<T> = std::result::Result<T, IntakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_messages_in_order() {
        let mut errors = ValidationErrors::new();
        errors.push("Field \"Full Name\" is required.");
        errors.push("Signature pad is required.");
        assert_eq!(
            errors.to_string(),
            "Field \"Full Name\" is required.; Signature pad is required."
        );
    }

    #[test]
    fn push_unique_skips_duplicates() {
        let mut errors = ValidationErrors::new();
        errors.push_unique("same");
        errors.push_unique("same");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn into_result_only_fails_when_non_empty() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let err = ValidationErrors::from(vec!["x".to_string()])
            .into_result()
            .unwrap_err();
        assert_eq!(err.validation_messages(), Some(&["x".to_string()][..]));
        assert!(!err.is_storage());
    }
}
