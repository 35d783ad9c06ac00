//! Content-addressed file storage implementation
//!
//! [`SignatureFiles`] writes binary buffers under a storage root using their SHA-256
//! digest as the identifier:
//!
//! - **Deduplication**: identical content is stored once
//! - **Integrity**: content can be verified against its hash
//! - **Immutability**: a stored file is never rewritten while it still matches its hash
//! - **Deterministic paths**: the same bytes always map to the same relative path
//!
//! Hash strings supplied by callers are validated before they are turned into paths, so a
//! lookup can never escape the `files/` folder.

use crate::{FilesError, FILES_FOLDER_NAME, HASH_ALGORITHM};
use chrono::{DateTime, Utc};
use intake_types::NonEmptyText;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Hex-encoded SHA-256 digest (64 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Hashes `bytes`.
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Validates a hash string received from outside the crate.
    pub fn parse(input: &str) -> Result<Self, FilesError> {
        let ok = input.len() == 64 && input.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !ok {
            return Err(FilesError::InvalidHash(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Sha256Hash {
    type Error = FilesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Sha256Hash> for String {
    fn from(value: Sha256Hash) -> Self {
        value.0
    }
}

/// Metadata for a stored file
///
/// Carries no patient identifiers: only what is needed to locate and verify the bytes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    /// Hashing algorithm used (always "sha256")
    pub hash_algorithm: NonEmptyText,

    /// Hexadecimal digest of the file content
    pub hash: Sha256Hash,

    /// Path relative to the storage root where the file lives
    pub relative_path: NonEmptyText,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Detected media type (MIME type), best-effort
    pub media_type: Option<NonEmptyText>,

    /// Filename suggested by the caller
    pub original_filename: NonEmptyText,

    /// UTC timestamp when the file was stored
    pub stored_at: DateTime<Utc>,
}

/// Content-addressed store rooted at a single directory.
#[derive(Debug)]
pub struct SignatureFiles {
    root_directory: PathBuf,
}

impl SignatureFiles {
    /// Creates a store rooted at `root_directory`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if the directory does not exist, is not a
    /// directory, or cannot be canonicalised.
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Not an existing directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Stores `bytes` and returns the metadata describing where they live.
    ///
    /// When identical content is already stored the existing file is kept untouched and its
    /// metadata is returned, so callers can treat this as idempotent.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the buffer is empty, or the storage directory or file cannot
    /// be written.
    pub fn add_bytes(
        &self,
        bytes: &[u8],
        original_filename: &str,
    ) -> Result<FileMetadata, FilesError> {
        if bytes.is_empty() {
            return Err(FilesError::EmptyContent);
        }

        let hash = Sha256Hash::digest(bytes);
        let relative_path = Self::compute_relative_path(&hash)?;
        let storage_path = self.root_directory.join(relative_path.as_str());

        let parent = storage_path.parent().ok_or_else(|| {
            FilesError::InvalidRootDirectory(format!(
                "No parent directory for {}",
                storage_path.display()
            ))
        })?;
        fs::create_dir_all(parent).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create storage directory {}: {}",
                    parent.display(),
                    e
                ),
            ))
        })?;

        Self::write_content(parent, &storage_path, &hash, bytes)?;

        let original_filename = NonEmptyText::new(original_filename)
            .or_else(|_| NonEmptyText::new(hash.as_str()))
            .map_err(|_| FilesError::InvalidHash(hash.to_string()))?;

        let media_type = infer::get(bytes).and_then(|kind| NonEmptyText::new(kind.mime_type()).ok());

        Ok(FileMetadata {
            hash_algorithm: NonEmptyText::new(HASH_ALGORITHM)
                .map_err(|_| FilesError::InvalidHash(hash.to_string()))?,
            hash,
            relative_path,
            size_bytes: bytes.len() as u64,
            media_type,
            original_filename,
            stored_at: Utc::now(),
        })
    }

    /// Writes `bytes` to a temporary file beside `storage_path` and moves it into place.
    ///
    /// A file already at `storage_path` is kept when its content still matches `hash`, and
    /// replaced otherwise, so a torn earlier write is never handed out as stored content.
    fn write_content(
        parent: &Path,
        storage_path: &Path,
        hash: &Sha256Hash,
        bytes: &[u8],
    ) -> Result<(), FilesError> {
        let write_error = |e: std::io::Error| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write file to {}: {}", storage_path.display(), e),
            ))
        };

        let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
        temp.write_all(bytes).map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;

        let temp = match temp.persist_noclobber(storage_path) {
            Ok(_) => return Ok(()),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => e.file,
            Err(e) => return Err(write_error(e.error)),
        };

        match fs::read(storage_path) {
            // Same digest, same content: nothing to write.
            Ok(existing) if Sha256Hash::digest(&existing) == *hash => Ok(()),
            Ok(_) | Err(_) => {
                temp.persist(storage_path).map_err(|e| write_error(e.error))?;
                Ok(())
            }
        }
    }

    /// Reads back the bytes stored under `hash`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidHash`] for malformed hashes, [`FilesError::NotFound`] when
    /// nothing is stored under it, or an I/O error.
    pub fn read(&self, hash: &str) -> Result<Vec<u8>, FilesError> {
        let hash = Sha256Hash::parse(hash)?;
        let storage_path = self
            .root_directory
            .join(Self::compute_relative_path(&hash)?.as_str());

        match fs::read(&storage_path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FilesError::NotFound(hash.to_string())),
            Err(e) => Err(FilesError::Io(e)),
        }
    }

    /// Relative path for a digest: `files/sha256/<h[0..2]>/<h[2..4]>/<hash>`.
    fn compute_relative_path(hash: &Sha256Hash) -> Result<NonEmptyText, FilesError> {
        let hex = hash.as_str();
        NonEmptyText::new(format!(
            "{}/{}/{}/{}/{}",
            FILES_FOLDER_NAME,
            HASH_ALGORITHM,
            &hex[0..2],
            &hex[2..4],
            hex
        ))
        .map_err(|_| FilesError::InvalidHash(hex.to_owned()))
    }

    /// Canonicalised storage root.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Directory holding every stored binary. May not exist until the first write.
    #[must_use]
    pub fn files_directory(&self) -> PathBuf {
        self.root_directory.join(FILES_FOLDER_NAME)
    }
}
