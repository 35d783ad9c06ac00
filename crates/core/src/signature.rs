//! Signature images captured by the patient and provider signature pads.
//!
//! Pads post a `data:image/png;base64,...` URI. It is decoded into a [`SignatureImage`],
//! handed to a [`SignatureStore`] and only the resulting [`SignatureRef`] is kept on the
//! record.

use crate::config::CoreConfig;
use crate::constants::{PNG_SIGNATURE, SIGNATURE_DATA_URI_PREFIX};
use crate::{IntakeError, IntakeResult};
use base64::{engine::general_purpose, Engine as _};
use intake_files::SignatureFiles;
use std::fs;

/// Decoded PNG bytes from a signature pad.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureImage {
    bytes: Vec<u8>,
}

impl SignatureImage {
    /// Decodes a PNG data URI.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::SignatureDecode`] if the URI does not carry the PNG data
    /// prefix, the base64 body does not decode, or the decoded bytes are not a PNG.
    pub fn from_data_uri(data_uri: &str) -> IntakeResult<Self> {
        let encoded = data_uri
            .trim()
            .strip_prefix(SIGNATURE_DATA_URI_PREFIX)
            .ok_or_else(|| {
                IntakeError::SignatureDecode("expected a data:image/png;base64 URI".into())
            })?;

        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| IntakeError::SignatureDecode(format!("invalid base64: {e}")))?;

        if bytes.is_empty() {
            return Err(IntakeError::SignatureDecode("image is empty".into()));
        }
        if !bytes.starts_with(&PNG_SIGNATURE) {
            return Err(IntakeError::SignatureDecode("image is not a PNG".into()));
        }

        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Where a stored signature image can be fetched from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureRef {
    pub url: String,
    pub hash: String,
}

/// File/object storage for signature images.
pub trait SignatureStore: Send + Sync {
    /// Persists `image` and returns a stable reference to it.
    ///
    /// # Errors
    ///
    /// Returns a storage-class [`IntakeError`] when the image cannot be written.
    fn store_png(&self, image: &SignatureImage, filename_hint: &str) -> IntakeResult<SignatureRef>;
}

/// [`SignatureStore`] backed by the content-addressed `intake_files` store under the data
/// directory.
#[derive(Debug)]
pub struct FileSignatureStore {
    files: SignatureFiles,
    base_url: String,
}

impl FileSignatureStore {
    /// Opens the store under `cfg.data_dir()`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::StorageDirCreation` if the data directory cannot be created,
    /// or `IntakeError::Files` if it cannot be opened.
    pub fn new(cfg: &CoreConfig) -> IntakeResult<Self> {
        fs::create_dir_all(cfg.data_dir()).map_err(IntakeError::StorageDirCreation)?;
        let files = SignatureFiles::new(cfg.data_dir())?;
        Ok(Self {
            files,
            base_url: cfg.signature_base_url().to_owned(),
        })
    }
}

impl SignatureStore for FileSignatureStore {
    fn store_png(&self, image: &SignatureImage, filename_hint: &str) -> IntakeResult<SignatureRef> {
        let meta = self.files.add_bytes(image.bytes(), filename_hint)?;
        Ok(SignatureRef {
            url: format!("{}/{}", self.base_url, meta.relative_path),
            hash: meta.hash.to_string(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{png_data_uri, TINY_PNG};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn decodes_png_data_uri() {
        let image = SignatureImage::from_data_uri(&png_data_uri()).unwrap();
        assert_eq!(image.bytes(), TINY_PNG);
    }

    #[test]
    fn rejects_malformed_uris() {
        for bad in [
            "",
            "data:image/jpeg;base64,AAAA",
            "data:image/png;base64,***",
            "data:image/png;base64,",
            "data:image/png;base64,aGVsbG8=",
        ] {
            let err = SignatureImage::from_data_uri(bad).unwrap_err();
            assert!(matches!(err, IntakeError::SignatureDecode(_)), "{bad}");
        }
    }

    #[test]
    fn file_store_builds_public_url() {
        let temp = TempDir::new().unwrap();
        let cfg = CoreConfig::new(
            temp.path().join("data"),
            "https://clinic.example/intake-files/".into(),
        )
        .unwrap();
        let store = FileSignatureStore::new(&cfg).unwrap();

        let image = SignatureImage::from_data_uri(&png_data_uri()).unwrap();
        let stored = store.store_png(&image, "intake-signature.png").unwrap();

        assert!(stored
            .url
            .starts_with("https://clinic.example/intake-files/files/sha256/"));
        assert!(stored.url.ends_with(&stored.hash));

        let again = store.store_png(&image, "other.png").unwrap();
        assert_eq!(again, stored);
    }
}
