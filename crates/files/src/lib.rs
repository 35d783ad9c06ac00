//! Intake File Storage
//!
//! Binary storage for the images captured by the intake form's signature pads.
//!
//! ## Design Principles
//!
//! - Records hold a reference (URL + hash) to a signature image, never the bytes
//! - Stored binaries are immutable; new content creates a new file
//! - Files are content-addressed, so identical uploads share one stored copy
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//! └── files/
//!     └── sha256/
//!         └── ab/
//!             └── 3f/
//!                 └── ab3f9e…
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use intake_files::SignatureFiles;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let files = SignatureFiles::new(Path::new("intake_data"))?;
//! let meta = files.add_bytes(b"\x89PNG\r\n\x1a\n...", "patient-signature.png")?;
//! println!("stored at {}", meta.relative_path);
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;

pub use constants::{FILES_FOLDER_NAME, HASH_ALGORITHM};
pub use files::{FileMetadata, Sha256Hash, SignatureFiles};

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// A hash string was not 64 lowercase hex characters
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// Nothing is stored under the requested hash
    #[error("File not found for hash: {0}")]
    NotFound(String),

    /// Refused to store an empty buffer
    #[error("Refusing to store an empty file")]
    EmptyContent,

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
