/// Folder (relative to the storage root) that holds all stored binaries.
pub const FILES_FOLDER_NAME: &str = "files";

/// Hash algorithm recorded in [`crate::FileMetadata`] and used as a path segment.
pub const HASH_ALGORITHM: &str = "sha256";
