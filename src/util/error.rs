//! Error types for the Field3D library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Field3D operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Path does not resolve to a readable archive
    #[error("Archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    /// Archive exists but is not a valid Field3D file
    #[error("Corrupt archive: {0}")]
    ArchiveCorrupt(String),

    /// Create was asked to fail on an existing file
    #[error("File already exists: {0}")]
    FileAlreadyExists(PathBuf),

    /// Operation requires an open file
    #[error("File is not open")]
    FileNotOpen,

    /// Write called without a field
    #[error("Called write with no field")]
    NullField,

    /// A layer of the same name and kind is already in the partition
    #[error("Layer '{layer}' already exists in partition '{partition}'")]
    DuplicateLayerName { partition: String, layer: String },

    /// The payload of a single layer could not be materialized
    #[error("Failed to decode layer '{layer}': {reason}")]
    LayerDecodeFailure { layer: String, reason: String },

    /// Partition, layer or group name cannot be stored
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Invalid magic bytes at start of file
    #[error("Invalid Field3D file: expected Ogawa magic bytes")]
    InvalidMagic,

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Type mismatch when reading data
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Child index out of bounds
    #[error("Child index {index} out of bounds (count: {count})")]
    ChildOutOfBounds { index: usize, count: usize },

    /// Archive is frozen (finalized)
    #[error("Archive is frozen and cannot be modified")]
    Frozen,

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into(), reason: reason.into() }
    }

    /// Create a per-layer decode failure.
    pub fn decode(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LayerDecodeFailure { layer: layer.into(), reason: reason.into() }
    }

    /// Fold everything except a missing file into [`Error::ArchiveCorrupt`].
    pub fn into_corrupt(self) -> Self {
        match self {
            Self::ArchiveNotFound(_) | Self::ArchiveCorrupt(_) => self,
            other => Self::ArchiveCorrupt(other.to_string()),
        }
    }
}

/// Result type alias for Field3D operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = Error::DuplicateLayerName {
            partition: "smoke".into(),
            layer: "density".into(),
        };
        assert!(e.to_string().contains("smoke"));
        assert!(e.to_string().contains("density"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_into_corrupt() {
        assert!(matches!(Error::InvalidMagic.into_corrupt(), Error::ArchiveCorrupt(_)));
        assert!(matches!(Error::UnexpectedEof(3).into_corrupt(), Error::ArchiveCorrupt(_)));
        let io = Error::Io(std::io::Error::other("denied"));
        assert!(matches!(io.into_corrupt(), Error::ArchiveCorrupt(_)));
        assert!(matches!(Error::MmapFailed("x".into()).into_corrupt(), Error::ArchiveCorrupt(_)));
        let missing = Error::ArchiveNotFound("a.f3d".into());
        assert!(matches!(missing.into_corrupt(), Error::ArchiveNotFound(_)));
    }
}
