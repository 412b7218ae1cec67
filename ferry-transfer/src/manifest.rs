//! Handler manifest
//!
//! A JSON document listing the transfer IDs to serve and the file behind
//! each one:
//!
//! ```json
//! {
//!   "handlers": [
//!     { "id": 1, "path": "firmware.bin", "access": "read_only" },
//!     { "id": 2, "path": "upload.bin", "access": "write_only",
//!       "sha256": "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9" }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the manifest.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::file::FileStream;
use crate::handler::{Capability, TransferId};

/// Length of an entry's `sha256` field: a hex-encoded SHA-256 digest
pub const SHA256_HEX_LENGTH: usize = 64;

/// Why an entry's `sha256` field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Sha256Error {
    /// Not exactly 64 characters
    #[error("expected 64 characters")]
    InvalidLength,
    /// Contains characters outside `0-9a-f`
    #[error("expected lowercase hexadecimal characters")]
    InvalidCharacters,
}

/// Check an expected upload digest before it is compared with the hex
/// output of [`FileStream`]
///
/// The digest must match that output exactly, so uppercase hex is rejected
/// rather than normalized.
pub fn validate_sha256(hash: &str) -> Result<(), Sha256Error> {
    if hash.len() != SHA256_HEX_LENGTH {
        return Err(Sha256Error::InvalidLength);
    }
    if hash
        .chars()
        .any(|ch| !ch.is_ascii_hexdigit() || ch.is_ascii_uppercase())
    {
        return Err(Sha256Error::InvalidCharacters);
    }
    Ok(())
}

/// Errors from loading or validating a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest file could not be read
    #[error("failed to read manifest {}: {source}", .path.display())]
    Read {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The manifest is not valid JSON or has the wrong shape
    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two entries share a transfer ID
    #[error("transfer id {0} is listed more than once")]
    DuplicateId(TransferId),

    /// An entry has an empty path
    #[error("transfer id {0} has an empty path")]
    EmptyPath(TransferId),

    /// An entry's expected digest is malformed
    #[error("transfer id {id} has an invalid sha256: {reason}")]
    InvalidSha256 {
        /// Offending entry
        id: TransferId,
        /// What is wrong with the digest
        reason: Sha256Error,
    },

    /// A digest was given for an entry that never receives writes
    #[error("transfer id {0} is read_only but sets sha256")]
    UnexpectedSha256(TransferId),
}

/// One transfer ID and the file serving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerEntry {
    /// Transfer ID
    pub id: TransferId,
    /// Backing file
    pub path: PathBuf,
    /// Which handler kind to build
    pub access: Capability,
    /// Expected SHA-256 of uploads (lowercase hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl HandlerEntry {
    /// Build the file stream for this entry
    pub fn stream(&self) -> FileStream {
        let stream = FileStream::new(&self.path);
        match &self.sha256 {
            Some(sha256) => stream.with_expected_sha256(sha256.clone()),
            None => stream,
        }
    }
}

/// The set of handlers to serve
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Entries in registration order
    pub handlers: Vec<HandlerEntry>,
}

impl Manifest {
    /// Parse and validate a manifest; paths are kept as written
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read a manifest file, resolving relative paths against its directory
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::from_json(&json)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for entry in &mut manifest.handlers {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }

        tracing::debug!(
            path = %path.display(),
            handlers = manifest.handlers.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    /// Check IDs, paths and digests
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for entry in &self.handlers {
            if !seen.insert(entry.id) {
                return Err(ManifestError::DuplicateId(entry.id));
            }
            if entry.path.as_os_str().is_empty() {
                return Err(ManifestError::EmptyPath(entry.id));
            }
            if let Some(sha256) = &entry.sha256 {
                if !entry.access.can_write() {
                    return Err(ManifestError::UnexpectedSha256(entry.id));
                }
                validate_sha256(sha256).map_err(|reason| ManifestError::InvalidSha256 {
                    id: entry.id,
                    reason,
                })?;
            }
        }
        Ok(())
    }

    /// Entry for `id`, if listed
    pub fn entry(&self, id: TransferId) -> Option<&HandlerEntry> {
        self.handlers.iter().find(|entry| entry.id == id)
    }
}
