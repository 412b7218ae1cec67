//! File-backed streams
//!
//! A [`FileStream`] is opened lazily by a handler's prepare hook and closed by
//! its finalize hook, so a registry can hold many of them without keeping
//! file descriptors open between transfers.
//!
//! Writes are hashed as they arrive. When an expected SHA-256 is configured,
//! `finalize_write` rejects a mismatching upload with
//! [`TransferError::DataLoss`] and removes the partial file.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Status, TransferError};
use crate::handler::{ReadHooks, ReadOnlyHandler, ReadWriteHandler, WriteHooks, WriteOnlyHandler};
use crate::stream::{Reader, Writer};

/// A file that acts as both a transfer stream and its handler's hooks
pub struct FileStream {
    path: PathBuf,
    file: RefCell<Option<File>>,
    hasher: RefCell<Sha256>,
    expected_sha256: Option<String>,
    written_sha256: RefCell<Option<String>>,
}

impl FileStream {
    /// Create a stream for `path`; nothing is opened until a transfer begins
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: RefCell::new(None),
            hasher: RefCell::new(Sha256::new()),
            expected_sha256: None,
            written_sha256: RefCell::new(None),
        }
    }

    /// Require uploads to hash to `sha256` (lowercase hex)
    pub fn with_expected_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256.into());
        self
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Expected SHA-256 of uploads, if configured
    pub fn expected_sha256(&self) -> Option<&str> {
        self.expected_sha256.as_deref()
    }

    /// SHA-256 of the last successfully committed upload
    pub fn written_sha256(&self) -> Option<String> {
        self.written_sha256.borrow().clone()
    }

    /// Whether a transfer currently holds the file open
    pub fn is_open(&self) -> bool {
        self.file.borrow().is_some()
    }

    /// Read-only handler serving this file
    pub fn read_only_handler(&self, transfer_id: u32) -> ReadOnlyHandler<'_, &Self> {
        ReadOnlyHandler::with_reader(transfer_id, self).with_hooks(self)
    }

    /// Write-only handler storing uploads in this file
    pub fn write_only_handler(&self, transfer_id: u32) -> WriteOnlyHandler<'_, &Self> {
        WriteOnlyHandler::with_writer(transfer_id, self).with_hooks(self)
    }

    /// Handler that both serves and stores this file
    pub fn read_write_handler(&self, transfer_id: u32) -> ReadWriteHandler<'_, &Self> {
        ReadWriteHandler::with_reader_writer(transfer_id, self).with_hooks(self)
    }

    fn not_open(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotConnected,
            format!("{} is not open", self.path.display()),
        )
    }

    /// Flush, sync and verify a completed upload
    fn commit(&self, mut file: File, hasher: Sha256) -> Status {
        file.flush()?;
        file.sync_all()?;
        drop(file);

        let actual = hex::encode(hasher.finalize());
        if let Some(expected) = self.expected_sha256.as_deref()
            && expected != actual
        {
            tracing::warn!(
                path = %self.path.display(),
                expected,
                actual = %actual,
                "sha256 mismatch on upload"
            );
            return Err(TransferError::data_loss(format!(
                "sha256 mismatch: expected {expected}, got {actual}"
            )));
        }

        tracing::debug!(path = %self.path.display(), sha256 = %actual, "upload committed");
        *self.written_sha256.borrow_mut() = Some(actual);
        Ok(())
    }

    /// Remove a partial upload
    fn discard(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "partial upload removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial upload");
            }
        }
    }
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .field("expected_sha256", &self.expected_sha256)
            .finish()
    }
}

impl Reader for FileStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.borrow_mut().as_mut() {
            Some(file) => file.read(buf),
            None => Err(self.not_open()),
        }
    }
}

impl Writer for FileStream {
    fn write(&self, data: &[u8]) -> io::Result<usize> {
        let n = match self.file.borrow_mut().as_mut() {
            Some(file) => file.write(data)?,
            None => return Err(self.not_open()),
        };
        self.hasher.borrow_mut().update(&data[..n]);
        Ok(n)
    }

    fn flush(&self) -> io::Result<()> {
        match self.file.borrow_mut().as_mut() {
            Some(file) => file.flush(),
            None => Err(self.not_open()),
        }
    }
}

impl ReadHooks for FileStream {
    fn prepare_read(&self) -> Status {
        let file = File::open(&self.path)?;
        tracing::debug!(path = %self.path.display(), "opened for reading");
        *self.file.borrow_mut() = Some(file);
        Ok(())
    }

    fn finalize_read(&self, _status: &Status) {
        if self.file.take().is_some() {
            tracing::debug!(path = %self.path.display(), "closed");
        }
    }
}

impl WriteHooks for FileStream {
    fn prepare_write(&self) -> Status {
        let file = File::create(&self.path)?;
        tracing::debug!(path = %self.path.display(), "opened for writing");
        *self.file.borrow_mut() = Some(file);
        *self.hasher.borrow_mut() = Sha256::new();
        *self.written_sha256.borrow_mut() = None;
        Ok(())
    }

    fn finalize_write(&self, status: &Status) -> Status {
        let Some(file) = self.file.take() else {
            return Err(self.not_open().into());
        };
        let hasher = self.hasher.replace(Sha256::new());

        if status.is_err() {
            drop(file);
            self.discard();
            return Ok(());
        }

        let result = self.commit(file, hasher);
        if result.is_err() {
            self.discard();
        }
        result
    }
}
