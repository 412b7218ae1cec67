//! Transfer sessions: the engine side of the prepare/finalize bracket
//!
//! A session calls `prepare_*` when it begins and guarantees exactly one
//! `finalize_*` call: either explicitly through `finish`, or with
//! [`TransferError::Aborted`] when the session is dropped unfinished (early
//! return, `?`, panic unwinding).
//!
//! [`read_transfer`] and [`write_transfer`] drive a whole transfer between a
//! handler and any `io::Write` / `io::Read`.

use std::io;

use crate::COPY_BUFFER_SIZE;
use crate::error::{Status, TransferError};
use crate::handler::{Handler, TransferId};
use crate::stream::{Reader, Writer};

/// An active read transfer
pub struct ReadSession<'h, 's> {
    handler: &'h dyn Handler<'s>,
    finished: bool,
}

impl<'h, 's> ReadSession<'h, 's> {
    /// Prepare `handler` for a read and start the session
    ///
    /// # Errors
    ///
    /// Whatever `prepare_read` returns; no finalize call is made in that case.
    pub fn begin(handler: &'h dyn Handler<'s>) -> Result<Self, TransferError> {
        handler.prepare_read()?;
        tracing::debug!(id = %handler.id(), "read session started");
        Ok(Self {
            handler,
            finished: false,
        })
    }

    /// Transfer ID of the session
    pub fn id(&self) -> TransferId {
        self.handler.id()
    }

    /// Stream to read from
    pub fn reader(&self) -> &'s dyn Reader {
        self.handler.reader()
    }

    /// End the session, reporting how the transfer went
    pub fn finish(mut self, status: Status) {
        self.finished = true;
        tracing::debug!(id = %self.id(), ok = status.is_ok(), "read session finished");
        self.handler.finalize_read(status);
    }
}

impl Drop for ReadSession<'_, '_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(id = %self.handler.id(), "read session dropped unfinished");
            self.handler.finalize_read(Err(TransferError::Aborted));
        }
    }
}

/// An active write transfer
pub struct WriteSession<'h, 's> {
    handler: &'h dyn Handler<'s>,
    finished: bool,
}

impl<'h, 's> WriteSession<'h, 's> {
    /// Prepare `handler` for a write and start the session
    ///
    /// # Errors
    ///
    /// Whatever `prepare_write` returns; no finalize call is made in that case.
    pub fn begin(handler: &'h dyn Handler<'s>) -> Result<Self, TransferError> {
        handler.prepare_write()?;
        tracing::debug!(id = %handler.id(), "write session started");
        Ok(Self {
            handler,
            finished: false,
        })
    }

    /// Transfer ID of the session
    pub fn id(&self) -> TransferId {
        self.handler.id()
    }

    /// Stream to write to
    pub fn writer(&self) -> &'s dyn Writer {
        self.handler.writer()
    }

    /// End the session
    ///
    /// Returns the transfer's own error if it failed, otherwise the result of
    /// `finalize_write`, which may still fail the transfer.
    pub fn finish(mut self, status: Status) -> Status {
        self.finished = true;
        let finalized = self.handler.finalize_write(status.clone());
        if let Err(e) = &finalized {
            tracing::warn!(id = %self.id(), error = %e, "write finalization failed");
        }
        let result = status.and(finalized);
        tracing::debug!(id = %self.id(), ok = result.is_ok(), "write session finished");
        result
    }
}

impl Drop for WriteSession<'_, '_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(id = %self.handler.id(), "write session dropped unfinished");
            let _ = self.handler.finalize_write(Err(TransferError::Aborted));
        }
    }
}

/// Run a complete read transfer from `handler` into `sink`
///
/// Returns the number of bytes copied.
pub fn read_transfer<W>(handler: &dyn Handler<'_>, sink: &mut W) -> Result<u64, TransferError>
where
    W: io::Write + ?Sized,
{
    let session = ReadSession::begin(handler)?;
    let result = copy_out(session.reader(), sink);
    session.finish(result.as_ref().map(|_| ()).map_err(Clone::clone));
    result
}

/// Run a complete write transfer from `source` into `handler`
///
/// Returns the number of bytes copied. A failing `finalize_write` fails the
/// transfer even if every byte was written.
pub fn write_transfer<R>(handler: &dyn Handler<'_>, source: &mut R) -> Result<u64, TransferError>
where
    R: io::Read + ?Sized,
{
    let session = WriteSession::begin(handler)?;
    let result = copy_in(source, session.writer());
    let status = session.finish(result.as_ref().map(|_| ()).map_err(Clone::clone));
    status.and(result)
}

fn copy_out<W>(reader: &dyn Reader, sink: &mut W) -> Result<u64, TransferError>
where
    W: io::Write + ?Sized,
{
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        sink.write_all(&buffer[..n])?;
        total += n as u64;
    }
    sink.flush()?;
    Ok(total)
}

fn copy_in<R>(source: &mut R, writer: &dyn Writer) -> Result<u64, TransferError>
where
    R: io::Read + ?Sized,
{
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}
