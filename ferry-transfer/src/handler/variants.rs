//! The three handler kinds
//!
//! Each kind fixes at the type level which directions can succeed. The
//! rejected direction returns `Unimplemented` without touching any state, so
//! an engine can probe capabilities before committing to a transfer.

use crate::error::{Status, TransferError};
use crate::stream::{Reader, ReaderWriter, Writer};

use super::base::{HandlerCore, StreamBinding};
use super::hooks::{NoHooks, ReadHooks, WriteHooks};
use super::sealed::Sealed;
use super::{Capability, Handler, TransferId, TransferPhase};

// =============================================================================
// ReadOnlyHandler
// =============================================================================

/// Handler that only supports read transfers
pub struct ReadOnlyHandler<'s, H = NoHooks> {
    core: HandlerCore<'s>,
    hooks: H,
}

impl<'s> ReadOnlyHandler<'s> {
    /// Directions this handler kind supports
    pub const CAPABILITY: Capability = Capability::ReadOnly;

    /// Create an unbound handler; bind later with [`set_reader`](Self::set_reader)
    pub const fn new(transfer_id: u32) -> Self {
        Self {
            core: HandlerCore::new(TransferId::new(transfer_id), StreamBinding::Unbound),
            hooks: NoHooks,
        }
    }

    /// Create a handler bound to `reader`
    pub const fn with_reader(transfer_id: u32, reader: &'s dyn Reader) -> Self {
        Self {
            core: HandlerCore::new(TransferId::new(transfer_id), StreamBinding::Reader(reader)),
            hooks: NoHooks,
        }
    }
}

impl<'s, H: ReadHooks> ReadOnlyHandler<'s, H> {
    /// Replace the read hooks
    pub fn with_hooks<R: ReadHooks>(self, hooks: R) -> ReadOnlyHandler<'s, R> {
        ReadOnlyHandler {
            core: self.core,
            hooks,
        }
    }

    /// Bind a reader
    ///
    /// # Panics
    ///
    /// Panics if a read transfer is active.
    pub fn set_reader(&self, reader: &'s dyn Reader) {
        self.core.bind(StreamBinding::Reader(reader));
    }

    /// Installed hooks
    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

impl<H> Sealed for ReadOnlyHandler<'_, H> {}

impl<'s, H: ReadHooks> Handler<'s> for ReadOnlyHandler<'s, H> {
    fn core(&self) -> &HandlerCore<'s> {
        &self.core
    }

    fn capability(&self) -> Capability {
        Capability::ReadOnly
    }

    fn prepare_read(&self) -> Status {
        self.core
            .prepare(TransferPhase::Reading, || self.hooks.prepare_read())
    }

    fn finalize_read(&self, status: Status) {
        self.core
            .finalize(TransferPhase::Reading, || self.hooks.finalize_read(&status));
    }

    // Writes are not supported.
    fn prepare_write(&self) -> Status {
        Err(TransferError::Unimplemented)
    }

    fn finalize_write(&self, _status: Status) -> Status {
        self.core.finalize_unsupported(TransferPhase::Writing)
    }
}

// =============================================================================
// WriteOnlyHandler
// =============================================================================

/// Handler that only supports write transfers
pub struct WriteOnlyHandler<'s, H = NoHooks> {
    core: HandlerCore<'s>,
    hooks: H,
}

impl<'s> WriteOnlyHandler<'s> {
    /// Directions this handler kind supports
    pub const CAPABILITY: Capability = Capability::WriteOnly;

    /// Create an unbound handler; bind later with [`set_writer`](Self::set_writer)
    pub const fn new(transfer_id: u32) -> Self {
        Self {
            core: HandlerCore::new(TransferId::new(transfer_id), StreamBinding::Unbound),
            hooks: NoHooks,
        }
    }

    /// Create a handler bound to `writer`
    pub const fn with_writer(transfer_id: u32, writer: &'s dyn Writer) -> Self {
        Self {
            core: HandlerCore::new(TransferId::new(transfer_id), StreamBinding::Writer(writer)),
            hooks: NoHooks,
        }
    }
}

impl<'s, H: WriteHooks> WriteOnlyHandler<'s, H> {
    /// Replace the write hooks
    pub fn with_hooks<W: WriteHooks>(self, hooks: W) -> WriteOnlyHandler<'s, W> {
        WriteOnlyHandler {
            core: self.core,
            hooks,
        }
    }

    /// Bind a writer
    ///
    /// # Panics
    ///
    /// Panics if a write transfer is active.
    pub fn set_writer(&self, writer: &'s dyn Writer) {
        self.core.bind(StreamBinding::Writer(writer));
    }

    /// Installed hooks
    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

impl<H> Sealed for WriteOnlyHandler<'_, H> {}

impl<'s, H: WriteHooks> Handler<'s> for WriteOnlyHandler<'s, H> {
    fn core(&self) -> &HandlerCore<'s> {
        &self.core
    }

    fn capability(&self) -> Capability {
        Capability::WriteOnly
    }

    // Reads are not supported.
    fn prepare_read(&self) -> Status {
        Err(TransferError::Unimplemented)
    }

    fn finalize_read(&self, _status: Status) {
        self.core.finalize_unsupported(TransferPhase::Reading)
    }

    fn prepare_write(&self) -> Status {
        self.core
            .prepare(TransferPhase::Writing, || self.hooks.prepare_write())
    }

    fn finalize_write(&self, status: Status) -> Status {
        self.core
            .finalize(TransferPhase::Writing, || self.hooks.finalize_write(&status))
    }
}

// =============================================================================
// ReadWriteHandler
// =============================================================================

/// Handler that supports both directions over a single read-write stream
pub struct ReadWriteHandler<'s, H = NoHooks> {
    core: HandlerCore<'s>,
    hooks: H,
}

impl<'s> ReadWriteHandler<'s> {
    /// Directions this handler kind supports
    pub const CAPABILITY: Capability = Capability::ReadWrite;

    /// Create an unbound handler
    pub const fn new(transfer_id: u32) -> Self {
        Self {
            core: HandlerCore::new(TransferId::new(transfer_id), StreamBinding::Unbound),
            hooks: NoHooks,
        }
    }

    /// Create a handler bound to one object used for both reads and writes
    pub const fn with_reader_writer(transfer_id: u32, reader_writer: &'s dyn ReaderWriter) -> Self {
        Self {
            core: HandlerCore::new(
                TransferId::new(transfer_id),
                StreamBinding::ReaderWriter(reader_writer),
            ),
            hooks: NoHooks,
        }
    }
}

impl<'s, H: ReadHooks + WriteHooks> ReadWriteHandler<'s, H> {
    /// Replace the hooks
    pub fn with_hooks<B: ReadHooks + WriteHooks>(self, hooks: B) -> ReadWriteHandler<'s, B> {
        ReadWriteHandler {
            core: self.core,
            hooks,
        }
    }

    /// Bind a read-write stream
    ///
    /// # Panics
    ///
    /// Panics if a transfer is active.
    pub fn set_reader_writer(&self, reader_writer: &'s dyn ReaderWriter) {
        self.core.bind(StreamBinding::ReaderWriter(reader_writer));
    }

    /// Installed hooks
    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

impl<H> Sealed for ReadWriteHandler<'_, H> {}

impl<'s, H: ReadHooks + WriteHooks> Handler<'s> for ReadWriteHandler<'s, H> {
    fn core(&self) -> &HandlerCore<'s> {
        &self.core
    }

    fn capability(&self) -> Capability {
        Capability::ReadWrite
    }

    fn prepare_read(&self) -> Status {
        self.core
            .prepare(TransferPhase::Reading, || self.hooks.prepare_read())
    }

    fn finalize_read(&self, status: Status) {
        self.core
            .finalize(TransferPhase::Reading, || self.hooks.finalize_read(&status));
    }

    fn prepare_write(&self) -> Status {
        self.core
            .prepare(TransferPhase::Writing, || self.hooks.prepare_write())
    }

    fn finalize_write(&self, status: Status) -> Status {
        self.core
            .finalize(TransferPhase::Writing, || self.hooks.finalize_write(&status))
    }
}
