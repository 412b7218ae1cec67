//! State shared by every handler kind
//!
//! `HandlerCore` holds the transfer ID, the stream binding, the transfer
//! phase, and the intrusive registry link. All mutation goes through `Cell`,
//! which keeps handlers usable through shared references while linked into a
//! registry and makes them `!Sync`.

use std::cell::Cell;
use std::fmt;

use crate::error::{Status, TransferError};
use crate::registry::RegistryId;
use crate::stream::{Reader, ReaderWriter, Writer};

use super::{Handler, TransferId, TransferPhase};

/// The stream a handler is bound to
///
/// Exactly one of reader, writer, or a single read-write object. A handler
/// never holds an unrelated reader and writer at the same time.
#[derive(Clone, Copy, Default)]
pub enum StreamBinding<'s> {
    /// No stream bound yet
    #[default]
    Unbound,
    /// Read-only stream
    Reader(&'s dyn Reader),
    /// Write-only stream
    Writer(&'s dyn Writer),
    /// One object viewed through both facets
    ReaderWriter(&'s dyn ReaderWriter),
}

impl<'s> StreamBinding<'s> {
    /// Read facet of the binding, if it has one
    pub fn reader(self) -> Option<&'s dyn Reader> {
        match self {
            Self::Reader(reader) => Some(reader),
            Self::ReaderWriter(reader_writer) => Some(reader_writer.as_reader()),
            Self::Unbound | Self::Writer(_) => None,
        }
    }

    /// Write facet of the binding, if it has one
    pub fn writer(self) -> Option<&'s dyn Writer> {
        match self {
            Self::Writer(writer) => Some(writer),
            Self::ReaderWriter(reader_writer) => Some(reader_writer.as_writer()),
            Self::Unbound | Self::Reader(_) => None,
        }
    }

    /// Whether any stream is bound
    pub fn is_bound(self) -> bool {
        !matches!(self, Self::Unbound)
    }
}

impl fmt::Debug for StreamBinding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unbound => "Unbound",
            Self::Reader(_) => "Reader",
            Self::Writer(_) => "Writer",
            Self::ReaderWriter(_) => "ReaderWriter",
        })
    }
}

/// Intrusive list membership, owned by the handler it is embedded in
pub(crate) struct Link<'s> {
    pub(crate) prev: Cell<Option<&'s dyn Handler<'s>>>,
    pub(crate) next: Cell<Option<&'s dyn Handler<'s>>>,
    pub(crate) owner: Cell<Option<RegistryId>>,
}

impl Link<'_> {
    const fn new() -> Self {
        Self {
            prev: Cell::new(None),
            next: Cell::new(None),
            owner: Cell::new(None),
        }
    }
}

/// ID, binding, phase and list link of a handler
pub struct HandlerCore<'s> {
    id: TransferId,
    binding: Cell<StreamBinding<'s>>,
    phase: Cell<TransferPhase>,
    pub(crate) link: Link<'s>,
}

impl<'s> HandlerCore<'s> {
    pub(crate) const fn new(id: TransferId, binding: StreamBinding<'s>) -> Self {
        Self {
            id,
            binding: Cell::new(binding),
            phase: Cell::new(TransferPhase::Idle),
            link: Link::new(),
        }
    }

    /// Transfer ID, fixed at construction
    pub fn id(&self) -> TransferId {
        self.id
    }

    /// Current transfer phase
    pub fn phase(&self) -> TransferPhase {
        self.phase.get()
    }

    /// Current stream binding
    pub fn binding(&self) -> StreamBinding<'s> {
        self.binding.get()
    }

    /// Whether the handler is linked into a registry
    pub fn is_linked(&self) -> bool {
        self.link.owner.get().is_some()
    }

    /// Replace the stream binding
    ///
    /// Panics if a transfer is active: the engine may be holding the old stream.
    pub(crate) fn bind(&self, binding: StreamBinding<'s>) {
        let phase = self.phase.get();
        assert!(
            phase == TransferPhase::Idle,
            "handler {}: stream rebound during an active {phase} transfer",
            self.id
        );
        self.binding.set(binding);
    }

    /// Enter `phase` if the handler is bound for it and `hook` succeeds
    pub(crate) fn prepare(&self, phase: TransferPhase, hook: impl FnOnce() -> Status) -> Status {
        let current = self.phase.get();
        assert!(
            current == TransferPhase::Idle,
            "handler {}: prepare_{phase} while a {current} transfer is active",
            self.id
        );

        let binding = self.binding.get();
        let bound = match phase {
            TransferPhase::Reading => binding.reader().is_some(),
            TransferPhase::Writing => binding.writer().is_some(),
            TransferPhase::Idle => false,
        };
        if !bound {
            tracing::debug!(id = %self.id, direction = %phase, "prepare rejected: no stream bound");
            return Err(TransferError::Unbound(self.id));
        }

        if let Err(e) = hook() {
            tracing::debug!(id = %self.id, direction = %phase, error = %e, "prepare failed");
            return Err(e);
        }

        self.phase.set(phase);
        tracing::debug!(id = %self.id, direction = %phase, "prepared");
        Ok(())
    }

    /// Leave `phase`, then run `hook`
    ///
    /// Panics unless `phase` is the active phase, which covers finalizing
    /// without a successful prepare and finalizing twice.
    pub(crate) fn finalize<T>(&self, phase: TransferPhase, hook: impl FnOnce() -> T) -> T {
        let current = self.phase.get();
        assert!(
            current == phase,
            "handler {}: finalize_{phase} without a successful prepare_{phase} (phase: {current})",
            self.id
        );
        self.phase.set(TransferPhase::Idle);
        tracing::debug!(id = %self.id, direction = %phase, "finalized");
        hook()
    }

    /// Finalize for a direction this handler kind never prepares
    pub(crate) fn finalize_unsupported(&self, phase: TransferPhase) -> ! {
        panic!(
            "handler {}: finalize_{phase} on a handler that does not support {phase} transfers",
            self.id
        )
    }

    pub(crate) fn reader(&self) -> &'s dyn Reader {
        assert!(
            self.phase.get() == TransferPhase::Reading,
            "handler {}: reader accessed outside a prepared read transfer",
            self.id
        );
        match self.binding.get().reader() {
            Some(reader) => reader,
            None => panic!("handler {}: no reader bound", self.id),
        }
    }

    pub(crate) fn writer(&self) -> &'s dyn Writer {
        assert!(
            self.phase.get() == TransferPhase::Writing,
            "handler {}: writer accessed outside a prepared write transfer",
            self.id
        );
        match self.binding.get().writer() {
            Some(writer) => writer,
            None => panic!("handler {}: no writer bound", self.id),
        }
    }
}

impl fmt::Debug for HandlerCore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCore")
            .field("id", &self.id)
            .field("binding", &self.binding.get())
            .field("phase", &self.phase.get())
            .field("linked", &self.is_linked())
            .finish()
    }
}
