//! Transfer handlers
//!
//! A handler connects a transfer ID to the stream that does the actual reads
//! or writes, plus `prepare`/`finalize` callbacks that bracket each transfer.
//!
//! There are exactly three handler kinds, and the set is closed:
//!
//! | Handler              | `prepare_read`  | `prepare_write` |
//! |----------------------|-----------------|-----------------|
//! | [`ReadOnlyHandler`]  | succeeds        | `Unimplemented` |
//! | [`WriteOnlyHandler`] | `Unimplemented` | succeeds        |
//! | [`ReadWriteHandler`] | succeeds        | succeeds        |
//!
//! Resource handling (opening a file, verifying a digest) plugs into a
//! handler through [`ReadHooks`] / [`WriteHooks`]. A handler only accepts
//! hooks for the directions it supports.
//!
//! ## Lifecycle
//!
//! ```text
//! prepare_read()  ──Ok──▶ reader() valid ──▶ finalize_read(status)
//! prepare_write() ──Ok──▶ writer() valid ──▶ finalize_write(status) -> Status
//! ```
//!
//! Calling `finalize_*` without a matching successful `prepare_*`, preparing
//! while a transfer is active, or touching `reader()`/`writer()` outside the
//! window are contract violations and panic.

mod base;
mod hooks;
mod variants;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Status;
use crate::stream::{Reader, Writer};

pub use base::{HandlerCore, StreamBinding};
pub use hooks::{NoHooks, ReadHooks, WriteHooks};
pub use variants::{ReadOnlyHandler, ReadWriteHandler, WriteOnlyHandler};

/// Numeric key identifying one logical data resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(u32);

impl TransferId {
    /// Create a transfer ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the inner ID value
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for TransferId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directions a handler kind supports
///
/// Fixed per handler type; see the `CAPABILITY` constant on each handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Reads only
    ReadOnly,
    /// Writes only
    WriteOnly,
    /// Both reads and writes
    ReadWrite,
}

impl Capability {
    /// Whether read transfers can succeed
    #[must_use]
    pub const fn can_read(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Whether write transfers can succeed
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }

    /// String representation used in manifests and listings
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::WriteOnly => "write_only",
            Self::ReadWrite => "read_write",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which transfer, if any, currently holds the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferPhase {
    /// No transfer in progress
    #[default]
    Idle,
    /// Between a successful `prepare_read` and `finalize_read`
    Reading,
    /// Between a successful `prepare_write` and `finalize_write`
    Writing,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Reading => "read",
            Self::Writing => "write",
        })
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Binding between a transfer ID, a stream, and its lifecycle callbacks
///
/// Sealed: [`ReadOnlyHandler`], [`WriteOnlyHandler`] and [`ReadWriteHandler`]
/// are the only implementors. `'s` is the lifetime of the bound stream and of
/// the registry links.
///
/// Handlers are not synchronized. An engine must run at most one transfer per
/// handler at a time.
pub trait Handler<'s>: sealed::Sealed {
    /// Shared handler state (ID, binding, phase, list link)
    fn core(&self) -> &HandlerCore<'s>;

    /// Directions this handler kind supports
    fn capability(&self) -> Capability;

    /// Transfer ID this handler serves
    fn id(&self) -> TransferId {
        self.core().id()
    }

    /// Current transfer phase
    fn phase(&self) -> TransferPhase {
        self.core().phase()
    }

    /// Called at the beginning of a read transfer
    ///
    /// On `Ok`, [`reader`](Handler::reader) is valid until `finalize_read`.
    /// `Err(Unimplemented)` means reads are never supported. A handler with
    /// no reader bound returns `Err(Unbound(id))` without running its hooks.
    /// Any error aborts the read before bytes move, and `finalize_read` must
    /// not be called.
    fn prepare_read(&self) -> Status;

    /// Called exactly once at the end of a read transfer
    ///
    /// `status` tells whether the data transfer succeeded.
    fn finalize_read(&self, status: Status);

    /// Called at the beginning of a write transfer
    ///
    /// Mirror image of [`prepare_read`](Handler::prepare_read): a handler
    /// with no writer bound returns `Err(Unbound(id))` and its hooks do not
    /// run.
    fn prepare_write(&self) -> Status;

    /// Called exactly once at the end of a write transfer
    ///
    /// Returning an error marks the transfer as failed even if every byte
    /// arrived.
    fn finalize_write(&self, status: Status) -> Status;

    /// Stream for the active read transfer
    ///
    /// # Panics
    ///
    /// Panics unless a read transfer is between prepare and finalize.
    fn reader(&self) -> &'s dyn Reader {
        self.core().reader()
    }

    /// Stream for the active write transfer
    ///
    /// # Panics
    ///
    /// Panics unless a write transfer is between prepare and finalize.
    fn writer(&self) -> &'s dyn Writer {
        self.core().writer()
    }
}

impl fmt::Debug for dyn Handler<'_> + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id())
            .field("capability", &self.capability())
            .field("phase", &self.phase())
            .finish()
    }
}
