//! Ferry Transfer Library
//!
//! Binds transfer IDs to byte streams for a chunked transfer engine. A
//! handler owns the prepare/finalize bracket around each transfer, a
//! registry looks handlers up by ID, and sessions drive the bracket from the
//! engine side.

pub mod error;
pub mod file;
pub mod handler;
pub mod manifest;
pub mod registry;
pub mod session;
pub mod sleep;
pub mod stream;

pub use error::{Status, TransferError};
pub use file::FileStream;
pub use handler::{
    Capability, Handler, HandlerCore, NoHooks, ReadHooks, ReadOnlyHandler, ReadWriteHandler,
    StreamBinding, TransferId, TransferPhase, WriteHooks, WriteOnlyHandler,
};
pub use manifest::{HandlerEntry, Manifest, ManifestError};
pub use registry::HandlerRegistry;
pub use session::{ReadSession, WriteSession, read_transfer, write_transfer};
pub use stream::{Reader, ReaderWriter, Writer};

/// Buffer size for copying between a handler's stream and the engine side
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;
