//! Stream capabilities consumed by transfer handlers
//!
//! Handlers only borrow a stream; they never move bytes themselves. All
//! operations take `&self` so that a stream can be shared between a handler
//! and its owner, with the stream providing its own interior mutability.
//!
//! Any `RefCell<T>` where `T: io::Read` (or `io::Write`) is a stream, so a
//! `RefCell<File>` or `RefCell<Cursor<Vec<u8>>>` can be bound directly.

use std::cell::RefCell;
use std::io;

/// Source of bytes for a read transfer
pub trait Reader {
    /// Read into `buf`, returning the number of bytes produced (0 at end of stream)
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Sink of bytes for a write transfer
pub trait Writer {
    /// Write from `data`, returning the number of bytes consumed
    fn write(&self, data: &[u8]) -> io::Result<usize>;

    /// Flush buffered data to the underlying resource
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Write all of `data`, retrying on short writes
    fn write_all(&self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.write(data) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "stream accepted no bytes",
                    ));
                }
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// A single object usable as both a [`Reader`] and a [`Writer`]
///
/// Implemented for every type that is both. The facet accessors return the
/// same object, never a copy.
pub trait ReaderWriter: Reader + Writer {
    /// View this object through its read facet
    fn as_reader(&self) -> &dyn Reader;

    /// View this object through its write facet
    fn as_writer(&self) -> &dyn Writer;
}

impl<T: Reader + Writer> ReaderWriter for T {
    fn as_reader(&self) -> &dyn Reader {
        self
    }

    fn as_writer(&self) -> &dyn Writer {
        self
    }
}

impl<T: io::Read> Reader for RefCell<T> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.borrow_mut().read(buf)
    }
}

impl<T: io::Write> Writer for RefCell<T> {
    fn write(&self, data: &[u8]) -> io::Result<usize> {
        self.borrow_mut().write(data)
    }

    fn flush(&self) -> io::Result<()> {
        self.borrow_mut().flush()
    }
}
