//! Resource callbacks run inside a handler's prepare/finalize bracket

use crate::error::Status;

/// Callbacks for the read direction
///
/// `prepare_read` runs after the handler checked its binding and before the
/// transfer becomes active; an error aborts the read and skips
/// `finalize_read`.
pub trait ReadHooks {
    /// Acquire whatever the read needs (open a file, allocate a buffer)
    fn prepare_read(&self) -> Status {
        Ok(())
    }

    /// Release read resources; `status` is the outcome of the transfer
    fn finalize_read(&self, _status: &Status) {}
}

/// Callbacks for the write direction
pub trait WriteHooks {
    /// Acquire whatever the write needs
    fn prepare_write(&self) -> Status {
        Ok(())
    }

    /// Release and validate write resources
    ///
    /// Returning an error fails the transfer even when `status` is `Ok`.
    fn finalize_write(&self, _status: &Status) -> Status {
        Ok(())
    }
}

/// Hooks that do nothing and always succeed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoHooks;

impl ReadHooks for NoHooks {}

impl WriteHooks for NoHooks {}

impl<T: ReadHooks + ?Sized> ReadHooks for &T {
    fn prepare_read(&self) -> Status {
        (**self).prepare_read()
    }

    fn finalize_read(&self, status: &Status) {
        (**self).finalize_read(status);
    }
}

impl<T: WriteHooks + ?Sized> WriteHooks for &T {
    fn prepare_write(&self) -> Status {
        (**self).prepare_write()
    }

    fn finalize_write(&self, status: &Status) -> Status {
        (**self).finalize_write(status)
    }
}
