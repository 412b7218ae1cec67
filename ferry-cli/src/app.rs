//! Manifest-driven handler setup and command execution

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use ferry_transfer::{
    Capability, FileStream, Handler, HandlerEntry, HandlerRegistry, Manifest, ManifestError,
    ReadOnlyHandler, ReadWriteHandler, TransferError, TransferId, WriteOnlyHandler,
    read_transfer, write_transfer,
};

use crate::args::{Args, Command};

/// Errors reported by the `ferry` binary
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The manifest could not be loaded
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A handler could not be registered
    #[error("failed to register handler: {0}")]
    Register(TransferError),

    /// No handler serves the requested ID
    #[error("no handler registered for transfer id {0}")]
    UnknownId(TransferId),

    /// The transfer itself failed
    #[error("transfer {id} failed: {source}")]
    Transfer {
        /// Transfer ID
        id: TransferId,
        /// Underlying error
        #[source]
        source: TransferError,
    },

    /// Opening `--input`/`--output` or writing the listing failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// File handler of whichever kind the manifest asks for
enum FileHandler<'a> {
    ReadOnly(ReadOnlyHandler<'a, &'a FileStream>),
    WriteOnly(WriteOnlyHandler<'a, &'a FileStream>),
    ReadWrite(ReadWriteHandler<'a, &'a FileStream>),
}

impl<'a> FileHandler<'a> {
    fn new(entry: &HandlerEntry, stream: &'a FileStream) -> Self {
        let id = entry.id.as_u32();
        match entry.access {
            Capability::ReadOnly => Self::ReadOnly(stream.read_only_handler(id)),
            Capability::WriteOnly => Self::WriteOnly(stream.write_only_handler(id)),
            Capability::ReadWrite => Self::ReadWrite(stream.read_write_handler(id)),
        }
    }

    fn as_handler(&'a self) -> &'a dyn Handler<'a> {
        match self {
            Self::ReadOnly(handler) => handler,
            Self::WriteOnly(handler) => handler,
            Self::ReadWrite(handler) => handler,
        }
    }
}

/// Load the manifest and run the requested command against stdin/stdout
pub fn run(args: &Args) -> Result<(), CliError> {
    let manifest = Manifest::load(&args.manifest)?;
    execute(
        &manifest,
        &args.command,
        &mut io::stdin().lock(),
        &mut io::stdout().lock(),
    )
}

/// Register one handler per manifest entry and run `command`
pub fn execute(
    manifest: &Manifest,
    command: &Command,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
) -> Result<(), CliError> {
    let streams: Vec<FileStream> = manifest.handlers.iter().map(HandlerEntry::stream).collect();
    let handlers: Vec<FileHandler<'_>> = manifest
        .handlers
        .iter()
        .zip(&streams)
        .map(|(entry, stream)| FileHandler::new(entry, stream))
        .collect();

    let registry = HandlerRegistry::new();
    for handler in &handlers {
        registry
            .register(handler.as_handler())
            .map_err(CliError::Register)?;
    }
    tracing::debug!(handlers = registry.len(), "registry ready");

    let result = match command {
        Command::List => list(&registry, manifest, stdout),
        Command::Read { id, output } => {
            let id = TransferId::new(*id);
            match output {
                Some(path) => read(&registry, id, &mut create(path)?),
                None => read(&registry, id, stdout),
            }
        }
        Command::Write { id, input } => {
            let id = TransferId::new(*id);
            match input {
                Some(path) => write(&registry, id, &mut open(path)?),
                None => write(&registry, id, stdin),
            }
        }
    };

    registry.clear();
    result
}

fn create(path: &Path) -> io::Result<File> {
    File::create(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", path.display())))
}

fn open(path: &Path) -> io::Result<File> {
    File::open(path).map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", path.display())))
}

/// Print ID, capability and path of every registered handler
fn list(
    registry: &HandlerRegistry<'_>,
    manifest: &Manifest,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    for handler in registry {
        let path = manifest
            .entry(handler.id())
            .map(|entry| entry.path.display().to_string())
            .unwrap_or_default();
        writeln!(out, "{}\t{}\t{}", handler.id(), handler.capability(), path)?;
    }
    Ok(())
}

fn read<W>(registry: &HandlerRegistry<'_>, id: TransferId, sink: &mut W) -> Result<(), CliError>
where
    W: Write + ?Sized,
{
    let handler = registry.find(id).ok_or(CliError::UnknownId(id))?;
    let bytes = read_transfer(handler, sink).map_err(|source| CliError::Transfer { id, source })?;
    tracing::info!(id = %id, bytes, "read complete");
    Ok(())
}

fn write<R>(registry: &HandlerRegistry<'_>, id: TransferId, source: &mut R) -> Result<(), CliError>
where
    R: Read + ?Sized,
{
    let handler = registry.find(id).ok_or(CliError::UnknownId(id))?;
    let bytes =
        write_transfer(handler, source).map_err(|source| CliError::Transfer { id, source })?;
    tracing::info!(id = %id, bytes, "write complete");
    Ok(())
}
