//! Integration tests for handler lifecycles
//!
//! These tests drive handlers the way a transfer engine does: look the
//! handler up in a registry, prepare it, move bytes through the exposed
//! stream, and finalize it.

use std::cell::RefCell;
use std::fs;
use std::io::Cursor;

use ferry_transfer::{
    Capability, FileStream, Handler, HandlerRegistry, Manifest, ReadOnlyHandler,
    ReadWriteHandler, TransferError, TransferId, TransferPhase, WriteOnlyHandler, read_transfer,
    write_transfer,
};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a directory with a manifest covering every handler kind
fn create_test_area() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();

    fs::write(root.join("firmware.bin"), b"firmware v1").unwrap();
    fs::write(root.join("scratch.bin"), b"").unwrap();
    fs::write(
        root.join("ferry.json"),
        r#"{"handlers": [
            {"id": 1, "path": "firmware.bin", "access": "read_only"},
            {"id": 2, "path": "upload.bin", "access": "write_only",
             "sha256": "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"},
            {"id": 3, "path": "scratch.bin", "access": "read_write"}
        ]}"#,
    )
    .unwrap();

    temp_dir
}

// ============================================================================
// Capability Tests
// ============================================================================

#[test]
fn test_read_only_handler_rejects_writes() {
    let stream = RefCell::new(Cursor::new(b"payload".to_vec()));
    let handler = ReadOnlyHandler::with_reader(1, &stream);

    assert_eq!(handler.prepare_read(), Ok(()));
    assert_eq!(handler.phase(), TransferPhase::Reading);
    let mut buf = [0u8; 16];
    let n = handler.reader().read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"payload");
    handler.finalize_read(Ok(()));

    let err = handler.prepare_write().unwrap_err();
    assert_eq!(err, TransferError::Unimplemented);
    assert!(err.is_permanent());
    assert_eq!(handler.phase(), TransferPhase::Idle);
}

#[test]
fn test_write_only_handler_rejects_reads() {
    let stream = RefCell::new(Vec::<u8>::new());
    let handler = WriteOnlyHandler::with_writer(2, &stream);

    assert_eq!(handler.prepare_read(), Err(TransferError::Unimplemented));
    assert_eq!(handler.prepare_write(), Ok(()));
    handler.writer().write_all(b"upload").unwrap();
    assert_eq!(handler.finalize_write(Ok(())), Ok(()));
    assert_eq!(stream.borrow().as_slice(), b"upload");
}

#[test]
fn test_read_write_handler_exposes_one_stream() {
    let stream = RefCell::new(Cursor::new(Vec::<u8>::new()));
    let handler = ReadWriteHandler::with_reader_writer(3, &stream);

    handler.prepare_write().unwrap();
    let writer = handler.writer();
    handler.finalize_write(Ok(())).unwrap();

    handler.prepare_read().unwrap();
    let reader = handler.reader();
    handler.finalize_read(Ok(()));

    assert!(std::ptr::addr_eq(reader, writer));
    assert!(std::ptr::addr_eq(reader, &stream));
}

#[test]
fn test_unbound_handler_fails_to_prepare() {
    let stream = RefCell::new(Cursor::new(b"late".to_vec()));
    let handler = ReadWriteHandler::new(4);
    assert_eq!(
        handler.prepare_read(),
        Err(TransferError::Unbound(TransferId::new(4)))
    );
    assert_eq!(
        handler.prepare_write(),
        Err(TransferError::Unbound(TransferId::new(4)))
    );

    handler.set_reader_writer(&stream);
    assert_eq!(handler.prepare_read(), Ok(()));
    handler.finalize_read(Ok(()));
}

// ============================================================================
// Registry Tests
// ============================================================================

#[test]
fn test_registry_dispatch_by_id() {
    let reader = RefCell::new(Cursor::new(b"image".to_vec()));
    let writer = RefCell::new(Vec::<u8>::new());
    let download = ReadOnlyHandler::with_reader(10, &reader);
    let upload = WriteOnlyHandler::with_writer(11, &writer);

    let registry = HandlerRegistry::new();
    registry.register(&download).unwrap();
    registry.register(&upload).unwrap();

    let mut sink = Vec::new();
    let handler = registry.find(TransferId::new(10)).unwrap();
    assert_eq!(read_transfer(handler, &mut sink), Ok(5));
    assert_eq!(sink, b"image");

    let handler = registry.find(TransferId::new(11)).unwrap();
    assert_eq!(handler.capability(), Capability::WriteOnly);
    assert_eq!(write_transfer(handler, &mut &b"data"[..]), Ok(4));
    assert_eq!(writer.borrow().as_slice(), b"data");

    assert!(registry.find(TransferId::new(12)).is_none());
}

#[test]
fn test_registry_rejects_duplicate_ids() {
    let first = ReadOnlyHandler::new(20);
    let second = ReadWriteHandler::new(20);

    let registry = HandlerRegistry::new();
    registry.register(&first).unwrap();
    assert_eq!(
        registry.register(&second),
        Err(TransferError::AlreadyExists(TransferId::new(20)))
    );

    assert!(registry.unregister(&first));
    registry.register(&second).unwrap();
    let found = registry.find(TransferId::new(20)).unwrap();
    assert_eq!(found.capability(), Capability::ReadWrite);
}

// ============================================================================
// Manifest and File Tests
// ============================================================================

#[test]
fn test_manifest_backed_registry() {
    let area = create_test_area();
    let manifest = Manifest::load(&area.path().join("ferry.json")).unwrap();
    let streams: Vec<FileStream> = manifest.handlers.iter().map(|e| e.stream()).collect();

    let firmware = streams[0].read_only_handler(1);
    let upload = streams[1].write_only_handler(2);
    let scratch = streams[2].read_write_handler(3);

    let registry = HandlerRegistry::new();
    registry.register(&firmware).unwrap();
    registry.register(&upload).unwrap();
    registry.register(&scratch).unwrap();
    assert_eq!(registry.len(), 3);

    let mut sink = Vec::new();
    let handler = registry.find(TransferId::new(1)).unwrap();
    read_transfer(handler, &mut sink).unwrap();
    assert_eq!(sink, b"firmware v1");

    let handler = registry.find(TransferId::new(2)).unwrap();
    write_transfer(handler, &mut &b"hello world"[..]).unwrap();
    assert_eq!(
        fs::read(area.path().join("upload.bin")).unwrap(),
        b"hello world"
    );

    let handler = registry.find(TransferId::new(3)).unwrap();
    write_transfer(handler, &mut &b"notes"[..]).unwrap();
    let mut sink = Vec::new();
    read_transfer(handler, &mut sink).unwrap();
    assert_eq!(sink, b"notes");

    registry.clear();
}

#[test]
fn test_rejected_upload_leaves_no_file() {
    let area = create_test_area();
    let manifest = Manifest::load(&area.path().join("ferry.json")).unwrap();
    let entry = manifest.entry(TransferId::new(2)).unwrap();
    let stream = entry.stream();
    let handler = stream.write_only_handler(2);

    let err = write_transfer(&handler, &mut &b"tampered"[..]).unwrap_err();
    assert_eq!(err.kind(), "data_loss");
    assert!(!area.path().join("upload.bin").exists());
    assert_eq!(handler.phase(), TransferPhase::Idle);
}

#[test]
fn test_missing_file_reports_not_found() {
    let area = create_test_area();
    let stream = FileStream::new(area.path().join("absent.bin"));
    let handler = stream.read_only_handler(9);

    let mut sink = Vec::new();
    let err = read_transfer(&handler, &mut sink).unwrap_err();
    assert!(matches!(err, TransferError::NotFound(_)));
    assert!(!stream.is_open());
}

// ============================================================================
// Contract Violations
// ============================================================================

#[test]
#[should_panic(expected = "reader accessed outside a prepared read transfer")]
fn test_reader_before_prepare_panics() {
    let stream = RefCell::new(Cursor::new(Vec::<u8>::new()));
    let handler = ReadOnlyHandler::with_reader(1, &stream);
    let _ = handler.reader();
}

#[test]
#[should_panic(expected = "finalize_write without a successful prepare_write")]
fn test_finalize_after_failed_prepare_panics() {
    let handler = WriteOnlyHandler::new(2);
    assert!(handler.prepare_write().is_err());
    let _ = handler.finalize_write(Ok(()));
}

#[test]
#[should_panic(expected = "does not support write transfers")]
fn test_finalize_unsupported_direction_panics() {
    let handler = ReadOnlyHandler::new(3);
    let _ = handler.finalize_write(Ok(()));
}
