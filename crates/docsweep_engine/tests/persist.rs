use std::fs;
use std::path::Path;

use docsweep_engine::{ensure_output_dir, reset_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn reset_dir_wipes_previous_contents() {
    let temp = TempDir::new().unwrap();
    let scratch = temp.path().join("tmp");
    fs::create_dir_all(scratch.join("old/nested")).unwrap();
    fs::write(scratch.join("old/nested/site.zip"), b"stale").unwrap();

    reset_dir(&scratch).unwrap();

    assert!(scratch.is_dir());
    assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
}

#[test]
fn reset_dir_creates_a_missing_dir() {
    let temp = TempDir::new().unwrap();
    let scratch = temp.path().join("fresh");
    reset_dir(&scratch).unwrap();
    assert!(scratch.is_dir());
}

#[test]
fn atomic_write_replaces_existing_and_creates_subdirs() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write(Path::new("sites/a.zip"), b"hello").unwrap();
    assert_eq!(first, temp.path().join("sites/a.zip"));
    assert_eq!(fs::read(&first).unwrap(), b"hello");

    let second = writer.write(Path::new("sites/a.zip"), b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write(Path::new("doc.zip"), b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("doc.zip").exists());
}
