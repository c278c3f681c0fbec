//! File downloads against the live mock server.

mod common;

use std::fs;

use common::{closed_port_url, spawn_server};
use fetch_core::{ErrorKind, FetchClient};
use mock_server::file_bytes;

#[test]
fn ok_response_is_written_byte_for_byte() {
    let base = spawn_server();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nested/deeper/payload.bin");

    let saved = FetchClient::new()
        .download_file(&format!("{base}/file"), &dest)
        .unwrap();

    assert_eq!(saved.as_deref(), Some(dest.as_path()));
    assert_eq!(fs::read(&dest).unwrap(), file_bytes());
}

#[test]
fn existing_file_is_replaced() {
    let base = spawn_server();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("payload.bin");
    fs::write(&dest, vec![0xAAu8; 20_000]).unwrap();

    FetchClient::new()
        .download_file(&format!("{base}/file"), &dest)
        .unwrap()
        .expect("200 response saves a file");

    assert_eq!(fs::read(&dest).unwrap(), file_bytes());
}

#[test]
fn not_found_creates_nothing() {
    let base = spawn_server();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("missing/out.bin");

    let saved = FetchClient::new()
        .download_file(&format!("{base}/missing"), &dest)
        .unwrap();

    assert!(saved.is_none());
    assert!(!dest.exists());
    assert!(!dir.path().join("missing").exists());
}

#[test]
fn redirect_is_not_followed() {
    let base = spawn_server();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("moved.txt");

    let saved = FetchClient::new()
        .download_file(&format!("{base}/moved"), &dest)
        .unwrap();

    assert!(saved.is_none());
    assert!(!dest.exists());
}

#[test]
fn transport_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.bin");

    let err = FetchClient::new()
        .download_file(&closed_port_url(), &dest)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConnectFail);
    assert!(!dest.exists());
}

#[test]
fn gzip_body_is_saved_as_sent() {
    let base = spawn_server();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("page.gz");

    FetchClient::new()
        .download_file(&format!("{base}/gzip"), &dest)
        .unwrap();

    let saved = fs::read(&dest).unwrap();
    assert_eq!(saved, mock_server::gzip_bytes(mock_server::PLAIN_TEXT.as_bytes()));
}
