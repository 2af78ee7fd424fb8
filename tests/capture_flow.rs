//! End-to-end capture: scripted clipboard, interactive commands, file output,
//! then conversion to cards.

use std::sync::Arc;
use std::time::Duration;

use clipboard_capture::cards::{convert_file, default_output_path};
use clipboard_capture::prelude::*;
use pretty_assertions::assert_eq;

async fn wait_for_records(handle: &SessionHandle, pending: &str) {
    for _ in 0..400 {
        if handle.pending().map(|p| p.content) == Some(pending.to_string()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("capture loop never adopted {pending:?}");
}

#[tokio::test]
async fn captured_items_land_in_a_valid_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let config = CaptureConfig {
        poll_interval: Duration::from_millis(2),
        output_file: Some(path.clone()),
        ..CaptureConfig::default()
    };

    let reader = Arc::new(ScriptedReader::new([Some("on the clipboard before start")]));
    let mut session =
        CaptureSession::start(&config, reader.clone(), Box::new(FileSink::new(&path))).unwrap();
    let handle = session.handle().clone();

    handle.set_source("Rust Book");
    handle.set_tag("rust");
    handle.set_note("what is ownership?");
    reader.push(Some("Each value has an owner.\nOnly one."));
    wait_for_records(&handle, "Each value has an owner.\nOnly one.").await;

    reader.push(Some("https://doc.rust-lang.org/book/"));
    reader.push(Some("   "));
    wait_for_records(&handle, "   ").await;

    handle.toggle_extract();
    reader.push(Some("Borrowing\tlends access."));
    wait_for_records(&handle, "Borrowing\tlends access.").await;

    let mut out = Vec::new();
    let end = CommandSession::new(&mut session, "q\n".as_bytes(), &mut out)
        .run()
        .await
        .unwrap();
    assert_eq!(end, SessionEnd::Quit);

    let text = std::fs::read_to_string(&path).unwrap();
    let records: Vec<Record> = serde_json::from_str(&text).unwrap();
    assert_eq!(
        records,
        vec![
            Record {
                note: "what is ownership?".into(),
                content: "Each value has an owner.<br>Only one.".into(),
                source: "Rust Book".into(),
                tag: "rust".into(),
            },
            Record {
                note: String::new(),
                content: "Borrowing&nbsp;&nbsp;&nbsp;&nbsp;lends access.".into(),
                source: "Rust Book".into(),
                tag: "rust extract".into(),
            },
        ]
    );
    assert_eq!(text.lines().filter(|l| *l == ",").count(), 1);

    let cards = default_output_path(&path);
    assert_eq!(convert_file(&path, &cards).unwrap(), 2);
    assert_eq!(
        std::fs::read_to_string(&cards).unwrap(),
        "what is ownership?\tEach value has an owner.<br>Only one.<br><br>source: Rust Book\trust\n\
         todo\tBorrowing&nbsp;&nbsp;&nbsp;&nbsp;lends access.<br><br>source: Rust Book\trust extract\n"
    );
}

#[tokio::test]
async fn session_without_copies_writes_an_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");
    let config = CaptureConfig {
        poll_interval: Duration::from_millis(2),
        ..CaptureConfig::default()
    };
    let reader = Arc::new(ScriptedReader::new([Some("baseline only")]));
    let mut session =
        CaptureSession::start(&config, reader, Box::new(FileSink::new(&path))).unwrap();

    session.shutdown().await.unwrap();
    session.shutdown().await.unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[\n]\n");
}
