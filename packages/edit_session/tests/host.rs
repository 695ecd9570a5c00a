//! End-to-end tests: frames in, frames out, through a real `Host`.

use edit_session::{Host, HostConfig, HostError, SessionRegistry, ShutdownReport, TempStore};
use native_messaging::{FrameReader, OutboundMessage};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

const DEADLINE: Duration = Duration::from_secs(20);

fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(payload);
    out
}

fn new_text(id: &str, subject: &str, editor: &[&str]) -> Vec<u8> {
    let msg = json!({
        "type": "new_text",
        "payload": {
            "id": id,
            "text": "original",
            "caret": 0,
            "subject": subject,
            "editor": serde_json::to_string(editor).unwrap(),
            "extension": "txt",
        }
    });
    frame(&serde_json::to_vec(&msg).unwrap())
}

struct Run {
    report: ShutdownReport,
    messages: Vec<OutboundMessage>,
    leftover_files: usize,
}

/// Feed `input` to a fresh host, close its stdin, and collect everything it
/// writes until it exits.
async fn run_host(input: Vec<u8>) -> Run {
    let root = TempDir::new().unwrap();
    let store = TempStore::open(
        &root.path().join("exteditor"),
        Arc::new(SessionRegistry::new()),
    )
    .unwrap();
    let store = Arc::new(store);
    let host = Host::new(store.clone(), HostConfig::default());

    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let (client_read, mut client_write) = tokio::io::split(client);

    let serve = tokio::spawn(async move { host.serve(server_read, server_write).await });

    client_write.write_all(&input).await.unwrap();
    client_write.shutdown().await.unwrap();

    let mut reader = FrameReader::new(client_read, usize::MAX);
    let mut messages = Vec::new();
    let collect = async {
        while let Some(frame) = reader.read_frame().await.unwrap() {
            messages.push(serde_json::from_slice(&frame).unwrap());
        }
    };
    tokio::time::timeout(DEADLINE, collect)
        .await
        .expect("host output did not end");

    let report = tokio::time::timeout(DEADLINE, serve)
        .await
        .expect("host did not exit")
        .unwrap();
    let leftover_files = std::fs::read_dir(store.dir()).unwrap().count();

    Run {
        report,
        messages,
        leftover_files,
    }
}

fn death_notices(messages: &[OutboundMessage], id: &str) -> usize {
    messages
        .iter()
        .filter(|m| **m == OutboundMessage::death_notice(id))
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn immediate_eof_exits_cleanly() {
    let run = run_host(Vec::new()).await;
    assert_eq!(run.report.exit_code(), 0);
    assert!(run.messages.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn truncated_json_is_a_protocol_failure() {
    let run = run_host(frame(br#"{"type":"new_text","payload":{"id":"#)).await;

    assert_eq!(run.report.exit_code(), 1);
    assert!(matches!(run.report.errors[0], HostError::Protocol(_)));
    assert!(matches!(run.messages[0], OutboundMessage::Error { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn eof_mid_frame_is_a_protocol_failure() {
    let mut input = frame(br#"{"type":"ping"}"#);
    input.truncate(input.len() - 3);
    let run = run_host(input).await;

    assert_eq!(run.report.exit_code(), 1);
    assert!(matches!(run.report.errors[0], HostError::Protocol(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_message_types_are_ignored() {
    let run = run_host(frame(br#"{"type":"set_text","payload":{"text":"x"}}"#)).await;
    assert_eq!(run.report.exit_code(), 0);
    assert!(run.messages.is_empty());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn session_ends_with_single_death_notice() {
    let run = run_host(new_text("7_1", "Hello", &["true"])).await;

    assert_eq!(run.report.exit_code(), 0);
    assert_eq!(run.messages, vec![OutboundMessage::death_notice("7_1")]);
    assert_eq!(run.leftover_files, 0);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_editor_sets_exit_status() {
    let run = run_host(new_text("9_0", "Hello", &["false"])).await;

    assert_eq!(run.report.exit_code(), 1);
    assert!(matches!(
        run.report.errors[0],
        HostError::Session { ref id, .. } if id == "9_0"
    ));
    assert_eq!(death_notices(&run.messages, "9_0"), 1);
    assert_eq!(run.messages.last(), Some(&OutboundMessage::death_notice("9_0")));
    assert_eq!(run.leftover_files, 0);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_with_same_subject_do_not_cross_talk() {
    let script = "printf \"$0\" > \"$1\"; sleep 1";
    let mut input = new_text("a", "Same subject", &["sh", "-c", script, "from-a", "%s"]);
    input.extend(new_text("b", "Same subject", &["sh", "-c", script, "from-b", "%s"]));

    let run = run_host(input).await;

    assert_eq!(run.report.exit_code(), 0);
    for (id, expected) in [("a", "from-a"), ("b", "from-b")] {
        let texts: Vec<&str> = run
            .messages
            .iter()
            .filter_map(|m| match m {
                OutboundMessage::TextUpdate { id: got, text } if got == id => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts.last(), Some(&expected), "updates for {id}: {texts:?}");
        assert!(texts.iter().all(|t| t.is_empty() || *t == expected));
        assert_eq!(death_notices(&run.messages, id), 1);
    }
    assert_eq!(run.leftover_files, 0);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn death_notice_follows_updates() {
    let input = new_text(
        "rt",
        "Round trip",
        &["sh", "-c", "printf 'first' > \"$0\"; sleep 1", "%s"],
    );
    let run = run_host(input).await;

    assert_eq!(run.report.exit_code(), 0);
    assert_eq!(
        run.messages.iter().rev().nth(1),
        Some(&OutboundMessage::text_update("rt", "first"))
    );
    assert_eq!(run.messages.last(), Some(&OutboundMessage::death_notice("rt")));
}
