#![cfg(all(unix, feature = "tokio"))]

use std::time::Duration;

use autstream::{IngestConfig, IngestError};

const AUT: &str = "HOA: v1\nname: \"async\"\nStates: 1\nStart: 0\nAP: 0\nAcceptance: 0 t\n--BODY--\nState: 0\n[t] 0\n--END--\n";

#[tokio::test]
async fn async_sequence_reads_literal_and_command_sources() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.hoa");
    std::fs::write(&path, AUT).unwrap();
    let command = format!("cat '{}' '{}'|", path.display(), path.display());

    let automata = hoa::automata_async([AUT.to_string(), command], IngestConfig::default())
        .collect_all()
        .await
        .unwrap();
    assert_eq!(automata.len(), 3);
    assert!(automata.iter().all(|a| a.name.as_deref() == Some("async")));
}

#[tokio::test]
async fn async_deadline_and_exit_status() {
    let mut slow = hoa::automata_async(
        ["sleep 10|"],
        IngestConfig::default().timeout(Some(Duration::from_millis(500))),
    );
    let err = slow.next_automaton().await.unwrap().unwrap_err();
    assert!(err.is_timeout());
    assert!(slow.next_automaton().await.is_none());

    let mut failing = hoa::automata_async(["true|"], IngestConfig::default());
    assert!(failing.next_automaton().await.is_none());

    let mut failing = hoa::automata_async(["exit 4|"], IngestConfig::default());
    match failing.next_automaton().await {
        Some(Err(IngestError::CommandFailed { status, .. })) => assert_eq!(status.code(), Some(4)),
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}
