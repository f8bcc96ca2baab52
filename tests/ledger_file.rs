//! File-backed ledger behavior on a real filesystem: first-run semantics,
//! append-only whole-line writes, and subsumption through the file.

use std::sync::Arc;

use tez_harvest::domain::dimensions::{DimensionValue, RefinementKind};
use tez_harvest::domain::ledger::ProgressLedger;
use tez_harvest::domain::partition::PartitionKey;
use tez_harvest::infrastructure::file_ledger::FileLedger;

fn key(uni_id: &str, year: &str) -> PartitionKey {
    PartitionKey::new(
        DimensionValue::new(uni_id, format!("University {uni_id}")),
        year,
    )
}

#[tokio::test]
async fn missing_file_reads_as_nothing_crawled() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = FileLedger::new(dir.path().join("progress.txt"));

    let snapshot = ledger.snapshot().await.unwrap();
    assert!(snapshot.is_empty());
    assert!(!snapshot.is_crawled(&key("10", "2020")));
}

#[tokio::test]
async fn ensure_exists_creates_an_empty_ledger_with_parents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state/progress.txt");
    let ledger = FileLedger::new(&path);

    ledger.ensure_exists().await.unwrap();
    assert!(path.exists());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

    // Idempotent: a second call leaves existing content alone.
    ledger.mark_crawled(&key("10", "2020")).await.unwrap();
    ledger.ensure_exists().await.unwrap();
    assert!(ledger.snapshot().await.unwrap().is_crawled(&key("10", "2020")));
}

#[tokio::test]
async fn appends_are_whole_lines_and_grep_able() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = FileLedger::new(dir.path().join("progress.txt"));

    ledger.mark_crawled(&key("10", "2020")).await.unwrap();
    ledger
        .mark_crawled(&key("10", "2020").refine(
            RefinementKind::Institute,
            DimensionValue::new("5", "Fen Bilimleri"),
        ))
        .await
        .unwrap();

    let content = std::fs::read_to_string(ledger.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert!(line.starts_with('['));
        assert!(line.ends_with(']'));
        // Every line decodes back to a key.
        PartitionKey::decode(line).unwrap();
    }
}

#[tokio::test]
async fn ancestor_line_subsumes_descendants_through_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = FileLedger::new(dir.path().join("progress.txt"));

    let root = key("10", "2020");
    ledger.mark_crawled(&root).await.unwrap();

    let child = root
        .refine(RefinementKind::ThesisType, DimensionValue::new("1", "Doktora"))
        .refine(RefinementKind::Institute, DimensionValue::new("5", "Fen"));
    let snapshot = ledger.snapshot().await.unwrap();
    assert!(snapshot.is_crawled(&child));
}

#[tokio::test]
async fn concurrent_markers_never_interleave_mid_line() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FileLedger::new(dir.path().join("progress.txt")));
    ledger.ensure_exists().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..32 {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger
                .mark_crawled(&key(&format!("{i}"), "2020"))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let content = std::fs::read_to_string(ledger.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 32);
    for line in lines {
        PartitionKey::decode(line).unwrap();
    }
    assert_eq!(ledger.snapshot().await.unwrap().len(), 32);
}
