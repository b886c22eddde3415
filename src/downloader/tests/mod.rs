use super::test_helpers::*;
use super::*;
use crate::error::FailureKind;
use crate::platform::PermissionStatus;
use crate::types::{DownloadOptions, DownloadOutcome, DownloadRequest, ProgressEvent, ProgressSink};
use std::path::Path;
use std::time::Duration;


fn calculus_request() -> DownloadRequest {
    DownloadRequest::new("materials/xyz.pdf", "Calculus Notes.pdf")
}

/// Drain every event currently buffered in `rx`
fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn assert_failed(outcome: &DownloadOutcome, kind: FailureKind) {
    assert!(!outcome.succeeded, "expected failure, got {:?}", outcome);
    assert_eq!(outcome.failure, Some(kind), "{:?}", outcome);
    assert!(outcome.local_path.is_none());
    assert!(
        outcome
            .error_description
            .as_deref()
            .is_some_and(|d| !d.is_empty()),
        "failure must carry a description"
    );
}

fn file_names_in(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
