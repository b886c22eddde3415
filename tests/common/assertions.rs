//! Custom test assertions for end-to-end tests

use material_dl::{DownloadId, Event};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::Receiver;

/// Events buffered for download `id`
pub fn events_for(rx: &mut Receiver<Event>, id: Option<DownloadId>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if id.is_none_or(|id| event_id(&event) == id) {
            events.push(event);
        }
    }
    events
}

fn event_id(event: &Event) -> DownloadId {
    match event {
        Event::Started { id, .. }
        | Event::StageChanged { id, .. }
        | Event::FallbackDirectory { id, .. }
        | Event::Completed { id, .. }
        | Event::Failed { id, .. }
        | Event::ShareFailed { id, .. }
        | Event::NotifierFailed { id, .. } => *id,
    }
}

/// Every regular file below `dir`, relative to it
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(dir).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}

/// Assert that no hidden partial file survived anywhere below `dir`
pub fn assert_no_partial_files(dir: &Path) {
    let partials: Vec<PathBuf> = files_under(dir)
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.') && n.ends_with(".part"))
        })
        .collect();
    assert!(partials.is_empty(), "partial files left behind: {:?}", partials);
}
