//! Shared test helpers for creating MaterialDownloader instances with mock
//! collaborators.

use crate::config::Config;
use crate::downloader::MaterialDownloader;
use crate::error::{Error, Result, WriteError};
use crate::notify::{PostDownloadNotifier, ShareRequest, ShareSheet};
use crate::platform::{PermissionGate, PermissionStatus};
use crate::storage::ObjectStorage;
use crate::transfer::{FileTransfer, TransferReport, TransferRequest};
use crate::types::CompletedDownload;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Signed URL handed out by [`MockStorage::signing`]
pub(crate) const SIGNED_URL: &str =
    "https://storage.test/storage/v1/object/sign/study-materials/materials/xyz.pdf?token=abc";

/// Object storage that answers every signing request the same way
pub(crate) struct MockStorage {
    reply: std::result::Result<String, String>,
    calls: Mutex<Vec<(String, String, Duration)>>,
}

impl MockStorage {
    pub(crate) fn signing() -> Self {
        Self {
            reply: Ok(SIGNED_URL.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(bucket, path, expiry)` of every signing request
    pub(crate) fn calls(&self) -> Vec<(String, String, Duration)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn create_signed_url(&self, bucket: &str, path: &str, expiry: Duration) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((bucket.to_string(), path.to_string(), expiry));
        self.reply.clone().map_err(Error::SourceResolutionFailed)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Filesystem seam that writes a fixed body instead of talking HTTP
///
/// Directory creation is real. Writes into a directory marked with
/// [`make_unavailable`](Self::make_unavailable) fail with
/// [`WriteError::PathUnavailable`].
pub(crate) struct MockTransfer {
    body_len: usize,
    status_code: u16,
    announce_total: bool,
    delay: Duration,
    lose_partial: bool,
    unavailable: Mutex<Vec<PathBuf>>,
    created_dirs: Mutex<Vec<PathBuf>>,
    destinations: Mutex<Vec<PathBuf>>,
    urls: Mutex<Vec<String>>,
}

impl MockTransfer {
    pub(crate) fn writing(body_len: usize) -> Self {
        Self {
            body_len,
            status_code: 200,
            announce_total: true,
            delay: Duration::ZERO,
            lose_partial: false,
            unavailable: Mutex::new(Vec::new()),
            created_dirs: Mutex::new(Vec::new()),
            destinations: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Do not announce a content length
    pub(crate) fn with_unknown_total(mut self) -> Self {
        self.announce_total = false;
        self
    }

    /// Stall after the body is written, leaving the partial file in place
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Publishing fails as if the partial file vanished before the rename
    pub(crate) fn losing_partial(mut self) -> Self {
        self.lose_partial = true;
        self
    }

    pub(crate) fn make_unavailable(&self, dir: &Path) {
        self.unavailable.lock().unwrap().push(dir.to_path_buf());
    }

    pub(crate) fn created_dirs(&self) -> Vec<PathBuf> {
        self.created_dirs.lock().unwrap().clone()
    }

    /// Partial file paths the transfer was asked to write
    pub(crate) fn destinations(&self) -> Vec<PathBuf> {
        self.destinations.lock().unwrap().clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub(crate) fn filesystem_calls(&self) -> usize {
        self.created_dirs.lock().unwrap().len() + self.destinations.lock().unwrap().len()
    }
}

#[async_trait]
impl FileTransfer for MockTransfer {
    async fn create_dir(&self, path: &Path) -> std::result::Result<(), WriteError> {
        self.created_dirs.lock().unwrap().push(path.to_path_buf());
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| WriteError::from_io(path, e))
    }

    async fn download_to_file(
        &self,
        request: TransferRequest<'_>,
    ) -> std::result::Result<TransferReport, WriteError> {
        self.destinations
            .lock()
            .unwrap()
            .push(request.destination.to_path_buf());
        self.urls.lock().unwrap().push(request.url.to_string());

        let parent = request.destination.parent().map(Path::to_path_buf);
        let unavailable = self.unavailable.lock().unwrap().clone();
        if parent.is_some_and(|p| unavailable.contains(&p)) {
            return Err(WriteError::PathUnavailable {
                path: request.destination.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "ENOENT: no such file or directory",
                ),
            });
        }

        let total = self.announce_total.then_some(self.body_len as u64);
        request.observer.on_begin(self.status_code, total);

        if !(200..300).contains(&self.status_code) {
            return Ok(TransferReport {
                status_code: self.status_code,
                bytes_written: 0,
                total_bytes: total,
            });
        }

        tokio::fs::write(request.destination, vec![0xAB; self.body_len])
            .await
            .map_err(|e| WriteError::from_io(request.destination, e))?;
        if self.body_len > 0 {
            for quarter in 1..=4u64 {
                request
                    .observer
                    .on_progress(self.body_len as u64 * quarter / 4, total);
            }
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(TransferReport {
            status_code: self.status_code,
            bytes_written: self.body_len as u64,
            total_bytes: total,
        })
    }

    async fn persist(&self, partial: &Path, destination: &Path) -> std::result::Result<(), WriteError> {
        if self.lose_partial {
            return Err(WriteError::from_io(
                destination,
                std::io::Error::new(std::io::ErrorKind::NotFound, "partial file vanished"),
            ));
        }
        tokio::fs::rename(partial, destination)
            .await
            .map_err(|e| WriteError::from_io(destination, e))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Permission gate that records how often it was asked
pub(crate) struct RecordingGate {
    reply: Option<PermissionStatus>,
    calls: AtomicUsize,
}

impl RecordingGate {
    pub(crate) fn answering(status: PermissionStatus) -> Self {
        Self {
            reply: Some(status),
            calls: AtomicUsize::new(0),
        }
    }

    /// Gate whose request itself fails
    pub(crate) fn broken() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for RecordingGate {
    async fn request_write_permission(&self) -> Result<PermissionStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .ok_or_else(|| Error::Other("permission dialog unavailable".into()))
    }
}

/// How a mock side effect behaves when invoked
#[derive(Clone, Copy, Debug)]
pub(crate) enum Behavior {
    Succeed,
    Fail,
    Panic,
    Hang,
}

async fn behave(behavior: Behavior) -> Result<()> {
    match behavior {
        Behavior::Succeed => Ok(()),
        Behavior::Fail => Err(Error::Other("side effect failed".into())),
        Behavior::Panic => panic!("side effect panicked"),
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }
}

pub(crate) struct MockShareSheet {
    behavior: Behavior,
    requests: Mutex<Vec<ShareRequest>>,
}

impl MockShareSheet {
    pub(crate) fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<ShareRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShareSheet for MockShareSheet {
    async fn share(&self, request: ShareRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request);
        behave(self.behavior).await
    }
}

pub(crate) struct MockNotifier {
    name: &'static str,
    behavior: Behavior,
    seen: Mutex<Vec<CompletedDownload>>,
}

impl MockNotifier {
    pub(crate) fn new(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            behavior,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn seen(&self) -> Vec<CompletedDownload> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostDownloadNotifier for MockNotifier {
    async fn on_downloaded(&self, download: &CompletedDownload) -> Result<()> {
        self.seen.lock().unwrap().push(download.clone());
        behave(self.behavior).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Shared directory layout of the test platform
pub(crate) enum SharedDir {
    /// Only the documents directory exists
    Absent,
    /// Shared directory writable without a grant
    Open,
    /// Shared directory guarded by this gate
    Guarded(Arc<RecordingGate>),
}

/// What a test downloader is assembled from
pub(crate) struct TestSetup {
    pub(crate) storage: MockStorage,
    pub(crate) transfer: MockTransfer,
    pub(crate) shared: SharedDir,
    pub(crate) share_sheet: Option<Arc<MockShareSheet>>,
    pub(crate) notifiers: Vec<Arc<MockNotifier>>,
    pub(crate) transfer_timeout: Option<Duration>,
    pub(crate) notifier_timeout: Duration,
}

impl Default for TestSetup {
    fn default() -> Self {
        Self {
            storage: MockStorage::signing(),
            transfer: MockTransfer::writing(204_800),
            shared: SharedDir::Absent,
            share_sheet: None,
            notifiers: Vec::new(),
            transfer_timeout: Some(Duration::from_secs(30)),
            notifier_timeout: Duration::from_secs(2),
        }
    }
}

/// A downloader wired to mocks inside a temporary directory
pub(crate) struct TestHarness {
    pub(crate) downloader: MaterialDownloader,
    pub(crate) storage: Arc<MockStorage>,
    pub(crate) transfer: Arc<MockTransfer>,
    pub(crate) documents_dir: PathBuf,
    pub(crate) shared_dir: PathBuf,
    pub(crate) temp_dir: TempDir,
}

/// Helper to create a test MaterialDownloader from `setup`.
/// Neither directory exists until the downloader creates it.
pub(crate) fn create_test_downloader(setup: TestSetup) -> TestHarness {
    let temp_dir = tempfile::tempdir().unwrap();
    let documents_dir = temp_dir.path().join("documents");
    let shared_dir = temp_dir.path().join("Download");

    let mut config = Config::default();
    config.directories.documents_dir = documents_dir.clone();
    config.transfer.transfer_timeout = setup.transfer_timeout;
    config.notifications.notifier_timeout = setup.notifier_timeout;

    let storage = Arc::new(setup.storage);
    let transfer = Arc::new(setup.transfer);

    let mut builder = match setup.shared {
        SharedDir::Absent => MaterialDownloader::builder(config),
        SharedDir::Open => {
            config.directories.shared_downloads_dir = Some(shared_dir.clone());
            MaterialDownloader::builder(config)
        }
        SharedDir::Guarded(gate) => {
            config.directories.shared_downloads_dir = Some(shared_dir.clone());
            config.directories.shared_requires_permission = true;
            MaterialDownloader::builder(config).with_permission_gate(gate)
        }
    };

    builder = builder
        .with_storage(storage.clone())
        .with_transfer(transfer.clone());
    if let Some(sheet) = setup.share_sheet {
        builder = builder.with_share_sheet(sheet);
    }
    for notifier in setup.notifiers {
        builder = builder.with_notifier(notifier);
    }

    TestHarness {
        downloader: builder.build().unwrap(),
        storage,
        transfer,
        documents_dir,
        shared_dir,
        temp_dir,
    }
}

/// Hidden partial files left anywhere under `dir`
pub(crate) fn leftover_partials(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.') && n.ends_with(".part"))
        })
        .collect()
}
