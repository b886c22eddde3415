//! Test backend and downloader construction

use material_dl::{Config, MaterialDownloader};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// API key the mock backend expects
pub const API_KEY: &str = "anon-key";

/// A mock backend plus the directories a downloader writes into
pub struct TestBackend {
    pub server: MockServer,
    pub temp_dir: TempDir,
    pub documents_dir: PathBuf,
    pub shared_dir: PathBuf,
}

impl TestBackend {
    /// Start a mock server; no routes are mounted yet
    pub async fn start() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let documents_dir = temp_dir.path().join("documents");
        let shared_dir = temp_dir.path().join("Download");
        Self {
            server: MockServer::start().await,
            temp_dir,
            documents_dir,
            shared_dir,
        }
    }

    /// Configuration pointing at the mock server
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.storage.base_url = self.server.uri();
        config.storage.api_key = API_KEY.to_string();
        config.directories.documents_dir = self.documents_dir.clone();
        config.transfer.transfer_timeout = Some(Duration::from_secs(30));
        config.transfer.write_buffer_size = 8 * 1024;
        config.transfer.progress_interval_bytes = 8 * 1024;
        config.notifications.notifier_timeout = Duration::from_secs(5);
        config
    }

    /// Downloader built from [`config`](Self::config) with default collaborators
    pub fn downloader(&self) -> MaterialDownloader {
        MaterialDownloader::new(self.config()).unwrap()
    }
}
