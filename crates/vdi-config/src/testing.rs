//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - An isolated audit log directory
//! - An isolated download cache directory
//! - A `Config` pointing at both, without touching the process environment
//!
//! # Usage
//!
//! ```ignore
//! use vdi_config::testing::TestEnvironment;
//!
//! let env = TestEnvironment::new().unwrap();
//! let config = env.config();
//! // config.log.dir / config.fetch.download_base live under a temp dir
//! ```

use crate::{Config, LogConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with unique paths
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Root of the temporary tree
    pub root: PathBuf,
    /// Audit log directory (not created up front)
    pub log_dir: PathBuf,
    /// Download cache directory (not created up front)
    pub download_dir: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().to_path_buf();

        Ok(Self {
            log_dir: root.join(format!("logs-{}", test_id)),
            download_dir: root.join(format!("downloads-{}", test_id)),
            root,
            _temp_dir: temp_dir,
            test_id,
        })
    }

    /// Config whose log and download paths point into this environment.
    pub fn config(&self) -> Config {
        let mut cfg = Config::default();
        cfg.log = LogConfig {
            dir: self.log_dir.to_string_lossy().into_owned(),
            file_prefix: "t.".to_string(),
            ..LogConfig::default()
        };
        cfg.fetch.download_base = Some(self.download_dir.to_string_lossy().into_owned());
        cfg
    }

    /// Log file the config above produces for `pid`.
    pub fn log_file(&self, pid: i32) -> PathBuf {
        self.log_dir.join(format!("t.{}", pid))
    }

    /// Environment variables equivalent to `config()`, for spawning a
    /// process with the preload library.
    pub fn layer_env(&self) -> Vec<(String, String)> {
        vec![
            (
                crate::ENV_LOG_DIR.to_string(),
                self.log_dir.to_string_lossy().into_owned(),
            ),
            (crate::ENV_LOG_FILE_PREFIX.to_string(), "t.".to_string()),
            (
                crate::ENV_DOWNLOAD_BASE.to_string(),
                self.download_dir.to_string_lossy().into_owned(),
            ),
        ]
    }

    /// Lines of the log file for `pid`, empty when it does not exist.
    pub fn log_lines(&self, pid: i32) -> Vec<String> {
        std::fs::read_to_string(self.log_file(pid))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Create a test file with content
    pub fn create_file(&self, relative_path: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }
}
