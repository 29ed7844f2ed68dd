//! Golden test infrastructure for the odmap mapping engine
//!
//! This crate provides snapshot testing capabilities for validating
//! that built decision requests remain consistent across changes.
//!
//! A corpus case lives in `<corpus>/<category>/<name>/test.json` and names a
//! mapping, a record and build options. Its expected envelope lives in
//! `<corpus>/snapshots/<category>/<name>.json`.

pub mod corpus;
pub mod diff;
pub mod runner;
pub mod snapshot;

use std::path::PathBuf;
use thiserror::Error;

pub use corpus::{CorpusManager, TestCase};
pub use diff::{DiffEngine, DiffOptions};
pub use runner::{GoldenTestRunner, TestResult};
pub use snapshot::{Snapshot, SnapshotManager};

/// Golden test error types
#[derive(Debug, Error)]
pub enum GoldenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] odmap_core::Error),

    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    #[error("Corpus error: {0}")]
    CorpusError(String),

    #[error("Test failed: {0}")]
    TestFailed(String),
}

pub type Result<T> = std::result::Result<T, GoldenError>;

/// Configuration for golden tests
#[derive(Debug, Clone)]
pub struct GoldenConfig {
    /// Root directory for test corpus
    pub corpus_dir: PathBuf,

    /// Directory for snapshots
    pub snapshot_dir: PathBuf,

    /// Whether to update snapshots
    pub update_snapshots: bool,

    /// Whether to create missing snapshots
    pub create_missing: bool,

    /// Diff options
    pub diff_options: DiffOptions,

    /// Verbose output
    pub verbose: bool,
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl Default for GoldenConfig {
    fn default() -> Self {
        let update_snapshots = std::env::var("UPDATE_GOLDEN")
            .map(|v| flag(&v))
            .unwrap_or(false);
        let corpus_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../golden-corpus");

        Self {
            snapshot_dir: corpus_dir.join("snapshots"),
            corpus_dir,
            update_snapshots,
            create_missing: update_snapshots,
            diff_options: DiffOptions::default(),
            verbose: false,
        }
    }
}

impl GoldenConfig {
    /// Create config from environment and defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(corpus_dir) = std::env::var("GOLDEN_CORPUS_DIR") {
            config.corpus_dir = PathBuf::from(corpus_dir);
            config.snapshot_dir = config.corpus_dir.join("snapshots");
        }

        if let Ok(snapshot_dir) = std::env::var("GOLDEN_SNAPSHOT_DIR") {
            config.snapshot_dir = PathBuf::from(snapshot_dir);
        }

        if let Ok(verbose) = std::env::var("GOLDEN_VERBOSE") {
            config.verbose = flag(&verbose);
        }

        config
    }

    /// Config rooted at `corpus_dir`, never writing snapshots
    pub fn for_corpus(corpus_dir: impl Into<PathBuf>) -> Self {
        let corpus_dir = corpus_dir.into();
        Self {
            snapshot_dir: corpus_dir.join("snapshots"),
            corpus_dir,
            update_snapshots: false,
            create_missing: false,
            diff_options: DiffOptions::default(),
            verbose: false,
        }
    }
}

/// Macro for defining golden tests
#[macro_export]
macro_rules! golden_test {
    ($name:ident, $test_path:expr) => {
        #[test]
        fn $name() {
            use $crate::{GoldenConfig, GoldenTestRunner};

            let config = GoldenConfig::from_env();
            let runner = GoldenTestRunner::new(config);

            if let Err(e) = runner.run_test($test_path) {
                panic!("Golden test failed: {}: {}", $test_path, e);
            }
        }
    };
}

/// Macro for batch golden tests
#[macro_export]
macro_rules! golden_test_batch {
    ($pattern:expr) => {
        #[test]
        fn golden_tests() {
            use $crate::{GoldenConfig, GoldenTestRunner};

            let config = GoldenConfig::from_env();
            let runner = GoldenTestRunner::new(config);

            if let Err(e) = runner.run_batch($pattern) {
                panic!("Golden test batch failed: {}: {}", $pattern, e);
            }
        }
    };
}
