//! Test corpus management for golden tests

use crate::{GoldenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name every corpus case is stored under
pub const TEST_FILE: &str = "test.json";

/// Directory under the corpus root that holds snapshots rather than cases
pub const SNAPSHOT_DIR: &str = "snapshots";

/// A test case in the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Name of the test case
    pub name: String,

    /// Category/group of the test
    pub category: String,

    /// Mapping, record and build options
    pub input: TestInput,

    /// Expected behavior configuration
    pub expectations: TestExpectations,

    /// Test metadata
    pub metadata: TestMetadata,

    /// Directory the case was loaded from; file references resolve against it
    #[serde(skip)]
    pub source_dir: Option<PathBuf>,
}

/// Input for a test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestInput {
    /// Inline mapping document, or the name of a `.json`/`.yaml` file next to `test.json`
    pub mapping: Value,

    /// The flat source record
    pub record: Value,

    /// Build options
    #[serde(default)]
    pub options: BuildSettings,
}

impl TestInput {
    /// The referenced mapping file, when the mapping is not inline
    pub fn mapping_file(&self) -> Option<&str> {
        match &self.mapping {
            Value::String(name) if is_document_file(name) => Some(name),
            _ => None,
        }
    }
}

fn is_document_file(name: &str) -> bool {
    [".json", ".yaml", ".yml"]
        .iter()
        .any(|ext| name.ends_with(ext))
}

/// Engine settings a case builds with
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Identifier the engine holds before the build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_decision_id: Option<String>,

    /// Per-build identifier override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,

    /// Per-build required-target validation override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_required: Option<bool>,
}

/// Expected behavior for a test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExpectations {
    /// Whether the build should succeed
    pub should_succeed: bool,

    /// Regex the error message must match if should_succeed is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_pattern: Option<String>,

    /// Error kind (`invalid_date`, `missing_required_fields`, ...) if should_succeed is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    /// Fields to ignore in comparison
    #[serde(default)]
    pub ignore_fields: Vec<String>,

    /// Volatile fields that may change
    #[serde(default)]
    pub volatile_fields: Vec<VolatileFieldSpec>,
}

/// Specification for a volatile field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatileFieldSpec {
    pub path: String,
    pub pattern: String,
}

/// Metadata about a test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestMetadata {
    /// Description of what this tests
    pub description: String,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether this test is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Priority level (lower = higher priority)
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u32 {
    100
}

/// Manages the test corpus
pub struct CorpusManager {
    corpus_dir: PathBuf,
}

impl CorpusManager {
    /// Create a new corpus manager
    pub fn new(corpus_dir: impl AsRef<Path>) -> Self {
        Self {
            corpus_dir: corpus_dir.as_ref().to_path_buf(),
        }
    }

    /// Discover all test cases in the corpus
    pub fn discover_tests(&self) -> Result<Vec<TestCase>> {
        let mut tests = Vec::new();

        if !self.corpus_dir.exists() {
            return Ok(tests);
        }

        for entry in WalkDir::new(&self.corpus_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if path.is_file() && path.file_name() == Some(std::ffi::OsStr::new(TEST_FILE)) {
                match self.load_test_case(path) {
                    Ok(test_case) => tests.push(test_case),
                    Err(e) => {
                        eprintln!("Warning: Failed to load test case {:?}: {}", path, e);
                    }
                }
            }
        }

        tests.sort_by(|a, b| {
            a.metadata
                .priority
                .cmp(&b.metadata.priority)
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(tests)
    }

    /// Load a specific test case
    pub fn load_test_case(&self, path: &Path) -> Result<TestCase> {
        let content = fs::read_to_string(path)?;
        let mut test_case: TestCase = serde_json::from_str(&content)?;

        let test_dir = path.parent().ok_or_else(|| {
            GoldenError::CorpusError(format!("test case {:?} has no parent directory", path))
        })?;

        if let Some(filename) = test_case.input.mapping_file() {
            let mapping_path = test_dir.join(filename);
            if !mapping_path.is_file() {
                return Err(GoldenError::CorpusError(format!(
                    "mapping file {:?} referenced by {} does not exist",
                    mapping_path, test_case.name
                )));
            }
        }

        // Inline records may also live in a sibling file
        if let Value::String(ref filename) = test_case.input.record {
            if filename.ends_with(".json") {
                let record_content = fs::read_to_string(test_dir.join(filename))?;
                test_case.input.record = serde_json::from_str(&record_content)?;
            }
        }

        test_case.source_dir = Some(test_dir.to_path_buf());
        Ok(test_case)
    }

    /// Filter tests by category
    pub fn filter_by_category(&self, tests: Vec<TestCase>, category: &str) -> Vec<TestCase> {
        tests
            .into_iter()
            .filter(|t| t.category == category || category == "*")
            .collect()
    }

    /// Filter tests by tags
    pub fn filter_by_tags(&self, tests: Vec<TestCase>, tags: &[String]) -> Vec<TestCase> {
        if tags.is_empty() {
            return tests;
        }

        tests
            .into_iter()
            .filter(|t| tags.iter().any(|tag| t.metadata.tags.contains(tag)))
            .collect()
    }

    /// Get enabled tests only
    pub fn filter_enabled(&self, tests: Vec<TestCase>) -> Vec<TestCase> {
        tests.into_iter().filter(|t| t.metadata.enabled).collect()
    }

    /// Create the corpus directory structure with one sample case
    pub fn init_corpus(&self) -> Result<()> {
        for dir in ["basic", "transforms", "constants", "errors", SNAPSHOT_DIR] {
            fs::create_dir_all(self.corpus_dir.join(dir))?;
        }

        self.create_sample_test()
    }

    fn create_sample_test(&self) -> Result<()> {
        let test_dir = self.corpus_dir.join("basic/sample");
        fs::create_dir_all(&test_dir)?;

        let test_case = TestCase {
            name: "sample".to_string(),
            category: "basic".to_string(),
            input: TestInput {
                mapping: serde_json::json!({
                    "co_fields": {
                        "customerType": {"from": "tipo_cliente", "map_from": {"P": "PARTICULAR"}}
                    },
                    "required_odm": ["customerType"]
                }),
                record: serde_json::json!({"tipo_cliente": "P"}),
                options: BuildSettings::default(),
            },
            expectations: TestExpectations {
                should_succeed: true,
                error_pattern: None,
                error_kind: None,
                ignore_fields: vec![],
                volatile_fields: vec![VolatileFieldSpec {
                    path: "__DecisionID__".to_string(),
                    pattern: r"^Decision_[0-9a-f]{12}$".to_string(),
                }],
            },
            metadata: TestMetadata {
                description: "Single substituted scalar with a generated identifier".to_string(),
                tags: vec!["basic".to_string(), "smoke".to_string()],
                enabled: true,
                priority: 1,
            },
            source_dir: None,
        };

        let content = serde_json::to_string_pretty(&test_case)?;
        fs::write(test_dir.join(TEST_FILE), content)?;

        Ok(())
    }

    /// List all test categories
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let mut categories = Vec::new();

        if !self.corpus_dir.exists() {
            return Ok(categories);
        }

        for entry in fs::read_dir(&self.corpus_dir)? {
            let path = entry?.path();

            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    if name != SNAPSHOT_DIR {
                        categories.push(name.to_string());
                    }
                }
            }
        }

        categories.sort();
        Ok(categories)
    }

    /// Count cases per category
    pub fn count_by_category(&self) -> Result<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for test in self.discover_tests()? {
            *counts.entry(test.category).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
