//! Golden test runner for executing snapshot tests

use crate::{
    corpus::{CorpusManager, TestCase, TEST_FILE},
    diff::DiffEngine,
    snapshot::{apply_ignores, SnapshotManager},
    GoldenConfig, GoldenError, Result,
};
use colored::*;
use odmap_core::{
    init_logging, BuildOptions, DecisionEngine, DocumentFormat, LoggingConfig, MappingSpecification,
    Record,
};
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::time::Instant;

/// Result of running a golden test
#[derive(Debug)]
pub struct TestResult {
    /// Name of the test, `<category>/<case>`
    pub name: String,

    /// Whether the test passed
    pub passed: bool,

    /// Error message if failed
    pub error: Option<String>,

    /// Diff output if comparison failed
    pub diff: Option<String>,

    /// Execution time in milliseconds
    pub duration_ms: u64,

    /// Whether snapshot was written
    pub updated: bool,
}

impl TestResult {
    /// Print the test result
    pub fn print(&self, verbose: bool) {
        let status = if self.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };

        println!("{} {} ({}ms)", status, self.name, self.duration_ms);

        if let Some(ref error) = self.error {
            println!("  {}: {}", "Error".red(), error);
        }

        if verbose || !self.passed {
            if let Some(ref diff) = self.diff {
                println!("{}", diff);
            }
        }

        if self.updated {
            println!("  {}", "Snapshot updated".yellow());
        }
    }
}

/// What executing one case produced
struct Execution {
    passed: bool,
    failure: Option<String>,
    diff: Option<String>,
    updated: bool,
}

impl Execution {
    fn pass() -> Self {
        Self {
            passed: true,
            failure: None,
            diff: None,
            updated: false,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            failure: Some(reason.into()),
            diff: None,
            updated: false,
        }
    }
}

/// Runner for golden tests
pub struct GoldenTestRunner {
    config: GoldenConfig,
    corpus_manager: CorpusManager,
    snapshot_manager: SnapshotManager,
}

impl GoldenTestRunner {
    /// Create a new test runner
    ///
    /// A verbose runner also installs debug-level engine logging.
    pub fn new(config: GoldenConfig) -> Self {
        if config.verbose {
            // fails only when an earlier runner already installed it
            let _ = init_logging(&LoggingConfig::from_verbosity(2));
        }

        let corpus_manager = CorpusManager::new(&config.corpus_dir);
        let snapshot_manager = SnapshotManager::new(&config.snapshot_dir);

        Self {
            config,
            corpus_manager,
            snapshot_manager,
        }
    }

    /// Run a single test by `<category>/<case>` name
    pub fn run_test(&self, test_name: &str) -> Result<TestResult> {
        let start = Instant::now();

        let test_path = self.config.corpus_dir.join(test_name).join(TEST_FILE);
        let test_case = self.corpus_manager.load_test_case(&test_path)?;

        let result = self.execute_test(&test_case);
        let duration_ms = start.elapsed().as_millis() as u64;

        let test_result = match result {
            Ok(execution) => TestResult {
                name: test_name.to_string(),
                passed: execution.passed,
                error: execution.failure,
                diff: execution.diff,
                duration_ms,
                updated: execution.updated,
            },
            Err(e) => TestResult {
                name: test_name.to_string(),
                passed: false,
                error: Some(e.to_string()),
                diff: None,
                duration_ms,
                updated: false,
            },
        };

        if self.config.verbose {
            test_result.print(true);
        }

        if test_result.passed {
            return Ok(test_result);
        }

        let mut message = format!(
            "Test '{}' failed: {}",
            test_name,
            test_result.error.as_deref().unwrap_or("Unknown error")
        );
        if let Some(ref diff) = test_result.diff {
            message.push('\n');
            message.push_str(diff);
        }
        Err(GoldenError::TestFailed(message))
    }

    /// Run every case whose name or category contains `pattern` (`*` for all)
    pub fn run_batch(&self, pattern: &str) -> Result<Vec<TestResult>> {
        let tests = self.corpus_manager.discover_tests()?;

        let filtered_tests: Vec<_> = if pattern == "*" {
            tests
        } else {
            tests
                .into_iter()
                .filter(|t| t.name.contains(pattern) || t.category.contains(pattern))
                .collect()
        };

        if filtered_tests.is_empty() {
            return Err(GoldenError::CorpusError(format!(
                "No tests found matching pattern '{}'",
                pattern
            )));
        }

        println!("Running {} tests...\n", filtered_tests.len());

        let mut results = Vec::with_capacity(filtered_tests.len());
        let mut failed = 0;

        for test_case in filtered_tests {
            let test_name = format!("{}/{}", test_case.category, test_case.name);
            let result = self.run_test(&test_name).unwrap_or_else(|e| TestResult {
                name: test_name.clone(),
                passed: false,
                error: Some(e.to_string()),
                diff: None,
                duration_ms: 0,
                updated: false,
            });

            if !result.passed {
                failed += 1;
            }

            result.print(self.config.verbose);
            results.push(result);
        }

        println!("\n{}", "=== Test Summary ===".bold());
        println!(
            "{}: {} passed, {} failed",
            "Results".bold(),
            (results.len() - failed).to_string().green(),
            failed.to_string().red()
        );

        if failed > 0 {
            Err(GoldenError::TestFailed(format!("{} test(s) failed", failed)))
        } else {
            Ok(results)
        }
    }

    fn execute_test(&self, test_case: &TestCase) -> Result<Execution> {
        if !test_case.metadata.enabled {
            return Ok(Execution::pass());
        }

        let outcome = self.build_request(test_case);
        let expectations = &test_case.expectations;

        if !expectations.should_succeed {
            return match outcome {
                Ok(_) => Ok(Execution::fail("expected the build to fail, but it succeeded")),
                Err(error) => check_expected_error(test_case, &error),
            };
        }

        let actual = match outcome {
            Ok(actual) => actual,
            Err(error) => return Ok(Execution::fail(format!("build failed: {}", error))),
        };

        let snapshot_name = format!("{}/{}", test_case.category, test_case.name);

        if !self.snapshot_manager.exists(&snapshot_name) {
            if self.config.create_missing || self.config.update_snapshots {
                self.snapshot_manager.create(
                    &snapshot_name,
                    actual,
                    Some(test_case.metadata.description.clone()),
                    test_case.metadata.tags.clone(),
                )?;
                return Ok(Execution {
                    updated: true,
                    ..Execution::pass()
                });
            }
            return Err(GoldenError::SnapshotMismatch(format!(
                "Snapshot '{}' does not exist. Run with UPDATE_GOLDEN=1 to create it.",
                snapshot_name
            )));
        }

        let snapshot = self.snapshot_manager.load(&snapshot_name)?;

        let mut diff_engine = DiffEngine::new(self.config.diff_options.clone());
        for volatile in &expectations.volatile_fields {
            diff_engine.add_volatile_pattern(&volatile.path, &volatile.pattern)?;
        }

        let mut expected = snapshot.content;
        let mut compared = actual.clone();
        apply_ignores(&mut expected, &expectations.ignore_fields);
        apply_ignores(&mut compared, &expectations.ignore_fields);

        let diff_result = diff_engine.compare(&expected, &compared);

        if diff_result.matches {
            Ok(Execution::pass())
        } else if self.config.update_snapshots {
            self.snapshot_manager.update(&snapshot_name, actual)?;
            Ok(Execution {
                diff: Some(diff_result.diff_output),
                updated: true,
                ..Execution::pass()
            })
        } else {
            Ok(Execution {
                diff: Some(diff_result.diff_output),
                ..Execution::fail(format!(
                    "Snapshot mismatch at {}",
                    diff_result.summary.differing_paths.join(", ")
                ))
            })
        }
    }

    /// Build the case's decision request and return it as JSON
    fn build_request(&self, test_case: &TestCase) -> odmap_core::Result<Value> {
        let input = &test_case.input;

        let specification = match input.mapping_file() {
            Some(filename) => {
                let base = test_case
                    .source_dir
                    .as_deref()
                    .unwrap_or(self.config.corpus_dir.as_path());
                let path = base.join(filename);
                let format = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(DocumentFormat::from_extension)
                    .unwrap_or(DocumentFormat::Json);
                MappingSpecification::parse(&fs::read_to_string(&path)?, format)?
            }
            None => MappingSpecification::from_value(input.mapping.clone())?,
        };

        let record = Record::from_json(input.record.clone())?;

        let mut engine = DecisionEngine::new(specification);
        if let Some(ref initial) = input.options.initial_decision_id {
            engine = engine.with_decision_id(initial.clone());
        }

        let mut options = BuildOptions::new();
        if let Some(ref decision_id) = input.options.decision_id {
            options = options.decision_id(decision_id.clone());
        }
        if let Some(validate) = input.options.validate_required {
            options = options.validate_required(validate);
        }

        engine.build_with(&record, options)?.to_json_value()
    }

    /// Initialize the corpus with a sample test
    pub fn init_corpus(&self) -> Result<()> {
        self.corpus_manager.init_corpus()
    }

    /// List all available tests
    pub fn list_tests(&self) -> Result<Vec<String>> {
        let tests = self.corpus_manager.discover_tests()?;
        Ok(tests
            .into_iter()
            .map(|t| format!("{}/{}", t.category, t.name))
            .collect())
    }
}

fn check_expected_error(test_case: &TestCase, error: &odmap_core::Error) -> Result<Execution> {
    let expectations = &test_case.expectations;

    if let Some(ref kind) = expectations.error_kind {
        let actual_kind = error.kind().to_string();
        if &actual_kind != kind {
            return Ok(Execution::fail(format!(
                "expected a {} error, got {}: {}",
                kind, actual_kind, error
            )));
        }
    }

    if let Some(ref pattern) = expectations.error_pattern {
        let regex = Regex::new(pattern)
            .map_err(|e| GoldenError::CorpusError(format!("Invalid error pattern: {}", e)))?;
        let message = error.to_string();
        if !regex.is_match(&message) {
            return Ok(Execution::fail(format!(
                "error '{}' does not match pattern '{}'",
                message, pattern
            )));
        }
    }

    Ok(Execution::pass())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{BuildSettings, TestExpectations, TestInput, TestMetadata};
    use crate::DiffOptions;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    fn config_for(dir: &Path, update: bool) -> GoldenConfig {
        GoldenConfig {
            corpus_dir: dir.to_path_buf(),
            snapshot_dir: dir.join("snapshots"),
            update_snapshots: update,
            create_missing: update,
            diff_options: DiffOptions {
                colored: false,
                ..Default::default()
            },
            verbose: false,
        }
    }

    fn write_case(dir: &Path, case: &TestCase) {
        let case_dir = dir.join(&case.category).join(&case.name);
        fs::create_dir_all(&case_dir).unwrap();
        fs::write(case_dir.join(TEST_FILE), serde_json::to_string_pretty(case).unwrap()).unwrap();
    }

    fn customer_case() -> TestCase {
        TestCase {
            name: "customer".to_string(),
            category: "basic".to_string(),
            input: TestInput {
                mapping: json!({
                    "co_fields": {"customerType": {"from": "tipo_cliente", "map_from": {"P": "PARTICULAR"}}},
                    "required_odm": ["customerType"]
                }),
                record: json!({"tipo_cliente": "P"}),
                options: BuildSettings {
                    decision_id: Some("Decision_000000000001".to_string()),
                    ..Default::default()
                },
            },
            expectations: TestExpectations {
                should_succeed: true,
                error_pattern: None,
                error_kind: None,
                ignore_fields: vec![],
                volatile_fields: vec![],
            },
            metadata: TestMetadata {
                description: "customer type".to_string(),
                tags: vec![],
                enabled: true,
                priority: 1,
            },
            source_dir: None,
        }
    }

    #[test]
    fn test_runner_creation() {
        let temp_dir = TempDir::new().unwrap();
        let runner = GoldenTestRunner::new(config_for(temp_dir.path(), false));
        runner.init_corpus().unwrap();

        let tests = runner.list_tests().unwrap();
        assert_eq!(tests, vec!["basic/sample"]);
    }

    #[test]
    fn test_missing_snapshot_is_created_then_matched() {
        let temp_dir = TempDir::new().unwrap();
        write_case(temp_dir.path(), &customer_case());

        let missing = GoldenTestRunner::new(config_for(temp_dir.path(), false));
        assert!(missing.run_test("basic/customer").is_err());

        let creating = GoldenTestRunner::new(config_for(temp_dir.path(), true));
        assert!(creating.run_test("basic/customer").unwrap().updated);

        let snapshot = SnapshotManager::new(temp_dir.path().join("snapshots"))
            .load("basic/customer")
            .unwrap();
        assert_eq!(
            snapshot.content,
            json!({
                "__DecisionID__": "Decision_000000000001",
                "coRequest": {"customerType": "PARTICULAR"}
            })
        );

        let result = missing.run_test("basic/customer").unwrap();
        assert!(result.passed);
        assert!(!result.updated);
    }

    #[test]
    fn test_snapshot_mismatch_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        write_case(temp_dir.path(), &customer_case());
        SnapshotManager::new(temp_dir.path().join("snapshots"))
            .create(
                "basic/customer",
                json!({
                    "__DecisionID__": "Decision_000000000001",
                    "coRequest": {"customerType": "P"}
                }),
                None,
                vec![],
            )
            .unwrap();

        let runner = GoldenTestRunner::new(config_for(temp_dir.path(), false));
        let err = runner.run_test("basic/customer").unwrap_err().to_string();
        assert!(err.contains("coRequest.customerType"), "{}", err);
    }

    #[test]
    fn test_expected_failure_matches_kind_and_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let mut case = customer_case();
        case.category = "errors".to_string();
        case.input.record = json!({"otro": "x"});
        case.expectations.should_succeed = false;
        case.expectations.error_kind = Some("missing_required_fields".to_string());
        case.expectations.error_pattern = Some("^Missing required targets: customerType$".to_string());
        write_case(temp_dir.path(), &case);

        let runner = GoldenTestRunner::new(config_for(temp_dir.path(), false));
        assert!(runner.run_test("errors/customer").unwrap().passed);

        case.expectations.error_kind = Some("invalid_date".to_string());
        write_case(temp_dir.path(), &case);
        assert!(runner.run_test("errors/customer").is_err());
    }

    #[test]
    fn test_unexpected_success_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut case = customer_case();
        case.expectations.should_succeed = false;
        write_case(temp_dir.path(), &case);

        let runner = GoldenTestRunner::new(config_for(temp_dir.path(), false));
        let err = runner.run_test("basic/customer").unwrap_err().to_string();
        assert!(err.contains("expected the build to fail"));
    }
}
