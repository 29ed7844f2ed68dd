//! Diff engine for comparing decision envelopes

use crate::snapshot::normalize_json;
use crate::{GoldenError, Result};
use colored::*;
use regex::Regex;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

/// Placeholder written over volatile values before comparison
pub const MASK: &str = "***MASKED***";

/// Options for diff comparison
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Whether to use colored output
    pub colored: bool,

    /// Unchanged lines shown around each change
    pub context_lines: usize,

    /// Whether to normalize JSON before comparison
    pub normalize: bool,

    /// Whether object key order must match
    pub ordered_keys: bool,

    /// Tolerance for floating point comparison
    pub float_tolerance: f64,

    /// Maximum diff lines to show (0 = unlimited)
    pub max_diff_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            colored: true,
            context_lines: 3,
            normalize: true,
            ordered_keys: true,
            float_tolerance: 1e-6,
            max_diff_lines: 100,
        }
    }
}

/// Result of a diff operation
#[derive(Debug)]
pub struct DiffResult {
    /// Whether the values match
    pub matches: bool,

    /// Human-readable diff output
    pub diff_output: String,

    /// Summary of changes
    pub summary: DiffSummary,
}

/// Summary of diff changes
#[derive(Debug, Default)]
pub struct DiffSummary {
    /// Number of added lines
    pub added: usize,

    /// Number of removed lines
    pub removed: usize,

    /// Paths that differ
    pub differing_paths: Vec<String>,
}

/// Engine for comparing JSON values
pub struct DiffEngine {
    options: DiffOptions,
    volatile_patterns: Vec<(Vec<String>, Regex)>,
}

impl DiffEngine {
    /// Create a new diff engine
    pub fn new(options: DiffOptions) -> Self {
        Self {
            options,
            volatile_patterns: Vec::new(),
        }
    }

    /// Add a volatile field pattern
    ///
    /// `path` is dot separated; arrays along the path apply to every element.
    pub fn add_volatile_pattern(&mut self, path: &str, pattern: &str) -> Result<()> {
        let regex = Regex::new(pattern)
            .map_err(|e| GoldenError::CorpusError(format!("Invalid regex pattern: {}", e)))?;
        let parts = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        self.volatile_patterns.push((parts, regex));
        Ok(())
    }

    /// Compare two JSON values
    pub fn compare(&self, expected: &Value, actual: &Value) -> DiffResult {
        let (expected, actual) = if self.options.normalize {
            let sort_keys = !self.options.ordered_keys;
            (normalize_json(expected, sort_keys), normalize_json(actual, sort_keys))
        } else {
            (expected.clone(), actual.clone())
        };

        let expected = self.mask_volatile_fields(&expected);
        let actual = self.mask_volatile_fields(&actual);

        if self.values_match(&expected, &actual) {
            return DiffResult {
                matches: true,
                diff_output: String::new(),
                summary: DiffSummary::default(),
            };
        }

        let expected_text = pretty(&expected);
        let actual_text = pretty(&actual);
        let mut summary = DiffSummary::default();
        collect_diff_paths(self, &expected, &actual, String::new(), &mut summary.differing_paths);
        for change in TextDiff::from_lines(&expected_text, &actual_text).iter_all_changes() {
            match change.tag() {
                ChangeTag::Delete => summary.removed += 1,
                ChangeTag::Insert => summary.added += 1,
                ChangeTag::Equal => {}
            }
        }

        DiffResult {
            matches: false,
            diff_output: self.render_diff(&expected_text, &actual_text),
            summary,
        }
    }

    /// Check if two values match structurally
    pub fn values_match(&self, expected: &Value, actual: &Value) -> bool {
        match (expected, actual) {
            (Value::Object(exp), Value::Object(act)) => {
                if exp.len() != act.len() {
                    return false;
                }
                if self.options.ordered_keys && !exp.keys().eq(act.keys()) {
                    return false;
                }
                exp.iter().all(|(key, exp_val)| {
                    act.get(key)
                        .is_some_and(|act_val| self.values_match(exp_val, act_val))
                })
            }
            (Value::Array(exp), Value::Array(act)) => {
                exp.len() == act.len()
                    && exp
                        .iter()
                        .zip(act.iter())
                        .all(|(e, a)| self.values_match(e, a))
            }
            (Value::Number(exp), Value::Number(act)) => {
                // An integer never matches a float of the same magnitude
                if exp.is_f64() != act.is_f64() {
                    return false;
                }
                match (exp.as_f64(), act.as_f64()) {
                    (Some(e), Some(a)) if exp.is_f64() => (e - a).abs() <= self.options.float_tolerance,
                    _ => exp == act,
                }
            }
            (exp, act) => exp == act,
        }
    }

    fn render_diff(&self, expected: &str, actual: &str) -> String {
        let text_diff = TextDiff::from_lines(expected, actual);
        let mut output = String::new();

        let header = "=== Diff Output (- expected, + actual) ===\n";
        if self.options.colored {
            output.push_str(&header.bold().to_string());
        } else {
            output.push_str(header);
        }

        let mut line_count = 0;
        for group in text_diff.grouped_ops(self.options.context_lines) {
            for op in group {
                for change in text_diff.iter_changes(&op) {
                    if self.options.max_diff_lines > 0 && line_count >= self.options.max_diff_lines {
                        output.push_str("... (diff truncated) ...\n");
                        return output;
                    }

                    let line = match (change.tag(), self.options.colored) {
                        (ChangeTag::Delete, true) => format!("-{}", change).red().to_string(),
                        (ChangeTag::Insert, true) => format!("+{}", change).green().to_string(),
                        (ChangeTag::Delete, false) => format!("-{}", change),
                        (ChangeTag::Insert, false) => format!("+{}", change),
                        (ChangeTag::Equal, _) => format!(" {}", change),
                    };
                    output.push_str(&line);
                    line_count += 1;
                }
            }
        }

        output
    }

    fn mask_volatile_fields(&self, value: &Value) -> Value {
        let mut masked = value.clone();
        for (parts, pattern) in &self.volatile_patterns {
            mask_field_recursive(&mut masked, parts, pattern);
        }
        masked
    }

    /// Create a simple text diff for error messages
    pub fn simple_diff(&self, expected: &str, actual: &str) -> String {
        let diff = TextDiff::from_lines(expected, actual);
        let mut output = String::new();

        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            output.push_str(&format!("{}{}", sign, change));
        }

        output
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn collect_diff_paths(
    engine: &DiffEngine,
    expected: &Value,
    actual: &Value,
    path: String,
    paths: &mut Vec<String>,
) {
    let child = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", path, key)
        }
    };

    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => {
            for (key, exp_val) in exp {
                match act.get(key) {
                    Some(act_val) if !engine.values_match(exp_val, act_val) => {
                        collect_diff_paths(engine, exp_val, act_val, child(key), paths)
                    }
                    Some(_) => {}
                    None => paths.push(format!("{} (missing in actual)", child(key))),
                }
            }
            for key in act.keys().filter(|key| !exp.contains_key(*key)) {
                paths.push(format!("{} (extra in actual)", child(key)));
            }
            if engine.options.ordered_keys
                && exp.len() == act.len()
                && exp.keys().all(|key| act.contains_key(key))
                && !exp.keys().eq(act.keys())
            {
                paths.push(format!("{} (key order differs)", if path.is_empty() { "$" } else { &path }));
            }
        }
        (Value::Array(exp), Value::Array(act)) => {
            for (i, (exp_val, act_val)) in exp.iter().zip(act.iter()).enumerate() {
                if !engine.values_match(exp_val, act_val) {
                    collect_diff_paths(engine, exp_val, act_val, format!("{}[{}]", path, i), paths);
                }
            }
            if exp.len() != act.len() {
                paths.push(format!(
                    "{} (array length mismatch: {} vs {})",
                    path,
                    exp.len(),
                    act.len()
                ));
            }
        }
        _ => {
            if !engine.values_match(expected, actual) {
                paths.push(path);
            }
        }
    }
}

fn mask_field_recursive(value: &mut Value, path_parts: &[String], pattern: &Regex) {
    let Some((first, rest)) = path_parts.split_first() else {
        return;
    };

    match value {
        Value::Object(map) => match map.get_mut(first.as_str()) {
            Some(field) if rest.is_empty() => {
                if field.as_str().is_some_and(|s| pattern.is_match(s)) {
                    *field = Value::String(MASK.to_string());
                }
            }
            Some(next) => mask_field_recursive(next, rest, pattern),
            None => {}
        },
        Value::Array(arr) => {
            for item in arr {
                mask_field_recursive(item, path_parts, pattern);
            }
        }
        _ => {}
    }
}
