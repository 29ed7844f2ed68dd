//! Required-target validation

use crate::{Error, Result};
use std::collections::BTreeSet;

/// Names of the targets a build produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducedTargets {
    names: BTreeSet<String>,
}

impl ProducedTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Produced names in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ProducedTargets {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Checks produced targets against the required list
#[derive(Debug, Clone, Copy)]
pub struct RequiredFieldValidator<'a> {
    required: &'a [String],
    enabled: bool,
}

impl<'a> RequiredFieldValidator<'a> {
    pub fn new(required: &'a [String]) -> Self {
        Self {
            required,
            enabled: true,
        }
    }

    /// Turn enforcement on or off
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Required names that were not produced, sorted
    pub fn missing(&self, produced: &ProducedTargets) -> Vec<String> {
        let missing: BTreeSet<&str> = self
            .required
            .iter()
            .map(String::as_str)
            .filter(|name| !produced.contains(name))
            .collect();
        missing.into_iter().map(str::to_string).collect()
    }

    /// Fail with the full missing list when enforcement is on
    pub fn check(&self, produced: &ProducedTargets) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let missing = self.missing(produced);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingRequiredFields { missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_all_produced() {
        let required = required(&["customerType", "loanAmount"]);
        let produced: ProducedTargets = ["loanAmount", "customerType", "extra"].into_iter().collect();
        assert!(RequiredFieldValidator::new(&required).check(&produced).is_ok());
    }

    #[test]
    fn test_missing_names_are_sorted_and_complete() {
        let required = required(&["termMonths", "customerType", "loanAmount"]);
        let produced: ProducedTargets = ["customerType"].into_iter().collect();

        let err = RequiredFieldValidator::new(&required).check(&produced).unwrap_err();
        match err {
            Error::MissingRequiredFields { missing } => {
                assert_eq!(missing, vec!["loanAmount", "termMonths"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_disabled_validation() {
        let required = required(&["loanAmount"]);
        let validator = RequiredFieldValidator::new(&required).enabled(false);
        assert!(validator.check(&ProducedTargets::new()).is_ok());
        assert_eq!(validator.missing(&ProducedTargets::new()), vec!["loanAmount"]);
    }
}
