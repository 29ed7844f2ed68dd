//! Property-based testing strategies for generating test data
//!
//! This module provides proptest strategies for generating random
//! but valid values, records and rules for property testing.

#![cfg(test)]

use crate::specification::FieldRule;
use crate::{Record, Value};
use chrono::NaiveDate;
use proptest::collection::{btree_map, vec};
use proptest::option;
use proptest::prelude::*;

/// Strategy for generating calendar dates
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1900i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

/// Strategy for generating scalar record values
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000_000i64..1_000_000).prop_map(Value::Integer),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[A-Za-z0-9 ,;.]{0,24}".prop_map(Value::String),
    ]
}

/// Strategy for generating flat records over a small key space
pub fn record_strategy() -> impl Strategy<Value = Record> {
    btree_map("[a-e]", scalar_value_strategy(), 0..5)
        .prop_map(|fields| fields.into_iter().collect::<Record>())
}

/// Strategy for generating rules that cannot fail in the pipeline
pub fn infallible_rule_strategy() -> impl Strategy<Value = FieldRule> {
    (
        option::of("[a-e]"),                          // from
        option::of(scalar_value_strategy()),          // default
        option::of(vec(("[A-Za-z]{1,3}", "[A-Z]{1,6}"), 0..3)), // substitution
        any::<bool>(),                                // split list
        (any::<bool>(), any::<bool>(), any::<bool>()), // strip, upper, lower
        option::of(0.001f64..1000.0),                 // scale
    )
        .prop_map(|(from, default, substitution, split, (strip, upper, lower), scale)| {
            let mut rule = FieldRule {
                from,
                default,
                split_list: split,
                strip,
                upper,
                lower,
                scale,
                ..FieldRule::default()
            };
            for (key, value) in substitution.into_iter().flatten() {
                rule = rule.with_substitution(key, value);
            }
            rule
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{date, TransformPipeline};

    proptest! {
        #[test]
        fn prop_formatted_dates_normalize_to_iso(date in date_strategy()) {
            let text = date.format("%d/%m/%Y").to_string();
            let normalized = date::normalize(&Value::from(text), Some("%d/%m/%Y")).unwrap();
            prop_assert_eq!(normalized, Some(date.format("%Y-%m-%d").to_string()));
        }

        #[test]
        fn prop_canonical_dates_are_fixed_points(date in date_strategy()) {
            let canonical = date.format("%Y-%m-%d").to_string();
            let normalized = date::normalize(&Value::from(canonical.clone()), None).unwrap();
            prop_assert_eq!(normalized, Some(canonical));
        }

        #[test]
        fn prop_pipeline_is_deterministic(rule in infallible_rule_strategy(), value in scalar_value_strategy()) {
            let pipeline = TransformPipeline::new(&rule);
            let first = pipeline.apply(value.clone()).unwrap();
            let second = pipeline.apply(value).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_split_tokens_are_trimmed_and_non_empty(text in "[a-z ,;]{0,40}") {
            let rule = FieldRule::from_key("x").with_split_list();
            match TransformPipeline::new(&rule).apply(Value::from(text)).unwrap() {
                Value::List(items) => {
                    for item in items {
                        let token = item.as_str().unwrap_or_default().to_string();
                        prop_assert!(!token.is_empty());
                        prop_assert_eq!(token.trim(), token.as_str());
                    }
                }
                other => prop_assert!(false, "expected a list, got {:?}", other),
            }
        }
    }
}
