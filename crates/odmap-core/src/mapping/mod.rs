//! Mapping engine internals
//!
//! Resolution is organized leaf-first:
//! - `date`: date normalization to `YYYY-MM-DD`
//! - `pipeline`: the ordered transform chain for one value
//! - `resolver`: per-target resolution against a record
//! - `collections`: typed coercion into the variable collections
//! - `validator`: required-target checks
//! - `assembler`: drives the above into a request payload
//!
//! Copyright (c) 2025 odmap contributors
//! Licensed under the Apache-2.0 license

pub mod assembler;
pub mod collections;
pub mod date;
pub mod pipeline;
pub mod resolver;
pub mod validator;


pub use assembler::{Assembly, RequestAssembler};
pub use collections::TypedCollections;
pub use date::CANONICAL_DATE_FORMAT;
pub use pipeline::{TransformPipeline, TransformStep};
pub use resolver::{FieldResolver, Resolution};
pub use validator::{ProducedTargets, RequiredFieldValidator};
