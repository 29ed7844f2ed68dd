//! odmap Core - Spec-driven mapping of flat records into decision requests
//!
//! This crate turns a flat, loosely typed record from an external system into
//! the typed request envelope a rules-evaluation service expects. What goes
//! where is described by a declarative mapping document.
//!
//! # Main Components
//!
//! - **Error Handling**: One error enum built on `thiserror` and `anyhow`
//! - **Values**: Dynamic [`Value`]s and flat input [`Record`]s
//! - **Specifications**: Parsed mapping documents, JSON or YAML
//! - **Mapping**: Transform pipeline, resolution, typed coercion and validation
//! - **Engine**: Identifier handling, the last built request and serialization
//!
//! # Example
//!
//! ```
//! use odmap_core::{DecisionEngine, Record, load_specification};
//!
//! fn example() -> odmap_core::Result<()> {
//!     let spec = load_specification(r#"{
//!         "variables": {
//!             "date": {"decisionDate": {"from": "fecha", "date_in": "%d/%m/%Y"}},
//!             "double": {"fee": {"from": "comision", "scale": 0.01}}
//!         },
//!         "required_odm": ["decisionDate"]
//!     }"#)?;
//!
//!     let record = Record::new()
//!         .with("fecha", "15/08/2023")
//!         .with("comision", "100");
//!
//!     let mut engine = DecisionEngine::new(spec);
//!     let request = engine.build(&record)?;
//!     assert_eq!(request.date_variable("decisionDate"), Some("2023-08-15"));
//!     assert_eq!(request.double_variable("fee"), Some(1.0));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod specification;
pub mod types;
pub mod value;

#[cfg(test)]
mod proptest_strategies;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use engine::{generate_decision_id, serialize, BuildOptions, DecisionEngine};
pub use error::{Error, ErrorKind, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use mapping::{
    FieldResolver, RequestAssembler, RequiredFieldValidator, Resolution, TransformPipeline,
    TypedCollections,
};
pub use specification::{
    load_specification, load_specification_as, DocumentFormat, FieldRule, MappingSpecification,
    Rule,
};
pub use types::{CoRequest, DecisionRequest, NamedValue, VariableKind};
pub use value::{Record, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
