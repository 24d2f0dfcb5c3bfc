//! # Mailpress - Deterministic Email HTML Normalizer
//!
//! Takes exported newsletter HTML and rewrites it into a deterministic,
//! mail-client-safe form: repaired structure and text, inlined CSS,
//! anonymized generated ids and a fixed set of compatibility fixes,
//! serialized with stable formatting.
//!
//! ## Architecture
//!
//! - **engine**: Pipeline orchestrating the transformation stages
//! - **dom**: Owned document tree, HTML parsing, selector-driven walks
//! - **css**: Stylesheet extraction, selector matching, style inlining
//! - **transform**: Structure, text, preheader, anonymization and
//!   compatibility passes
//! - **format**: Deterministic serializer
//! - **audit**: Heuristic mail-client compatibility scoring
//! - **utils**: Shared error types

pub mod audit;
pub mod css;
pub mod dom;
pub mod engine;
pub mod format;
pub mod transform;
pub mod utils;

// Re-export main types for convenience
pub use engine::{EmitReport, Emitter, FileEmitter, Pipeline, PipelineConfig};
pub use utils::error::{MailpressError, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "Mailpress";
