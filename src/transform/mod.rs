//! Tree-mutating pipeline passes
//!
//! Each submodule is one stage: structural normalization, text repair,
//! preheader injection, identifier anonymization and the email-compatibility
//! fixes. Every pass is additive and idempotent; re-running a pass detects
//! its own markers and makes no further change.

pub mod anonymize;
pub mod compat;
pub mod preheader;
pub mod structure;
pub mod text;
