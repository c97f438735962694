//! Compiles `validate:` directives written in struct doc comments into
//! `validate()` methods.
//!
//! ```text
//! pub struct User {
//!     /// validate: required,min=3
//!     pub name: String,
//! }
//! ```
//!
//! Each source file (unit) gets a sibling `<stem>_validation.rs` meant to be
//! mounted as a child module of the source module.

pub mod closure;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod directive;
pub mod emit;
pub mod generate;
pub mod model;
pub mod oracle;
mod rules;
mod source;
pub mod types;
mod util;

pub use config::{GenerateOptions, NumericWrapper, UnknownDirectiveMode};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use directive::{parse_directive, ParsedRule};
pub use emit::UnitOutput;
pub use generate::{generate, GenerateReport};
pub use model::Package;
pub use util::unit_prefix;
