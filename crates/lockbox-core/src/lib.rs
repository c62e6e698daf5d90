//! Domain vocabulary for the Lockbox smart-lock access control core.
//!
//! This crate holds everything that does not touch I/O: the provider and
//! status enums shared by storage and adapters, the access-code lifecycle
//! rules, validity evaluation, and access-code generation.

pub mod codegen;
pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod types;
pub mod validity;

pub use codegen::{CodeGenerator, RandomCodeGenerator, ScriptedCodeGenerator};
pub use error::{Error, Result};
pub use types::*;
pub use validity::{Validity, ValidityWindow, evaluate_validity};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
