//! Configuration management module
//!
//! The scenario file is the base layer; environment variables (including a
//! `.env` file) override it and command-line arguments override both.

pub mod env;
pub mod parser;
pub mod validation;

pub use env::{EnvManager, EnvOverrides};
pub use parser::{display_config_summary, load_config, ConfigParser, RunSettings};
pub use validation::{validate_config, ConfigValidator, ValidationLevel, ValidationWarning};

pub use crate::models::BenchConfig;
