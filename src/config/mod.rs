//! Session configuration: schema, loading, and validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{from_yaml_str, load_config};
pub use schema::{KeyBindings, SessionConfig};
pub use validation::{ValidationResult, Validator};
