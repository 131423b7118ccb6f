pub mod ignore;
pub mod loader;
pub mod schema;
pub mod vars;

pub use ignore::is_ignored;
pub use loader::{discover, load_for_workspace, load_from_path, load_from_str, ConfigError};
pub use schema::{
    FormatterConfig, PlatformExecutables, StyleSpec, ValidationError, ValidationIssue,
};
pub use vars::VariableContext;
