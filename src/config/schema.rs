use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_EXECUTABLE: &str = "clang-format";
pub const DEFAULT_STYLE: &str = "file";

/// Formatter settings, as read from `format-bridge.toml`.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FormatterConfig {
    /// When false, formatting requests complete without running anything
    pub enabled: bool,
    /// Formatter executable; may contain `${workspaceFolder}` style variables
    pub executable: String,
    /// Per-platform executable overrides
    pub platform_executable: PlatformExecutables,
    /// Value passed as `-style=`
    pub style: StyleSpec,
    /// Paths relative to the workspace root that are never formatted
    pub ignored_paths: Vec<String>,
    /// File extensions picked up when formatting a directory
    pub extensions: Vec<String>,
    /// Pass `-assume-filename=<document path>` to the formatter
    pub assume_filename: bool,
    /// Extra arguments appended after the generated ones
    pub extra_args: Vec<String>,
    /// Working directory for the formatter process
    pub working_dir: Option<String>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            executable: DEFAULT_EXECUTABLE.to_string(),
            platform_executable: PlatformExecutables::default(),
            style: StyleSpec::default(),
            ignored_paths: Vec::new(),
            extensions: vec!["nss".to_string()],
            assume_filename: false,
            extra_args: Vec::new(),
            working_dir: None,
        }
    }
}

impl FormatterConfig {
    /// Executable for the current platform, before variable substitution.
    pub fn executable_for_platform(&self) -> &str {
        match self.platform_executable.current() {
            Some(exe) if !exe.trim().is_empty() => exe.trim(),
            _ => self.executable.trim(),
        }
    }

    /// Whether `path` has one of the configured extensions.
    pub fn matches_extension(&self, path: &std::path::Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.executable.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "executable",
            });
        }

        if let StyleSpec::Named(name) = &self.style {
            if name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField { field: "style" });
            }
        }

        for (index, path) in self.ignored_paths.iter().enumerate() {
            if path.trim().is_empty() {
                issues.push(ValidationIssue::EmptyEntry {
                    field: "ignored_paths",
                    index,
                });
            }
        }

        for (index, ext) in self.extensions.iter().enumerate() {
            if ext.trim_start_matches('.').trim().is_empty() {
                issues.push(ValidationIssue::EmptyEntry {
                    field: "extensions",
                    index,
                });
            }
        }

        if let Some(dir) = &self.working_dir {
            if dir.trim().is_empty() {
                issues.push(ValidationIssue::InvalidValue {
                    field: "working_dir",
                    message: "must not be empty when set".to_string(),
                });
            }
        }

        for arg in &self.extra_args {
            if arg.starts_with("-output-replacements-xml") || arg.starts_with("-style=") {
                issues.push(ValidationIssue::InvalidValue {
                    field: "extra_args",
                    message: format!("'{arg}' is always passed by format-bridge"),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformExecutables {
    pub windows: Option<String>,
    pub linux: Option<String>,
    pub osx: Option<String>,
}

impl PlatformExecutables {
    pub fn current(&self) -> Option<&str> {
        let exe = if cfg!(target_os = "windows") {
            &self.windows
        } else if cfg!(target_os = "macos") {
            &self.osx
        } else if cfg!(target_os = "linux") {
            &self.linux
        } else {
            &None
        };
        exe.as_deref()
    }
}

/// Formatter style: a named style (`file`, `Google`, `{BasedOnStyle: LLVM}`)
/// or a table of style options.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum StyleSpec {
    Named(String),
    Structured(BTreeMap<String, serde_json::Value>),
}

impl Default for StyleSpec {
    fn default() -> Self {
        StyleSpec::Named(DEFAULT_STYLE.to_string())
    }
}

impl StyleSpec {
    /// Value for the `-style=` argument.
    ///
    /// Tables are serialized as JSON, which the formatter reads as a YAML
    /// flow mapping.
    pub fn to_arg(&self) -> Result<String, serde_json::Error> {
        match self {
            StyleSpec::Named(name) => Ok(name.trim().to_string()),
            StyleSpec::Structured(options) => serde_json::to_string(options),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField { field: &'static str },
    EmptyEntry { field: &'static str, index: usize },
    InvalidValue { field: &'static str, message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required field '{field}'")
            }
            ValidationIssue::EmptyEntry { field, index } => {
                write!(f, "'{field}' entry {index} is empty")
            }
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid '{field}': {message}")
            }
        }
    }
}
