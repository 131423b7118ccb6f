use crate::config::schema::{FormatterConfig, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File names searched for in the workspace root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["format-bridge.toml", ".format-bridge.toml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: not valid TOML: {source}", origin(.path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("{}: {source}", origin(.path))]
    Validation {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    /// File the error came from, if known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Io { path, .. } => Some(path),
            ConfigError::Toml { path, .. } | ConfigError::Validation { path, .. } => {
                path.as_deref()
            }
        }
    }

    /// Attach `file` to errors parsed from an in-memory string.
    fn in_file(mut self, file: &Path) -> Self {
        if let ConfigError::Toml { path, .. } | ConfigError::Validation { path, .. } = &mut self {
            path.get_or_insert_with(|| file.to_path_buf());
        }
        self
    }
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "formatter config".to_string(),
    }
}

pub fn load_from_str(input: &str) -> Result<FormatterConfig, ConfigError> {
    let config: FormatterConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<FormatterConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.in_file(path))
}

/// Find a config file directly inside `workspace_root`.
pub fn discover(workspace_root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
}

/// Load the workspace config, or defaults when there is none.
pub fn load_for_workspace(workspace_root: &Path) -> Result<FormatterConfig, ConfigError> {
    match discover(workspace_root) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading formatter config");
            load_from_path(path)
        }
        None => Ok(FormatterConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_errors_have_no_path() {
        let err = load_from_str("enabled = \"yes\"").unwrap_err();
        assert!(err.path().is_none());
        assert!(err.to_string().starts_with("formatter config: not valid TOML"));
    }

    #[test]
    fn test_file_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("format-bridge.toml");
        fs::write(&file, "executable = \"\"\n").unwrap();

        let err = load_from_path(&file).unwrap_err();
        assert_eq!(err.path(), Some(file.as_path()));
        assert_eq!(
            err.to_string(),
            format!("{}: missing required field 'executable'", file.display())
        );
    }
}
