//! Formatter executable lookup with a per-name cache.
//!
//! Lookup order:
//! 1. the requested name itself, when it already names an existing file
//! 2. each directory of the search path, trying platform suffixes
//! 3. the bare name, so the spawn reports "not found" later
//!
//! Results, including the unresolved fallback, are cached for the lifetime of
//! the resolver.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const SUFFIXES: &[&str] = &[".exe", ".bat", ".cmd", ""];
#[cfg(not(windows))]
const SUFFIXES: &[&str] = &[""];

#[derive(Debug, Default)]
pub struct ExecutableResolver {
    /// Search path override; `None` reads `PATH` on each miss
    search_path: Option<OsString>,
    cache: Mutex<HashMap<String, PathBuf>>,
}

impl ExecutableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that searches `search_path` instead of the `PATH` variable.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `name` to an invokable path.
    pub fn resolve(&self, name: &str) -> PathBuf {
        if let Some(path) = self.cache.lock().get(name) {
            return path.clone();
        }

        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));
        let resolved = find_executable(name, search_path.as_deref().map(Path::new));
        tracing::debug!(name, resolved = %resolved.display(), "resolved formatter executable");

        self.cache
            .lock()
            .insert(name.to_string(), resolved.clone());
        resolved
    }

}

fn find_executable(name: &str, search_path: Option<&Path>) -> PathBuf {
    for candidate in candidate_names(name) {
        let direct = Path::new(&candidate);
        if direct.is_file() {
            return absolute(direct);
        }

        if let Some(search_path) = search_path {
            for dir in std::env::split_paths(search_path) {
                let path = dir.join(&candidate);
                if path.is_file() {
                    return absolute(&path);
                }
            }
        }
    }

    PathBuf::from(name)
}

/// Hits are spawned from another working directory, so relative paths are
/// anchored to the current one.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn candidate_names(name: &str) -> impl Iterator<Item = String> + '_ {
    SUFFIXES.iter().map(move |suffix| format!("{name}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_existing_path_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("my-format");
        fs::write(&exe, "").unwrap();

        let resolver = ExecutableResolver::with_search_path("");
        assert_eq!(resolver.resolve(exe.to_str().unwrap()), exe);
    }

    #[test]
    fn test_found_on_search_path() {
        let empty = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let exe = bin.path().join(format!("fake-clang-format{}", SUFFIXES[0]));
        fs::write(&exe, "").unwrap();

        let search = std::env::join_paths([empty.path(), bin.path()]).unwrap();
        let resolver = ExecutableResolver::with_search_path(search);
        assert_eq!(resolver.resolve("fake-clang-format"), exe);
    }

    #[test]
    fn test_unresolved_falls_back_to_name() {
        let empty = tempfile::tempdir().unwrap();
        let resolver = ExecutableResolver::with_search_path(empty.path());
        assert_eq!(
            resolver.resolve("definitely-not-installed-fmt"),
            PathBuf::from("definitely-not-installed-fmt")
        );
    }

    #[test]
    fn test_results_are_cached() {
        let bin = tempfile::tempdir().unwrap();
        let resolver = ExecutableResolver::with_search_path(bin.path());

        assert_eq!(resolver.resolve("late-fmt"), PathBuf::from("late-fmt"));

        // installing afterwards does not change the cached answer
        let exe = bin.path().join(format!("late-fmt{}", SUFFIXES[0]));
        fs::write(&exe, "").unwrap();
        assert_eq!(resolver.resolve("late-fmt"), PathBuf::from("late-fmt"));

        let fresh = ExecutableResolver::with_search_path(bin.path());
        assert_eq!(fresh.resolve("late-fmt"), exe);
    }

    #[test]
    fn test_relative_hits_become_absolute() {
        let dir = tempfile::Builder::new().tempdir_in(".").unwrap();
        let exe = dir.path().join("my-format");
        fs::write(&exe, "").unwrap();
        assert!(exe.is_relative());

        let resolver = ExecutableResolver::with_search_path("");
        let resolved = resolver.resolve(exe.to_str().unwrap());
        assert!(resolved.is_absolute());
        assert_eq!(
            fs::canonicalize(&resolved).unwrap(),
            fs::canonicalize(&exe).unwrap()
        );

        let dir_name = dir.path().to_str().unwrap();
        let resolver = ExecutableResolver::with_search_path(dir_name);
        let resolved = resolver.resolve("my-format");
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("my-format"));
    }
}
