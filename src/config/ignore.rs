use std::path::Path;

/// Whether `document` falls under one of `ignored_paths`.
///
/// Entries are relative to `workspace_root`. An entry matches when it exists
/// and is either a directory containing the document or the document itself.
/// Without a workspace root nothing is ignored.
pub fn is_ignored(workspace_root: Option<&Path>, document: &Path, ignored_paths: &[String]) -> bool {
    let Some(root) = workspace_root else {
        return false;
    };

    ignored_paths.iter().any(|entry| {
        let ignored = root.join(entry.trim());
        let Ok(metadata) = std::fs::metadata(&ignored) else {
            return false;
        };
        if metadata.is_dir() {
            document.starts_with(&ignored)
        } else {
            document == ignored
        }
    })
}
