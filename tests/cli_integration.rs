//! Integration tests for the command-line interface
//!
//! Runs the built binary against a temporary workspace with a fake
//! formatter script.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn format_bridge(workspace: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_format-bridge"))
        .arg("--workspace")
        .arg(workspace)
        .args(args)
        .env_remove("FORMAT_BRIDGE_LOG")
        .env_remove("RUST_LOG")
        .current_dir(workspace)
        .output()
        .unwrap()
}

#[test]
fn test_format_help() {
    let dir = TempDir::new().unwrap();
    let output = format_bridge(dir.path(), &["format", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--check"));
    assert!(stdout.contains("--range"));
}

#[test]
fn test_config_prints_defaults() {
    let dir = TempDir::new().unwrap();
    let output = format_bridge(dir.path(), &["config"]);

    assert!(output.status.success());
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["executable"], "clang-format");
    assert_eq!(config["style"], "file");
    assert_eq!(config["enabled"], true);
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("format-bridge.toml"), "style = 5\n").unwrap();

    let output = format_bridge(dir.path(), &["config"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("format-bridge.toml"));
}

#[test]
fn test_bad_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.nss"), "int x;").unwrap();

    let output = format_bridge(dir.path(), &["edits", "a.nss", "--range", "0:0-1:1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("positive integer"));
}

#[cfg(unix)]
mod with_fake_formatter {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Workspace with one unformatted script and a formatter that breaks
    /// the line after `main()`.
    fn setup_workspace(formatter_body: &str) -> TempDir {
        let dir = TempDir::new().unwrap();

        let exe = dir.path().join("fake-clang-format");
        fs::write(&exe, format!("#!/bin/sh\n{formatter_body}\n")).unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

        fs::write(
            dir.path().join("format-bridge.toml"),
            "executable = \"${workspaceRoot}/fake-clang-format\"\n",
        )
        .unwrap();

        fs::create_dir(dir.path().join("scripts")).unwrap();
        fs::write(dir.path().join("scripts/main.nss"), "int main(){return 0;}").unwrap();
        fs::write(dir.path().join("scripts/notes.txt"), "not a script").unwrap();

        dir
    }

    const BREAK_AFTER_MAIN: &str = r#"cat > /dev/null
printf '<replacements xml:space="preserve">'
printf '<replacement offset="10" length="0">&#10;</replacement>'
printf '</replacements>'"#;

    #[test]
    fn test_format_prints_result() {
        let dir = setup_workspace(BREAK_AFTER_MAIN);
        let output = format_bridge(dir.path(), &["format", "scripts/main.nss"]);

        assert!(output.status.success());
        assert_eq!(
            String::from_utf8_lossy(&output.stdout),
            "int main()\n{return 0;}"
        );
        // nothing written without --write
        assert_eq!(
            fs::read_to_string(dir.path().join("scripts/main.nss")).unwrap(),
            "int main(){return 0;}"
        );
    }

    #[test]
    fn test_format_write_walks_directories() {
        let dir = setup_workspace(BREAK_AFTER_MAIN);
        let output = format_bridge(dir.path(), &["format", "--write", "scripts"]);

        assert!(output.status.success());
        assert_eq!(
            fs::read_to_string(dir.path().join("scripts/main.nss")).unwrap(),
            "int main()\n{return 0;}"
        );
        // only configured extensions are picked up from directories
        assert_eq!(
            fs::read_to_string(dir.path().join("scripts/notes.txt")).unwrap(),
            "not a script"
        );
    }

    #[test]
    fn test_check_exits_nonzero_on_changes() {
        let dir = setup_workspace(BREAK_AFTER_MAIN);
        let output = format_bridge(dir.path(), &["format", "--check", "scripts"]);

        assert_eq!(output.status.code(), Some(1));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Would reformat"));
    }

    #[test]
    fn test_check_passes_when_formatted() {
        let dir = setup_workspace("cat > /dev/null\nprintf '<replacements/>'");
        let output = format_bridge(dir.path(), &["format", "--check", "scripts"]);

        assert!(output.status.success());
    }

    #[test]
    fn test_edits_prints_json() {
        let dir = setup_workspace(BREAK_AFTER_MAIN);
        let output = format_bridge(dir.path(), &["edits", "scripts/main.nss"]);

        assert!(output.status.success());
        let edits: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let edits = edits.as_array().unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0]["char_start"], 10);
        assert_eq!(edits[0]["new_text"], "\n");
        assert_eq!(edits[0]["range"]["start"]["character"], 10);
    }

    #[test]
    fn test_syntax_error_shows_formatter_output() {
        let dir = setup_workspace(
            "cat > /dev/null\necho \"main.nss:1:1: error: unknown type\" >&2\nprintf '<replacements/>'",
        );
        let output = format_bridge(dir.path(), &["format", "scripts/main.nss"]);

        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Cannot format due to syntax errors."));
        assert!(stderr.contains("unknown type"));
    }

    #[test]
    fn test_missing_formatter_is_not_a_failure() {
        let dir = setup_workspace(BREAK_AFTER_MAIN);
        fs::write(
            dir.path().join("format-bridge.toml"),
            "executable = \"${workspaceRoot}/missing-clang-format\"\n",
        )
        .unwrap();

        let output = format_bridge(dir.path(), &["format", "--write", "scripts"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("is not available"));
        assert_eq!(
            fs::read_to_string(dir.path().join("scripts/main.nss")).unwrap(),
            "int main(){return 0;}"
        );
    }

    #[test]
    fn test_resolve_uses_config() {
        let dir = setup_workspace(BREAK_AFTER_MAIN);
        let output = format_bridge(dir.path(), &["resolve"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(
            stdout.trim(),
            dir.path().join("fake-clang-format").display().to_string()
        );
    }
}
