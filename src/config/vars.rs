//! `${...}` variable substitution for configured paths.
//!
//! Supported variables: `${workspaceRoot}`, `${workspaceFolder}`, `${cwd}`,
//! `${userHome}` and `${env.NAME}`. A leading `~/` expands to the home
//! directory. Variables without a value in the current context, and unknown
//! variables, are left in place.

use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    pub workspace_root: Option<PathBuf>,
    /// Folder of the workspace containing the document; defaults to the root
    pub workspace_folder: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
    pub home: Option<PathBuf>,
}

impl VariableContext {
    /// Context for the running process.
    pub fn from_env(workspace_root: Option<PathBuf>) -> Self {
        Self {
            workspace_folder: workspace_root.clone(),
            workspace_root,
            cwd: std::env::current_dir().ok(),
            home: home::home_dir(),
        }
    }

    /// Expand variables, reading `${env.NAME}` from the process environment.
    pub fn expand(&self, input: &str) -> String {
        self.expand_with(input, |name| std::env::var(name).ok())
    }

    /// Expand variables with a custom environment lookup.
    pub fn expand_with(&self, input: &str, env: impl Fn(&str) -> Option<String>) -> String {
        let mut out = String::with_capacity(input.len());

        let mut rest = input;
        if let Some(home) = &self.home {
            if rest == "~" {
                return home.display().to_string();
            }
            if let Some(tail) = rest.strip_prefix("~/") {
                out.push_str(&home.display().to_string());
                out.push('/');
                rest = tail;
            }
        }

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = &after[..end];
            match self.lookup(name, &env) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, name: &str, env: &impl Fn(&str) -> Option<String>) -> Option<String> {
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());
        match name {
            "workspaceRoot" => path(&self.workspace_root),
            "workspaceFolder" => path(&self.workspace_folder),
            "cwd" => path(&self.cwd),
            "userHome" => path(&self.home),
            _ => name
                .strip_prefix("env.")
                .map(|var| env(var).unwrap_or_default()),
        }
    }
}
