use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Operations directory, relative to a repository root.
pub const OPERATIONS_DIR: &str = ".nt/operations";

/// WAL directory name inside [`OPERATIONS_DIR`].
pub const WAL_DIR: &str = "wal";

/// A note repository known to the application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Short unique key, e.g. `main` or `work-notes`.
    pub slug: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Repository root. May start with `~` or contain `$PWD`.
    pub path: PathBuf,
}

impl RepositoryRef {
    pub fn new(slug: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            slug: slug.into(),
            name: None,
            path: path.into(),
        }
    }

    /// Copy of this reference with its path normalized.
    pub fn normalized(&self) -> Self {
        Self {
            slug: self.slug.clone(),
            name: self.name.clone(),
            path: normalize_path(&self.path),
        }
    }

    /// `<root>/.nt/operations`
    pub fn operations_dir(&self) -> PathBuf {
        self.path.join(OPERATIONS_DIR)
    }

    /// `<root>/.nt/operations/wal`
    pub fn wal_dir(&self) -> PathBuf {
        self.operations_dir().join(WAL_DIR)
    }
}

/// Expand `~` and `$PWD`, then lexically normalize the path.
///
/// `.` components are dropped and `..` pops the previous normal component.
/// The filesystem is never consulted, so the path need not exist.
pub fn normalize_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let mut expanded = raw.to_string();

    if expanded == "~" || expanded.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            expanded = format!("{}{}", home.to_string_lossy(), &expanded[1..]);
        }
    }
    if expanded.contains("$PWD") {
        if let Ok(cwd) = std::env::current_dir() {
            expanded = expanded.replace("$PWD", &cwd.to_string_lossy());
        }
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(&expanded).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) && normalized.pop();
                if !popped && !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let repo = RepositoryRef::new("main", "/notes");
        assert_eq!(repo.operations_dir(), PathBuf::from("/notes/.nt/operations"));
        assert_eq!(repo.wal_dir(), PathBuf::from("/notes/.nt/operations/wal"));
    }

    #[test]
    fn normalize_drops_dots() {
        assert_eq!(
            normalize_path(Path::new("/notes/./work/../personal")),
            PathBuf::from("/notes/personal")
        );
    }

    #[test]
    fn normalize_keeps_leading_parent_on_relative_paths() {
        assert_eq!(normalize_path(Path::new("../notes")), PathBuf::from("../notes"));
    }

    #[test]
    fn normalize_expands_pwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(normalize_path(Path::new("$PWD/notes")), cwd.join("notes"));
    }

    #[test]
    fn normalize_expands_home() {
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                normalize_path(Path::new("~/notes")),
                normalize_path(&PathBuf::from(home).join("notes"))
            );
        }
    }

    #[test]
    fn normalized_preserves_slug_and_name() {
        let mut repo = RepositoryRef::new("main", "/a/./b");
        repo.name = Some("Main".into());
        let n = repo.normalized();
        assert_eq!(n.slug, "main");
        assert_eq!(n.name.as_deref(), Some("Main"));
        assert_eq!(n.path, PathBuf::from("/a/b"));
    }

    #[test]
    fn toml_friendly_shape() {
        let repo: RepositoryRef =
            serde_json::from_str(r#"{"slug":"main","path":"/notes"}"#).unwrap();
        assert_eq!(repo, RepositoryRef::new("main", "/notes"));
    }
}
