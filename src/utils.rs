//! Shared utility functions and constants

use std::path::{Component, Path, PathBuf};

use anyhow::Result;

/// Number of bytes to use from SHA256 hash for content hashing
pub const CONTENT_HASH_BYTES: usize = 16;

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Hex encoding utilities
pub mod hex {
    /// Encode bytes as hex string
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Map a user-supplied path to a repository-relative, `/`-separated key
///
/// Relative paths are taken relative to `cwd`. Paths outside the repository
/// are rejected.
pub fn repo_relative_path(repo_root: &Path, cwd: &Path, path: &str) -> Result<String> {
    let input = Path::new(path);
    let absolute = if input.is_absolute() {
        input.to_path_buf()
    } else {
        cwd.join(input)
    };
    let absolute = normalize(&absolute);

    // Fast path: exact prefix match against the repo root.
    if let Ok(relative) = absolute.strip_prefix(repo_root) {
        return to_key(relative, path);
    }

    // Handle aliased absolute paths (e.g. /var vs /private/var on macOS)
    // by canonicalizing both paths before prefix comparison.
    let canonical_repo =
        canonicalize_for_prefix(repo_root).unwrap_or_else(|| repo_root.to_path_buf());
    if let Some(canonical_input) = canonicalize_for_prefix(&absolute) {
        if let Ok(relative) = canonical_input.strip_prefix(&canonical_repo) {
            return to_key(relative, path);
        }
    }

    anyhow::bail!(
        "Path '{}' is outside repository root '{}'",
        path,
        repo_root.display()
    )
}

fn to_key(relative: &Path, original: &str) -> Result<String> {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        anyhow::bail!("Path '{}' is the repository root, not a file", original);
    }
    Ok(parts.join("/"))
}

/// Resolve `.` and `..` lexically
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize a path for prefix comparison.
///
/// If the full path doesn't exist yet, this resolves the deepest existing ancestor
/// and re-appends the missing suffix so new files can still be matched reliably.
fn canonicalize_for_prefix(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return Some(canonical);
    }

    let mut current = path;
    let mut missing_components = Vec::new();

    while !current.exists() {
        let file_name = current.file_name()?;
        missing_components.push(file_name.to_os_string());
        current = current.parent()?;
    }

    let mut canonical_base = std::fs::canonicalize(current).ok()?;
    for component in missing_components.iter().rev() {
        canonical_base.push(component);
    }

    Some(canonical_base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex::encode(&[0x00, 0xff, 0x10]), "00ff10");
        assert_eq!(hex::encode(&[]), "");
    }

    #[test]
    fn test_repo_relative_path() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let sub = root.join("src");
        std::fs::create_dir_all(&sub).unwrap();

        assert_eq!(repo_relative_path(root, root, "a.txt").unwrap(), "a.txt");
        assert_eq!(repo_relative_path(root, &sub, "lib.rs").unwrap(), "src/lib.rs");
        assert_eq!(repo_relative_path(root, &sub, "../b.txt").unwrap(), "b.txt");
        assert_eq!(
            repo_relative_path(root, root, root.join("src/./x.rs").to_str().unwrap()).unwrap(),
            "src/x.rs"
        );
    }

    #[test]
    fn test_repo_relative_path_rejects_outside() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repo");
        std::fs::create_dir_all(&root).unwrap();

        assert!(repo_relative_path(&root, &root, "../elsewhere.txt").is_err());
        assert!(repo_relative_path(&root, &root, ".").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_repo_relative_path_through_symlink() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repo");
        std::fs::create_dir_all(root.join("src")).unwrap();

        let alias_parent = TempDir::new().unwrap();
        let alias = alias_parent.path().join("alias");
        std::os::unix::fs::symlink(&root, &alias).unwrap();

        let via_alias = alias.join("src").join("new.rs");
        assert_eq!(
            repo_relative_path(&root, &root, via_alias.to_str().unwrap()).unwrap(),
            "src/new.rs"
        );
    }
}
