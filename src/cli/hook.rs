use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::Repository;

/// Marker line identifying our section of a hook script
const HOOK_MARKER: &str = "# auto-unstage pre-commit hook";

const HOOK_SCRIPT: &str = r#"#!/bin/sh
# auto-unstage pre-commit hook
# Leaves marked lines out of the staged content

if command -v auto-unstage >/dev/null 2>&1; then
    auto-unstage stage --kind commit || true
elif [ -x "$HOME/.cargo/bin/auto-unstage" ]; then
    "$HOME/.cargo/bin/auto-unstage" stage --kind commit || true
fi
"#;

/// Result of installing the hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookInstall {
    Created(PathBuf),
    Appended(PathBuf),
    AlreadyInstalled(PathBuf),
}

/// Install or extend the `pre-commit` hook of `repo`
pub fn install_pre_commit(repo: &Repository) -> Result<HookInstall> {
    let hooks_dir = repo.path().join("hooks");
    fs::create_dir_all(&hooks_dir).context("Failed to create hooks directory")?;
    let hook_path = hooks_dir.join("pre-commit");

    if hook_path.exists() {
        let content = fs::read_to_string(&hook_path)
            .with_context(|| format!("Failed to read {}", hook_path.display()))?;
        if content.contains(HOOK_MARKER) {
            return Ok(HookInstall::AlreadyInstalled(hook_path));
        }

        let new_content = format!(
            "{}\n\n{}\nif command -v auto-unstage >/dev/null 2>&1; then\n    auto-unstage stage --kind commit || true\nfi\n",
            content.trim_end(),
            HOOK_MARKER
        );
        fs::write(&hook_path, new_content)
            .with_context(|| format!("Failed to write {}", hook_path.display()))?;
        return Ok(HookInstall::Appended(hook_path));
    }

    fs::write(&hook_path, HOOK_SCRIPT)
        .with_context(|| format!("Failed to write {}", hook_path.display()))?;
    make_executable(&hook_path)?;
    Ok(HookInstall::Created(hook_path))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_install_creates_hook() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let result = install_pre_commit(&repo).unwrap();
        let path = repo.path().join("hooks/pre-commit");
        assert_eq!(result, HookInstall::Created(path.clone()));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#!/bin/sh"));
        assert!(content.contains("auto-unstage stage --kind commit"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_install_appends_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let path = repo.path().join("hooks/pre-commit");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "#!/bin/sh\ncargo fmt --check\n").unwrap();

        assert_eq!(
            install_pre_commit(&repo).unwrap(),
            HookInstall::Appended(path.clone())
        );
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#!/bin/sh\ncargo fmt --check\n"));
        assert!(content.contains(HOOK_MARKER));

        assert_eq!(
            install_pre_commit(&repo).unwrap(),
            HookInstall::AlreadyInstalled(path)
        );
    }
}
