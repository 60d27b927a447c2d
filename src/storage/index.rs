use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use git2::{Delta, DiffOptions, Index, IndexEntry, IndexTime, Oid, Repository};
use tracing::debug;

use crate::capture::stage::{DocumentSource, StagePrimitive};
use crate::error::UnstageError;

/// Regular, non-executable file mode for entries that are not yet in the index
const DEFAULT_FILE_MODE: u32 = 0o100644;

/// Stage primitive writing blobs straight into the git index
pub struct GitIndexStager {
    repo: Repository,
    workdir: PathBuf,
}

impl GitIndexStager {
    /// Wrap an opened repository; bare repositories cannot stage work-tree files
    ///
    /// `git commit -a` and `git commit <paths>` stage into a temporary index
    /// named by `GIT_INDEX_FILE`; that index is used when the variable is set.
    pub fn new(repo: Repository) -> Result<Self, UnstageError> {
        Self::with_index_file(repo, env::var_os("GIT_INDEX_FILE").map(PathBuf::from))
    }

    /// Wrap an opened repository, staging into `index_file` instead of the
    /// repository's own index when given
    pub fn with_index_file(
        repo: Repository,
        index_file: Option<PathBuf>,
    ) -> Result<Self, UnstageError> {
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| UnstageError::missing_dependency("repository has no working directory"))?;

        let mut stager = Self { repo, workdir };
        if let Some(index_file) = index_file {
            stager.use_index_file(index_file)?;
        }
        Ok(stager)
    }

    /// Locate the repository the way git itself does (honours `GIT_DIR`, so
    /// this works from inside hooks)
    pub fn from_env() -> Result<Self, UnstageError> {
        let repo = Repository::open_from_env().map_err(|e| {
            UnstageError::missing_dependency(format!("no git repository found: {}", e.message()))
        })?;
        Self::new(repo)
    }

    /// Open the repository at `path`
    pub fn open(path: &Path) -> Result<Self, UnstageError> {
        let repo = Repository::open(path).map_err(|e| {
            UnstageError::missing_dependency(format!(
                "no git repository at {}: {}",
                path.display(),
                e.message()
            ))
        })?;
        Self::new(repo)
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    fn use_index_file(&mut self, mut index_path: PathBuf) -> Result<(), UnstageError> {
        if index_path.is_relative() {
            index_path = self.workdir.join(index_path);
        }
        debug!(index = %index_path.display(), "using alternate index file");

        let mut index = Index::open(&index_path)?;
        self.repo.set_index(&mut index)?;
        Ok(())
    }

    /// Paths whose index version differs from HEAD
    ///
    /// These are the candidates of a commit. Deleted paths are left out since
    /// there is no content to rewrite.
    pub fn index_changes(&self) -> Result<Vec<String>, UnstageError> {
        let index = self.repo.index()?;
        let head_tree = match self.repo.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) if e.code() == git2::ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut opts = DiffOptions::new();
        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut opts))?;

        let mut paths: Vec<String> = diff
            .deltas()
            .filter(|delta| delta.status() != Delta::Deleted)
            .filter_map(|delta| delta.new_file().path().map(|p| p.to_string_lossy().to_string()))
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Content currently staged for `path`, if any
    pub fn staged_content(&self, path: &str) -> Result<Option<Vec<u8>>, UnstageError> {
        let index = self.repo.index()?;
        let Some(entry) = index.get_path(Path::new(path), 0) else {
            return Ok(None);
        };
        let blob = self.repo.find_blob(entry.id)?;
        Ok(Some(blob.content().to_vec()))
    }

    /// Store `content` as the blob git would create when adding `path`
    ///
    /// The path selects the clean filters (`core.autocrlf`, `text` and `eol`
    /// attributes), so line endings match what `git add` stores.
    fn write_blob(&self, path: &str, content: &[u8]) -> Result<Oid, UnstageError> {
        let mut writer = self.repo.blob_writer(Some(Path::new(path)))?;
        writer
            .write_all(content)
            .map_err(|e| UnstageError::stage(path, e.to_string()))?;
        Ok(writer.commit()?)
    }

    fn fresh_entry(&self, path: &str) -> IndexEntry {
        let mode = fs::metadata(self.workdir.join(path))
            .map(|meta| entry_mode(&meta))
            .unwrap_or(DEFAULT_FILE_MODE);

        IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode,
            uid: 0,
            gid: 0,
            file_size: 0,
            id: Oid::zero(),
            flags: 0,
            flags_extended: 0,
            path: path.as_bytes().to_vec(),
        }
    }
}

impl StagePrimitive for GitIndexStager {
    fn stage(&mut self, path: &str, content: &[u8]) -> Result<(), UnstageError> {
        let blob_id = self.write_blob(path, content)?;
        let mut index = self.repo.index()?;

        let mut entry = index
            .get_path(Path::new(path), 0)
            .unwrap_or_else(|| self.fresh_entry(path));

        // The staged blob no longer matches the work tree; clear the cached
        // stat data so git re-hashes the file instead of trusting timestamps
        entry.ctime = IndexTime::new(0, 0);
        entry.mtime = IndexTime::new(0, 0);
        entry.file_size = content.len() as u32;
        entry.id = blob_id;

        index
            .add(&entry)
            .map_err(|e| UnstageError::stage(path, e.message()))?;
        index.write()?;

        debug!(path, bytes = content.len(), "wrote selective content to index");
        Ok(())
    }
}

#[cfg(unix)]
fn entry_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    if meta.permissions().mode() & 0o111 != 0 {
        0o100755
    } else {
        DEFAULT_FILE_MODE
    }
}

#[cfg(not(unix))]
fn entry_mode(_meta: &fs::Metadata) -> u32 {
    DEFAULT_FILE_MODE
}

/// Reads documents from a work tree
pub struct WorkdirSource {
    root: PathBuf,
}

impl WorkdirSource {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl DocumentSource for WorkdirSource {
    fn read(&self, path: &str) -> Result<Vec<u8>, UnstageError> {
        fs::read(self.root.join(path)).map_err(|source| UnstageError::Read {
            path: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        // Create initial commit
        {
            let sig = Signature::now("Test", "test@test.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "Initial", &tree, &[])
                .unwrap();
        }

        (dir, repo)
    }

    fn add_path(repo: &Repository, name: &str) {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    #[test]
    fn test_stage_replaces_index_content() {
        let (dir, repo) = create_test_repo();
        fs::write(dir.path().join("a.txt"), "keep\ndrop\nkeep too\n").unwrap();
        add_path(&repo, "a.txt");

        let mut stager = GitIndexStager::open(dir.path()).unwrap();
        stager.stage("a.txt", b"keep\nkeep too\n").unwrap();

        assert_eq!(
            stager.staged_content("a.txt").unwrap().unwrap(),
            b"keep\nkeep too\n"
        );
        // Work tree keeps the full content
        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "keep\ndrop\nkeep too\n"
        );
    }

    #[test]
    fn test_stage_applies_autocrlf_filter() {
        let (dir, repo) = create_test_repo();
        repo.config().unwrap().set_bool("core.autocrlf", true).unwrap();
        fs::write(dir.path().join("w.txt"), "a\r\nb\r\nc\r\n").unwrap();
        add_path(&repo, "w.txt");

        let mut stager = GitIndexStager::open(dir.path()).unwrap();
        assert_eq!(stager.staged_content("w.txt").unwrap().unwrap(), b"a\nb\nc\n");

        stager.stage("w.txt", b"a\r\nc\r\n").unwrap();
        assert_eq!(stager.staged_content("w.txt").unwrap().unwrap(), b"a\nc\n");
    }

    #[test]
    fn test_stage_applies_eol_attribute() {
        let (dir, repo) = create_test_repo();
        fs::write(dir.path().join(".gitattributes"), "*.txt text eol=crlf\n").unwrap();
        fs::write(dir.path().join("e.txt"), "one\r\ntwo\r\n").unwrap();
        add_path(&repo, "e.txt");

        let mut stager = GitIndexStager::open(dir.path()).unwrap();
        stager.stage("e.txt", b"two\r\n").unwrap();
        assert_eq!(stager.staged_content("e.txt").unwrap().unwrap(), b"two\n");
    }

    #[test]
    fn test_stage_into_alternate_index_file() {
        let (dir, repo) = create_test_repo();
        fs::write(dir.path().join("a.txt"), "keep\ndrop\n").unwrap();

        let alternate = repo.path().join("next-index");
        let stager_repo = Repository::open(dir.path()).unwrap();
        let mut stager =
            GitIndexStager::with_index_file(stager_repo, Some(alternate.clone())).unwrap();
        stager.stage("a.txt", b"keep\n").unwrap();

        let index = Index::open(&alternate).unwrap();
        let entry = index.get_path(Path::new("a.txt"), 0).unwrap();
        assert_eq!(repo.find_blob(entry.id).unwrap().content(), b"keep\n");

        let main = Repository::open(dir.path()).unwrap().index().unwrap();
        assert!(main.get_path(Path::new("a.txt"), 0).is_none());
    }

    #[test]
    fn test_relative_index_file_resolves_from_workdir() {
        let (dir, _repo) = create_test_repo();
        fs::write(dir.path().join("b.txt"), "x\ny\n").unwrap();

        let stager_repo = Repository::open(dir.path()).unwrap();
        let mut stager =
            GitIndexStager::with_index_file(stager_repo, Some(PathBuf::from(".git/alt-index")))
                .unwrap();
        stager.stage("b.txt", b"y\n").unwrap();

        let index = Index::open(&dir.path().join(".git/alt-index")).unwrap();
        assert!(index.get_path(Path::new("b.txt"), 0).is_some());
    }

    #[test]
    fn test_stage_untracked_path_creates_entry() {
        let (dir, _repo) = create_test_repo();
        fs::write(dir.path().join("new.txt"), "a\nb\n").unwrap();

        let mut stager = GitIndexStager::open(dir.path()).unwrap();
        assert!(stager.staged_content("new.txt").unwrap().is_none());

        stager.stage("new.txt", b"a\n").unwrap();
        assert_eq!(stager.staged_content("new.txt").unwrap().unwrap(), b"a\n");
    }

    #[test]
    fn test_index_changes_lists_staged_paths() {
        let (dir, repo) = create_test_repo();
        fs::write(dir.path().join("staged.txt"), "x\n").unwrap();
        fs::write(dir.path().join("unstaged.txt"), "y\n").unwrap();
        add_path(&repo, "staged.txt");

        let stager = GitIndexStager::open(dir.path()).unwrap();
        assert_eq!(stager.index_changes().unwrap(), vec!["staged.txt".to_string()]);
    }

    #[test]
    fn test_index_changes_unborn_head() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("first.txt"), "x\n").unwrap();
        add_path(&repo, "first.txt");

        let stager = GitIndexStager::open(dir.path()).unwrap();
        assert_eq!(stager.index_changes().unwrap(), vec!["first.txt".to_string()]);
    }

    #[test]
    fn test_missing_repository_is_missing_dependency() {
        let dir = TempDir::new().unwrap();
        let err = GitIndexStager::open(dir.path()).err().unwrap();
        assert!(err.is_missing_dependency());

        let bare = TempDir::new().unwrap();
        Repository::init_bare(bare.path()).unwrap();
        let err = GitIndexStager::open(bare.path()).err().unwrap();
        assert!(err.is_missing_dependency());
    }

    #[test]
    fn test_workdir_source_read_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("present.txt"), "hi\n").unwrap();
        let source = WorkdirSource::new(dir.path());

        assert_eq!(source.read("present.txt").unwrap(), b"hi\n");
        assert!(matches!(
            source.read("absent.txt"),
            Err(UnstageError::Read { .. })
        ));
    }
}
