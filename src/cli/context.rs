use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::Repository;
use tracing::{debug, warn};

use crate::capture::snapshot::ContentSnapshot;
use crate::capture::stage::DocumentSource;
use crate::capture::sync::derive_edits;
use crate::config::AutoUnstageConfig;
use crate::core::presentation::LineNumbering;
use crate::core::session::MarkerSession;
use crate::storage::index::WorkdirSource;
use crate::storage::markers::MarkerStore;
use crate::utils::repo_relative_path;

/// Everything a command needs about the current project
pub struct ProjectContext {
    /// Repository work tree, or the current directory outside git
    pub root: PathBuf,
    pub config: AutoUnstageConfig,
    pub in_repo: bool,
    store: MarkerStore,
    cwd: PathBuf,
}

impl ProjectContext {
    /// Resolve the project from the environment
    ///
    /// Marking works outside a git repository too; only staging needs one.
    pub fn open() -> Result<Self> {
        let cwd = env::current_dir().context("Failed to read current directory")?;

        let (root, in_repo) = match Repository::open_from_env() {
            Ok(repo) => match repo.workdir() {
                Some(workdir) => (workdir.to_path_buf(), true),
                None => (cwd.clone(), false),
            },
            Err(e) => {
                debug!(error = %e, "not in a git repository, using current directory");
                (cwd.clone(), false)
            }
        };

        Ok(Self::at(&root, &cwd, in_repo))
    }

    /// Project rooted at `root`
    pub fn at(root: &Path, cwd: &Path, in_repo: bool) -> Self {
        let config = match AutoUnstageConfig::load(root) {
            Ok(config) => config,
            Err(err) => {
                warn!("failed to load config, using defaults: {err:#}");
                AutoUnstageConfig::default()
            }
        };
        let store = MarkerStore::new(&config.store_dir(root));

        Self {
            root: root.to_path_buf(),
            config,
            in_repo,
            store,
            cwd: cwd.to_path_buf(),
        }
    }

    /// Repository-relative key for a user-supplied path
    pub fn relative_path(&self, path: &str) -> Result<String> {
        repo_relative_path(&self.root, &self.cwd, path)
    }

    pub fn numbering(&self) -> LineNumbering {
        LineNumbering::from_one_based(self.config.display.one_based)
    }

    pub fn source(&self) -> WorkdirSource {
        WorkdirSource::new(&self.root)
    }

    pub fn marker_store(&self) -> &MarkerStore {
        &self.store
    }

    /// Load persisted marks into a session
    pub fn load(&self) -> Result<ProjectState> {
        let loaded = self.store.load()?;
        Ok(ProjectState {
            session: MarkerSession::new(loaded.rows),
            snapshots: loaded.snapshots,
        })
    }

    /// Persist a session's marks
    pub fn save(&self, state: &ProjectState) -> Result<()> {
        self.store.save(state.session.store(), &state.snapshots)
    }
}

/// Session plus the snapshots used to follow on-disk edits
pub struct ProjectState {
    pub session: MarkerSession,
    pub snapshots: BTreeMap<String, ContentSnapshot>,
}

impl ProjectState {
    /// Record the current content of `path` as reconciled
    pub fn record_snapshot(&mut self, source: &dyn DocumentSource, path: &str) {
        match source.read(path).ok().and_then(|c| ContentSnapshot::from_bytes(&c)) {
            Some(snapshot) => {
                self.snapshots.insert(path.to_string(), snapshot);
            }
            None => {
                self.snapshots.remove(path);
            }
        }
    }

    /// Forget the reconciled content of `path`
    pub fn drop_snapshot(&mut self, path: &str) {
        self.snapshots.remove(path);
    }

    /// Re-anchor the marks of `path` against its current on-disk content
    ///
    /// Returns the number of edits applied. Without a snapshot the current
    /// content is recorded and nothing moves.
    pub fn sync_path(&mut self, source: &dyn DocumentSource, path: &str) -> usize {
        let current = match source.read(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path, error = %e, "cannot read file to sync");
                return 0;
            }
        };

        let Some(snapshot) = self.snapshots.get(path) else {
            self.record_snapshot(source, path);
            return 0;
        };
        if snapshot.matches(&current) {
            return 0;
        }

        let Ok(text) = std::str::from_utf8(&current) else {
            warn!(path, "file is no longer text, marks left unchanged");
            self.snapshots.remove(path);
            return 0;
        };

        let edits = derive_edits(&snapshot.content, text);
        for edit in &edits {
            self.session.handle_edit(path, edit);
        }
        self.snapshots
            .insert(path.to_string(), ContentSnapshot::new(text));
        debug!(path, edits = edits.len(), "synced marks with work tree");
        edits.len()
    }

    /// Sync every marked path
    pub fn sync_all(&mut self, source: &dyn DocumentSource) -> usize {
        let paths: Vec<String> = self
            .session
            .store()
            .marked_paths()
            .into_iter()
            .map(str::to_string)
            .collect();
        paths
            .iter()
            .map(|path| self.sync_path(source, path))
            .sum()
    }
}
