//! CLI command implementations.
//!
//! Each command writes its output to the given writer so the binary can hand
//! in a locked stdout and tests can hand in a buffer.

use husk_storage::{Repository, StorageError, StoreConfig, DEFAULT_MARKER_DIR};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Symbolic ref written into a fresh repository's `HEAD`.
const INITIAL_HEAD: &str = "ref: refs/heads/main\n";

/// CLI errors. Filesystem failures carry their path inside `Storage`; `Io`
/// is left for the output stream.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// What `cat-file` prints about an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatFileMode {
    /// Blob content, or tree rows.
    Pretty,
    /// The object type name.
    Type,
    /// The payload size in bytes.
    Size,
}

/// A working tree and the configuration used to open its store.
#[derive(Debug, Clone)]
pub struct Workspace {
    work_tree: PathBuf,
    config: StoreConfig,
}

impl Workspace {
    pub fn new(work_tree: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self {
            work_tree: work_tree.into(),
            config,
        }
    }

    /// Builds a workspace, loading configuration from `config_path` if given.
    pub fn load(work_tree: impl Into<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => StoreConfig::load_yaml(path)?,
            None => StoreConfig::default(),
        };
        Ok(Self::new(work_tree, config))
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    pub fn git_dir(&self) -> PathBuf {
        self.work_tree.join(DEFAULT_MARKER_DIR)
    }

    fn open(&self) -> Result<Repository> {
        Ok(Repository::open(self.git_dir(), self.config.clone())?)
    }
}

/// Initialize a repository in the workspace. Safe to run twice; an existing
/// `HEAD` is left alone.
pub fn init(workspace: &Workspace, out: &mut impl Write) -> Result<()> {
    let git_dir = workspace.git_dir();
    tracing::info!(path = %git_dir.display(), "Initializing repository");

    for dir in [git_dir.join("objects"), git_dir.join("refs").join("heads")] {
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
    }

    let head = git_dir.join("HEAD");
    let existed = head.exists();
    if !existed {
        std::fs::write(&head, INITIAL_HEAD).map_err(|e| StorageError::io(&head, e))?;
    }

    let verb = if existed { "Reinitialized existing" } else { "Initialized empty" };
    writeln!(out, "{verb} Husk repository in {}", git_dir.display())?;
    Ok(())
}

/// Print a file's blob id, storing the blob when `write` is set.
pub fn hash_object(
    workspace: &Workspace,
    file: &Path,
    write: bool,
    out: &mut impl Write,
) -> Result<()> {
    tracing::debug!(file = %file.display(), write, "Hashing file");

    let id = if write {
        workspace.open()?.store_blob(file)?
    } else {
        husk_storage::hash_file(file)?
    };
    writeln!(out, "{id}")?;
    Ok(())
}

/// Print an object's content, type, or size.
pub fn cat_file(
    workspace: &Workspace,
    mode: CatFileMode,
    id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let repo = workspace.open()?;
    match mode {
        CatFileMode::Pretty => out.write_all(&repo.pretty(id)?)?,
        CatFileMode::Type => {
            let (object_type, _) = repo.read_object(id)?;
            writeln!(out, "{object_type}")?;
        }
        CatFileMode::Size => {
            let (_, payload) = repo.read_object(id)?;
            writeln!(out, "{}", payload.len())?;
        }
    }
    Ok(())
}

/// List the entries of a tree.
pub fn ls_tree(
    workspace: &Workspace,
    id: &str,
    name_only: bool,
    out: &mut impl Write,
) -> Result<()> {
    for row in workspace.open()?.list_tree(id, name_only)? {
        writeln!(out, "{row}")?;
    }
    Ok(())
}

/// Snapshot the working tree and print the root tree id.
pub fn write_tree(workspace: &Workspace, out: &mut impl Write) -> Result<()> {
    let id = workspace.open()?.snapshot(workspace.work_tree())?;
    writeln!(out, "{id}")?;
    Ok(())
}
