//! Snapshots of a working directory as a tree of objects.
//!
//! The walk is depth-first and post-order: every file becomes a blob, every
//! directory becomes a tree written after all of its children. Two directories
//! with the same recursive contents always produce the same root id, whatever
//! order the filesystem lists them in.

use crate::tree::{self, FileMode, TreeEntry};
use crate::{ObjectId, ObjectStore, ObjectType, Result, StorageError};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Counters collected during a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    /// Blobs written (including ones already present).
    pub blobs: usize,
    /// Trees written (including ones already present).
    pub trees: usize,
    /// Entries skipped: ignored names and unsupported file kinds.
    pub skipped: usize,
}

/// Walks directories and writes their contents into an [`ObjectStore`].
#[derive(Debug)]
pub struct Snapshotter<'a> {
    store: &'a ObjectStore,
    stats: SnapshotStats,
}

#[derive(Clone)]
struct Child {
    name: Vec<u8>,
    path: PathBuf,
    file_type: fs::FileType,
}

impl<'a> Snapshotter<'a> {
    /// Creates a snapshotter writing into `store`.
    pub fn new(store: &'a ObjectStore) -> Self {
        Self {
            store,
            stats: SnapshotStats::default(),
        }
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> SnapshotStats {
        self.stats
    }

    /// Snapshots `dir` and returns the id of its tree.
    pub fn snapshot(&mut self, dir: impl AsRef<Path>) -> Result<ObjectId> {
        let dir = dir.as_ref();
        let id = self.write_dir(dir)?;
        tracing::info!(
            root = %dir.display(),
            tree = %id,
            blobs = self.stats.blobs,
            trees = self.stats.trees,
            skipped = self.stats.skipped,
            "snapshot complete"
        );
        Ok(id)
    }

    fn write_dir(&mut self, dir: &Path) -> Result<ObjectId> {
        let children = self.list_children(dir)?;
        self.write_children(dir, children)
    }

    /// Writes the tree for `dir` from its listed children, in whatever order
    /// they were listed.
    fn write_children(&mut self, dir: &Path, mut children: Vec<Child>) -> Result<ObjectId> {
        children.sort_by(|a, b| {
            tree::name_order(&a.name, a.file_type.is_dir(), &b.name, b.file_type.is_dir())
        });

        let mut entries = Vec::with_capacity(children.len());
        for child in children {
            let (mode, id) = if child.file_type.is_symlink() {
                (FileMode::Symlink, self.write_symlink(&child.path)?)
            } else if child.file_type.is_dir() {
                (FileMode::Tree, self.write_dir(&child.path)?)
            } else if child.file_type.is_file() {
                self.write_file(&child.path)?
            } else {
                tracing::trace!(path = %child.path.display(), "skipping special file");
                self.stats.skipped += 1;
                continue;
            };
            entries.push(TreeEntry::new(mode, child.name, id)?);
        }

        tree::sort_entries(&mut entries);
        let id = self.store.write(ObjectType::Tree, &tree::encode(&entries))?;
        self.stats.trees += 1;
        tracing::debug!(path = %dir.display(), tree = %id, entries = entries.len(), "wrote tree");
        Ok(id)
    }

    fn list_children(&mut self, dir: &Path) -> Result<Vec<Child>> {
        let mut children = Vec::new();
        let read_dir = fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| StorageError::io(dir, e))?;
            let path = entry.path();
            let name = entry.file_name();
            let name = os_bytes(&name);

            if self.store.config().is_ignored(&name) {
                tracing::trace!(path = %path.display(), "skipping ignored entry");
                self.stats.skipped += 1;
                continue;
            }

            let file_type = entry.file_type().map_err(|e| StorageError::io(&path, e))?;
            children.push(Child {
                name: name.into_owned(),
                path,
                file_type,
            });
        }
        Ok(children)
    }

    fn write_file(&mut self, path: &Path) -> Result<(FileMode, ObjectId)> {
        let metadata = fs::metadata(path).map_err(|e| StorageError::io(path, e))?;
        let mode = if is_executable(&metadata) {
            FileMode::Executable
        } else {
            FileMode::Regular
        };
        let content = fs::read(path).map_err(|e| StorageError::io(path, e))?;
        let id = self.store.write(ObjectType::Blob, &content)?;
        self.stats.blobs += 1;
        Ok((mode, id))
    }

    /// The blob of a symlink holds the link target, not what it points at.
    fn write_symlink(&mut self, path: &Path) -> Result<ObjectId> {
        let target = fs::read_link(path).map_err(|e| StorageError::io(path, e))?;
        let id = self
            .store
            .write(ObjectType::Blob, &os_bytes(target.as_os_str()))?;
        self.stats.blobs += 1;
        Ok(id)
    }
}

/// Snapshots `dir` into `store` and returns the root tree id.
pub fn snapshot(store: &ObjectStore, dir: impl AsRef<Path>) -> Result<ObjectId> {
    Snapshotter::new(store).snapshot(dir)
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o100 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}

#[cfg(unix)]
fn os_bytes(s: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(s.as_bytes())
}

#[cfg(not(unix))]
fn os_bytes(s: &OsStr) -> Cow<'_, [u8]> {
    match s.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreConfig;
    use tempfile::TempDir;

    fn test_store(root: &Path) -> ObjectStore {
        let git_dir = root.join(".git");
        fs::create_dir_all(git_dir.join("objects")).unwrap();
        ObjectStore::open(&git_dir, StoreConfig::default()).unwrap()
    }

    fn decoded(store: &ObjectStore, id: &ObjectId) -> Vec<(FileMode, String)> {
        let object = store.read(id).unwrap();
        assert_eq!(object.object_type, ObjectType::Tree);
        tree::decode(&object.data)
            .unwrap()
            .iter()
            .map(|e| (e.mode(), e.name_lossy().into_owned()))
            .collect()
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        let work = dir.path().join("work");
        fs::create_dir(&work).unwrap();

        let id = snapshot(&store, &work).unwrap();
        assert_eq!(id.to_hex().as_str(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
        assert!(store.contains(&id));
    }

    #[test]
    fn test_file_and_subdirectory() {
        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        fs::write(dir.path().join("a.txt"), b"alpha\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("inner.txt"), b"inner\n").unwrap();

        let mut snapshotter = Snapshotter::new(&store);
        let id = snapshotter.snapshot(dir.path()).unwrap();

        assert_eq!(
            decoded(&store, &id),
            vec![
                (FileMode::Regular, "a.txt".to_string()),
                (FileMode::Tree, "sub".to_string()),
            ]
        );
        // The marker directory is never part of the snapshot.
        let stats = snapshotter.stats();
        assert_eq!(stats.blobs, 2);
        assert_eq!(stats.trees, 2);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_nested_empty_directory_is_recorded() {
        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        fs::create_dir(dir.path().join("empty")).unwrap();

        let id = snapshot(&store, dir.path()).unwrap();
        let object = store.read(&id).unwrap();
        let entries = tree::decode(&object.data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mode(), FileMode::Tree);
        assert_eq!(
            entries[0].id().to_hex().as_str(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_and_symlink_modes() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        let script = dir.path().join("run.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("run.sh", dir.path().join("link")).unwrap();

        let id = snapshot(&store, dir.path()).unwrap();
        let object = store.read(&id).unwrap();
        let entries = tree::decode(&object.data).unwrap();

        let link = entries.iter().find(|e| e.name() == b"link").unwrap();
        assert_eq!(link.mode(), FileMode::Symlink);
        let target = store.read(&link.id()).unwrap();
        assert_eq!(target.data.as_ref(), b"run.sh");

        let run = entries.iter().find(|e| e.name() == b"run.sh").unwrap();
        assert_eq!(run.mode(), FileMode::Executable);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_stored() {
        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        std::os::unix::fs::symlink("does/not/exist", dir.path().join("dangling")).unwrap();

        let id = snapshot(&store, dir.path()).unwrap();
        assert_eq!(decoded(&store, &id), vec![(FileMode::Symlink, "dangling".to_string())]);
    }

    #[test]
    fn test_directory_sorts_after_dotted_file() {
        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        fs::create_dir(dir.path().join("foo")).unwrap();
        fs::write(dir.path().join("foo").join("x"), b"x").unwrap();
        fs::write(dir.path().join("foo.txt"), b"t").unwrap();
        fs::write(dir.path().join("foo-bar"), b"b").unwrap();

        let id = snapshot(&store, dir.path()).unwrap();
        let names: Vec<String> = decoded(&store, &id).into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, ["foo-bar", "foo.txt", "foo"]);
    }

    #[test]
    fn test_listing_order_does_not_change_tree() {
        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        for name in ["foo-bar", "foo.txt", "b", "a0"] {
            fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        for sub in ["foo", "a"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("x"), sub.as_bytes()).unwrap();
        }

        let expected = snapshot(&store, dir.path()).unwrap();

        let mut snapshotter = Snapshotter::new(&store);
        let listed = snapshotter.list_children(dir.path()).unwrap();
        assert_eq!(listed.len(), 6);

        let mut reversed = listed.clone();
        reversed.reverse();
        let mut rotated = listed.clone();
        rotated.rotate_left(listed.len() / 2);
        let mut by_name_desc = listed.clone();
        by_name_desc.sort_by(|a, b| b.name.cmp(&a.name));

        for children in [listed, reversed, rotated, by_name_desc] {
            let id = snapshotter.write_children(dir.path(), children).unwrap();
            assert_eq!(id, expected);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_is_skipped() {
        use std::os::unix::net::UnixListener;

        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        fs::write(dir.path().join("a.txt"), b"alpha\n").unwrap();
        let _listener = UnixListener::bind(dir.path().join("sock")).unwrap();

        let mut snapshotter = Snapshotter::new(&store);
        let id = snapshotter.snapshot(dir.path()).unwrap();

        assert_eq!(decoded(&store, &id), vec![(FileMode::Regular, "a.txt".to_string())]);
        let stats = snapshotter.stats();
        assert_eq!(stats.blobs, 1);
        // `.git` and the socket.
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_missing_directory_reports_path() {
        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        let missing = dir.path().join("nope");

        match snapshot(&store, &missing).unwrap_err() {
            StorageError::Io { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_aborts() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = test_store(dir.path());
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("secret"), b"s").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind a privileged user.
        let readable = fs::read_dir(&locked).is_ok();
        let result = snapshot(&store, dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            match result.unwrap_err() {
                StorageError::Io { path, .. } => assert!(path.starts_with(&locked)),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
