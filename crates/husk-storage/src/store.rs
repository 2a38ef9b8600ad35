//! Loose object store on disk.
//!
//! Objects live at `objects/<first 2 hex>/<remaining 38 hex>` under the
//! repository marker directory. Each file holds the zlib-compressed frame.
//! Files are created once, fully formed, and never modified.

use crate::codec;
use crate::{Object, ObjectId, ObjectType, Result, StorageError, StoreConfig};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Content-addressed object store bound to one repository directory.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    git_dir: PathBuf,
    objects_dir: PathBuf,
    config: StoreConfig,
}

impl ObjectStore {
    /// Opens the store under `git_dir`, which must already contain `objects/`.
    pub fn open(git_dir: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let git_dir = git_dir.as_ref().to_path_buf();
        let objects_dir = git_dir.join("objects");
        if !objects_dir.is_dir() {
            return Err(StorageError::RepositoryNotInitialized(git_dir));
        }
        config.validate()?;

        tracing::debug!(path = %objects_dir.display(), "opened object store");
        Ok(Self {
            git_dir,
            objects_dir,
            config,
        })
    }

    /// The repository marker directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The `objects/` directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// The configuration in effect.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the file backing `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        let (dir, file) = hex.fan_out();
        self.objects_dir.join(dir).join(file)
    }

    /// Checks if an object exists.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }

    /// Stores a payload as an object of the given type and returns its id.
    ///
    /// Writing an object that already exists is a no-op.
    pub fn write(&self, object_type: ObjectType, payload: &[u8]) -> Result<ObjectId> {
        let mut frame = object_type.header(payload.len());
        frame.extend_from_slice(payload);
        let id = ObjectId::compute(&frame);

        let path = self.object_path(&id);
        if path.is_file() {
            tracing::trace!(id = %id, "object already present");
            return Ok(id);
        }

        let compressed = codec::compress(&frame, self.config.compression)?;
        self.persist(&path, &compressed)?;

        tracing::debug!(
            id = %id,
            kind = %object_type,
            size = payload.len(),
            stored = compressed.len(),
            "wrote object"
        );
        Ok(id)
    }

    /// Stores an object and returns its id.
    pub fn write_object(&self, object: &Object) -> Result<ObjectId> {
        self.write(object.object_type, &object.data)
    }

    /// Stores the contents of a file as a blob.
    pub fn write_blob_file(&self, path: impl AsRef<Path>) -> Result<ObjectId> {
        let path = path.as_ref();
        let content = fs::read(path).map_err(|e| StorageError::io(path, e))?;
        self.write(ObjectType::Blob, &content)
    }

    /// Writes `bytes` to a temporary file next to `path`, then moves it into
    /// place without replacing an existing file.
    fn persist(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| StorageError::io(path, ErrorKind::InvalidInput.into()))?;
        // Succeeds when another writer created the fan-out directory first.
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix("tmp_obj_")
            .tempfile_in(dir)
            .map_err(|e| StorageError::io(dir, e))?;
        tmp.write_all(bytes)
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        set_object_permissions(tmp.as_file(), self.config.read_only_objects)
            .map_err(|e| StorageError::io(tmp.path(), e))?;

        match tmp.persist_noclobber(path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                tracing::trace!(path = %path.display(), "lost write race, keeping existing object");
                Ok(())
            }
            Err(e) => Err(StorageError::io(path, e.error)),
        }
    }

    /// Retrieves an object by id.
    ///
    /// The stored frame is checked against `id`, so a file whose contents
    /// were altered is reported as corrupt.
    pub fn read(&self, id: &ObjectId) -> Result<Object> {
        let hex = id.to_hex();
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::ObjectNotFound(hex.to_string()));
            }
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        let frame = codec::decompress(&compressed).map_err(|e| e.with_id(hex.as_str()))?;
        let object = Object::from_frame(&frame).map_err(|e| e.with_id(hex.as_str()))?;

        if ObjectId::compute(&frame) != *id {
            return Err(StorageError::CorruptObject {
                id: hex.to_string(),
                reason: "contents do not hash to the object id".to_string(),
            });
        }

        tracing::trace!(
            id = %hex,
            kind = %object.object_type,
            size = object.size(),
            "read object"
        );
        Ok(object)
    }

    /// Lists all object ids in the store.
    pub fn list_objects(&self) -> Result<Vec<ObjectId>> {
        let mut ids = Vec::new();
        let fan_outs =
            fs::read_dir(&self.objects_dir).map_err(|e| StorageError::io(&self.objects_dir, e))?;
        for fan_out in fan_outs {
            let fan_out = fan_out.map_err(|e| StorageError::io(&self.objects_dir, e))?;
            let prefix = fan_out.file_name();
            let Some(prefix) = prefix.to_str().filter(|p| p.len() == 2) else {
                continue;
            };
            if !fan_out.path().is_dir() {
                continue;
            }
            let files =
                fs::read_dir(fan_out.path()).map_err(|e| StorageError::io(fan_out.path(), e))?;
            for file in files {
                let file = file.map_err(|e| StorageError::io(fan_out.path(), e))?;
                let name = file.file_name();
                let Some(rest) = name.to_str() else {
                    continue;
                };
                if let Ok(id) = ObjectId::from_hex(&format!("{prefix}{rest}")) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(unix)]
fn set_object_permissions(file: &fs::File, read_only: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if read_only { 0o444 } else { 0o644 };
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_object_permissions(file: &fs::File, read_only: bool) -> std::io::Result<()> {
    let mut permissions = file.metadata()?.permissions();
    permissions.set_readonly(read_only);
    file.set_permissions(permissions)
}
