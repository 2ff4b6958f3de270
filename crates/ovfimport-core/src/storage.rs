//! Storage collaborator contract.
//!
//! The loader and validator only ever locate objects and read their
//! content, so that is the whole contract. Production deployments put an
//! object-store client behind [`StorageClient`]; [`LocalStorageClient`]
//! serves the CLI and tests from a plain directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Opaque locator for an object found in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    /// Storage-specific path of the object.
    pub path: String,
}

/// Read access to the storage holding an OVF package.
pub trait StorageClient {
    /// Locate the object named exactly `name` under `base_path`.
    ///
    /// The name is taken literally, so a reference to a hidden file such
    /// as `.nvram` looks up that file and nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageLookup`] if no such object exists.
    fn find_object(&self, base_path: &str, name: &str) -> Result<ObjectHandle>;

    /// Locate the first object under `base_path` whose name ends with
    /// `suffix` (e.g. `.ovf`), in lexicographic order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageLookup`] if no object matches.
    fn find_object_by_suffix(&self, base_path: &str, suffix: &str) -> Result<ObjectHandle>;

    /// Read the full content of a previously located object.
    fn read_content(&self, handle: &ObjectHandle) -> Result<Vec<u8>>;
}

/// [`StorageClient`] over a local directory tree.
#[derive(Debug, Clone, Default)]
pub struct LocalStorageClient;

impl LocalStorageClient {
    /// Create a new local storage client.
    pub fn new() -> Self {
        Self
    }
}

impl StorageClient for LocalStorageClient {
    fn find_object(&self, base_path: &str, name: &str) -> Result<ObjectHandle> {
        let path = Path::new(base_path).join(name);
        if path.is_file() {
            Ok(ObjectHandle {
                path: path.to_string_lossy().into_owned(),
            })
        } else {
            Err(Error::storage_lookup(format!(
                "object '{name}' not found under '{base_path}'"
            )))
        }
    }

    fn find_object_by_suffix(&self, base_path: &str, suffix: &str) -> Result<ObjectHandle> {
        let base = Path::new(base_path);
        let extension = suffix.strip_prefix('.').unwrap_or(suffix);

        let mut matches: Vec<PathBuf> = fs::read_dir(base)
            .map_err(|e| Error::io(e, base))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map(|ext| ext.eq_ignore_ascii_case(extension))
                        .unwrap_or(false)
            })
            .collect();
        matches.sort();
        match matches.into_iter().next() {
            Some(path) => Ok(ObjectHandle {
                path: path.to_string_lossy().into_owned(),
            }),
            None => Err(Error::storage_lookup(format!(
                "no object with suffix '{suffix}' under '{base_path}'"
            ))),
        }
    }

    fn read_content(&self, handle: &ObjectHandle) -> Result<Vec<u8>> {
        fs::read(&handle.path).map_err(|e| Error::io(e, &handle.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &[u8]) {
        let mut file = File::create(dir.join(name)).unwrap();
        file.write_all(content).unwrap();
    }

    #[test]
    fn test_find_object_by_exact_name() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "disk1.vmdk", b"data");

        let client = LocalStorageClient::new();
        let handle = client
            .find_object(dir.path().to_str().unwrap(), "disk1.vmdk")
            .unwrap();
        assert!(handle.path.ends_with("disk1.vmdk"));
        assert_eq!(client.read_content(&handle).unwrap(), b"data");
    }

    #[test]
    fn test_find_object_by_suffix_picks_first_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.ovf", b"<b/>");
        write_file(dir.path(), "a.ovf", b"<a/>");
        write_file(dir.path(), "c.txt", b"not me");

        let client = LocalStorageClient::new();
        let handle = client
            .find_object_by_suffix(dir.path().to_str().unwrap(), ".ovf")
            .unwrap();
        assert!(handle.path.ends_with("a.ovf"));
    }

    #[test]
    fn test_find_object_takes_hidden_file_names_literally() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "other.nvram", b"wrong object");
        write_file(dir.path(), ".nvram", b"right object");

        let client = LocalStorageClient::new();
        let handle = client
            .find_object(dir.path().to_str().unwrap(), ".nvram")
            .unwrap();
        assert!(handle.path.ends_with("/.nvram"));
        assert_eq!(client.read_content(&handle).unwrap(), b"right object");
    }

    #[test]
    fn test_find_object_hidden_name_never_falls_back_to_suffix_match() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "other.nvram", b"wrong object");

        let client = LocalStorageClient::new();
        let err = client
            .find_object(dir.path().to_str().unwrap(), ".nvram")
            .unwrap_err();
        assert!(matches!(err, Error::StorageLookup { .. }));
    }

    #[test]
    fn test_find_object_missing_is_lookup_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = LocalStorageClient::new();

        let err = client
            .find_object_by_suffix(dir.path().to_str().unwrap(), ".ovf")
            .unwrap_err();
        assert!(matches!(err, Error::StorageLookup { .. }));

        let err = client
            .find_object(dir.path().to_str().unwrap(), "missing.vmdk")
            .unwrap_err();
        assert!(matches!(err, Error::StorageLookup { .. }));
    }
}
