//! OVF descriptor loading.
//!
//! Locates the `.ovf` object in a package, reads and parses it, and runs
//! the package validation before handing the descriptor to the caller.

use tracing::debug;

use crate::descriptor::{parse_descriptor, Descriptor};
use crate::error::{Error, Result};
use crate::storage::StorageClient;
use crate::validator::DescriptorValidator;

/// Suffix identifying the descriptor object within a package.
const DESCRIPTOR_SUFFIX: &str = ".ovf";

/// Loads and validates OVF descriptors from a storage location.
pub struct DescriptorLoader<S: StorageClient> {
    storage: S,
}

impl<S: StorageClient> DescriptorLoader<S> {
    /// Create a loader over the given storage client.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Load the descriptor of the OVF package at `package_path`.
    ///
    /// Steps, each failing fast: locate the `.ovf` object, read its
    /// content, parse it, validate the package's file references.
    ///
    /// # Errors
    ///
    /// Storage lookup and read failures propagate verbatim; parse
    /// failures are [`Error::MalformedDescriptor`]; validation failures
    /// are [`Error::ReferenceNotFound`].
    pub fn load(&self, package_path: &str) -> Result<Descriptor> {
        let handle = self
            .storage
            .find_object_by_suffix(package_path, DESCRIPTOR_SUFFIX)?;
        debug!(object = %handle.path, "found OVF descriptor");

        let content = self.storage.read_content(&handle)?;
        let xml = String::from_utf8(content)
            .map_err(|err| Error::malformed(format!("descriptor is not UTF-8: {err}")))?;

        let descriptor = parse_descriptor(&xml)?;
        debug!(
            files = descriptor
                .references
                .as_ref()
                .map(|r| r.files.len())
                .unwrap_or(0),
            "parsed OVF descriptor"
        );

        let validator = DescriptorValidator::new(&self.storage);
        validator.validate(descriptor, package_path)
    }
}
