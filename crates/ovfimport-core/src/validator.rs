//! OVF package validation.
//!
//! Confirms that every file named by a descriptor's references section
//! actually exists in the package's storage location. One existence check
//! is issued per reference, sequentially, and the first missing reference
//! fails the whole validation.

use tracing::debug;

use crate::descriptor::{Descriptor, FileReference};
use crate::error::{Error, Result};
use crate::storage::StorageClient;

/// Validates OVF packages against their storage location.
pub struct DescriptorValidator<'a, S: StorageClient> {
    storage: &'a S,
}

impl<'a, S: StorageClient> DescriptorValidator<'a, S> {
    /// Create a validator over the given storage client.
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Validate a descriptor against the package at `package_path`.
    ///
    /// A descriptor without a references section has nothing to validate
    /// and passes. Ownership of the descriptor passes back to the caller
    /// on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceNotFound`] naming the first reference
    /// whose file does not exist in the package.
    pub fn validate(&self, descriptor: Descriptor, package_path: &str) -> Result<Descriptor> {
        if let Some(references) = &descriptor.references {
            self.check_references_exist(&references.files, package_path)?;
        }
        Ok(descriptor)
    }

    fn check_references_exist(
        &self,
        references: &[FileReference],
        package_path: &str,
    ) -> Result<()> {
        for reference in references {
            debug!(href = %reference.href, package = %package_path, "checking OVF reference");
            if self
                .storage
                .find_object(package_path, &reference.href)
                .is_err()
            {
                return Err(Error::ReferenceNotFound {
                    href: reference.href.clone(),
                    package_path: package_path.to_string(),
                });
            }
        }
        Ok(())
    }
}
