//! Error types for the OVF import core library.

use std::path::PathBuf;

/// The main error type for OVF import operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// The descriptor could not be parsed as OVF XML.
    #[error("malformed OVF descriptor: {message}")]
    MalformedDescriptor { message: String },

    /// A section required for resolution is absent or empty.
    #[error("missing OVF section: {section}")]
    MissingSection { section: String },

    /// The descriptor has no virtual system.
    #[error("OVF descriptor does not contain a virtual system")]
    NoVirtualSystem,

    /// The virtual system has no virtual hardware section.
    #[error("virtual system does not contain a virtual hardware section")]
    NoVirtualHardware,

    /// No CPU item exists in the virtual hardware section.
    #[error("no CPU specification found in virtual hardware")]
    NoCpuSpec,

    /// No memory item exists in the virtual hardware section.
    #[error("no memory specification found in virtual hardware")]
    NoMemorySpec,

    /// An allocation-unit string does not match `byte * 2^(20|30|40)`.
    #[error("invalid allocation unit: '{units}'")]
    InvalidAllocationUnit { units: String },

    /// A capacity value is negative or not numeric.
    #[error("invalid capacity value: '{value}'")]
    InvalidCapacityValue { value: String },

    /// A disk item's host resource does not match `ovf:/disk/<diskId>`.
    #[error("invalid host resource format: '{host_resource}'")]
    InvalidHostResourceFormat { host_resource: String },

    /// A host resource names a disk absent from the disk section.
    #[error("disk reference '{disk_id}' not found in disk section")]
    DiskReferenceNotFound { disk_id: String },

    /// A virtual disk names a file absent from the references section.
    #[error("file reference '{file_ref}' not found in references")]
    FileReferenceNotFound { file_ref: String },

    /// A storage lookup or read failed.
    #[error("storage error: {message}")]
    StorageLookup { message: String },

    /// A referenced file does not exist in the OVF package.
    #[error("OVF reference '{href}' not found in package at '{package_path}'")]
    ReferenceNotFound {
        href: String,
        package_path: String,
    },
}

/// A specialized Result type for OVF import operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create a malformed-descriptor error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            message: message.into(),
        }
    }

    /// Create a missing-section error.
    pub fn missing_section(section: impl Into<String>) -> Self {
        Self::MissingSection {
            section: section.into(),
        }
    }

    /// Create an invalid-allocation-unit error.
    pub fn invalid_allocation_unit(units: impl Into<String>) -> Self {
        Self::InvalidAllocationUnit {
            units: units.into(),
        }
    }

    /// Create an invalid-capacity error.
    pub fn invalid_capacity(value: impl Into<String>) -> Self {
        Self::InvalidCapacityValue {
            value: value.into(),
        }
    }

    /// Create a storage lookup error.
    pub fn storage_lookup(message: impl Into<String>) -> Self {
        Self::StorageLookup {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}
