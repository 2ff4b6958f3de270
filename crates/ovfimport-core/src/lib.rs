//! OVF Import Core Library
//!
//! This crate parses, validates, and semantically resolves OVF (Open
//! Virtualization Format) descriptors for importing virtual appliances.
//!
//! # Overview
//!
//! An OVF package is a descriptor XML plus the disk files it references.
//! [`DescriptorLoader`] locates and parses the descriptor and validates
//! that every referenced file exists; the [`hardware`] module then
//! resolves the validated descriptor into typed facts (CPU count, memory
//! in MB, disk-to-file mapping with sizes in GB).
//!
//! # Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`descriptor`] - OVF descriptor model and XML parsing
//! - [`units`] - Allocation-unit parsing and capacity conversion
//! - [`hardware`] - Hardware resolution (CPUs, memory, disks)
//! - [`storage`] - Storage client contract and local implementation
//! - [`loader`] - Descriptor loading
//! - [`validator`] - Package reference validation
//!
//! # Quick Start
//!
//! ```no_run
//! use ovfimport_core::{hardware, DescriptorLoader, LocalStorageClient};
//!
//! let loader = DescriptorLoader::new(LocalStorageClient::new());
//! let descriptor = loader.load("/path/to/package").unwrap();
//!
//! let section = hardware::get_virtual_hardware_from_descriptor(&descriptor).unwrap();
//! let cpus = hardware::get_number_of_cpus(Some(section)).unwrap();
//! ```

pub mod descriptor;
pub mod error;
pub mod hardware;
pub mod loader;
pub mod storage;
pub mod units;
pub mod validator;

pub use error::{Error, Result};

// Re-export the main entry points for convenience
pub use descriptor::{parse_descriptor, Descriptor};
pub use hardware::{get_descriptor_and_disk_paths, DiskInfo};
pub use loader::DescriptorLoader;
pub use storage::{LocalStorageClient, ObjectHandle, StorageClient};
pub use validator::DescriptorValidator;
