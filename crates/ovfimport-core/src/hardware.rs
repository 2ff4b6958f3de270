//! Hardware resolution over a parsed OVF descriptor.
//!
//! Walks the virtual hardware items of a descriptor to extract typed
//! facts: the number of CPUs, memory in MB, and the disk-to-file mapping
//! with sizes normalized to GB.
//!
//! Disk resolution joins three independently indexed collections: a disk
//! item's first host resource (`ovf:/disk/<diskId>`) names a
//! [`VirtualDisk`], whose `fileRef` names a [`FileReference`]. Controller
//! items and `Parent` links are not part of the join; a disk with a
//! missing or invalid parent controller still resolves.

use std::collections::HashMap;

use crate::descriptor::{
    Descriptor, DiskSection, FileReference, VirtualDisk, VirtualHardwareSection, VirtualSystem,
};
use crate::error::{Error, Result};
use crate::loader::DescriptorLoader;
use crate::storage::StorageClient;
use crate::units;

/// CIM resource-type codes used in OVF hardware items.
pub mod resource_type {
    /// Processor.
    pub const CPU: u16 = 3;
    /// Memory.
    pub const MEMORY: u16 = 4;
    /// IDE controller.
    pub const IDE_CONTROLLER: u16 = 5;
    /// Parallel SCSI HBA.
    pub const PARALLEL_SCSI_CONTROLLER: u16 = 6;
    /// iSCSI HBA.
    pub const ISCSI_CONTROLLER: u16 = 8;
    /// Disk drive.
    pub const DISK: u16 = 17;
    /// SATA controller.
    pub const SATA_CONTROLLER: u16 = 20;
    /// USB controller.
    pub const USB_CONTROLLER: u16 = 23;
}

/// Host-resource prefix naming a virtual disk.
const DISK_HOST_RESOURCE_PREFIX: &str = "ovf:/disk/";

/// A resolved disk: the backing file within the package and its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskInfo {
    /// Path of the backing file, relative to the package root.
    pub file_path: String,
    /// Disk capacity in whole GB.
    pub size_gb: u64,
}

/// Get the virtual system of a descriptor.
///
/// # Errors
///
/// Returns [`Error::NoVirtualSystem`] if the descriptor has none.
pub fn get_virtual_system(descriptor: &Descriptor) -> Result<&VirtualSystem> {
    descriptor.virtual_system.as_ref().ok_or(Error::NoVirtualSystem)
}

/// Get the first virtual hardware section of a virtual system.
///
/// # Errors
///
/// Returns [`Error::NoVirtualHardware`] if the system has none.
pub fn get_virtual_hardware_section(system: &VirtualSystem) -> Result<&VirtualHardwareSection> {
    system.virtual_hardware.first().ok_or(Error::NoVirtualHardware)
}

/// Get the first virtual hardware section straight from a descriptor.
pub fn get_virtual_hardware_from_descriptor(
    descriptor: &Descriptor,
) -> Result<&VirtualHardwareSection> {
    get_virtual_hardware_section(get_virtual_system(descriptor)?)
}

/// Get the number of CPUs from the first CPU item, in document order.
///
/// # Errors
///
/// Returns [`Error::MissingSection`] if `hardware` is absent and
/// [`Error::NoCpuSpec`] if no CPU item carries a quantity.
pub fn get_number_of_cpus(hardware: Option<&VirtualHardwareSection>) -> Result<u64> {
    let hardware = hardware
        .ok_or_else(|| Error::missing_section("virtual hardware"))?;
    hardware
        .items
        .iter()
        .find(|item| item.resource_type == Some(resource_type::CPU))
        .and_then(|item| item.virtual_quantity)
        .ok_or(Error::NoCpuSpec)
}

/// Get the memory amount in MB from the first memory item, in document
/// order. The item's quantity is scaled by its allocation units (e.g.
/// quantity 7 with `byte * 2^30` yields 7168).
///
/// # Errors
///
/// Returns [`Error::MissingSection`] if `hardware` is absent,
/// [`Error::NoMemorySpec`] if no memory item carries a quantity, and
/// [`Error::InvalidAllocationUnit`] if the item's units are missing or
/// unrecognized.
pub fn get_memory_in_mb(hardware: Option<&VirtualHardwareSection>) -> Result<u64> {
    let hardware = hardware
        .ok_or_else(|| Error::missing_section("virtual hardware"))?;
    let item = hardware
        .items
        .iter()
        .find(|item| item.resource_type == Some(resource_type::MEMORY))
        .ok_or(Error::NoMemorySpec)?;

    let quantity = item.virtual_quantity.ok_or(Error::NoMemorySpec)?;
    let allocation_units = item
        .allocation_units
        .as_deref()
        .ok_or_else(|| Error::invalid_allocation_unit("<none>"))?;

    units::quantity_in_mb(quantity, allocation_units)
}

/// Resolve every disk item of a hardware section to its backing file.
///
/// Disk items are processed in document order and the output preserves
/// that order. Controller items are ignored entirely.
///
/// # Errors
///
/// Returns [`Error::MissingSection`] if any input is absent, the disk
/// list is empty, or the hardware section holds no disk items. Individual
/// resolution failures are [`Error::InvalidHostResourceFormat`],
/// [`Error::DiskReferenceNotFound`] and [`Error::FileReferenceNotFound`];
/// the first failure aborts the whole call.
pub fn get_disk_infos(
    hardware: Option<&VirtualHardwareSection>,
    disk_section: Option<&DiskSection>,
    files: Option<&[FileReference]>,
) -> Result<Vec<DiskInfo>> {
    let hardware = hardware
        .ok_or_else(|| Error::missing_section("virtual hardware"))?;
    let disk_section = disk_section
        .ok_or_else(|| Error::missing_section("disk section"))?;
    if disk_section.disks.is_empty() {
        return Err(Error::missing_section("disks in disk section"));
    }
    let files = files.ok_or_else(|| Error::missing_section("file references"))?;

    let disks_by_id: HashMap<&str, &VirtualDisk> = disk_section
        .disks
        .iter()
        .map(|disk| (disk.disk_id.as_str(), disk))
        .collect();
    let files_by_id: HashMap<&str, &FileReference> = files
        .iter()
        .map(|file| (file.id.as_str(), file))
        .collect();

    let mut infos = Vec::new();
    for item in &hardware.items {
        if item.resource_type != Some(resource_type::DISK) {
            continue;
        }

        let disk_id = parse_disk_host_resource(item.host_resource.first())?;
        let disk = disks_by_id
            .get(disk_id)
            .ok_or_else(|| Error::DiskReferenceNotFound {
                disk_id: disk_id.to_string(),
            })?;

        let file_ref = disk
            .file_ref
            .as_deref()
            .ok_or_else(|| Error::FileReferenceNotFound {
                file_ref: format!("<none> for disk '{}'", disk.disk_id),
            })?;
        let file = files_by_id
            .get(file_ref)
            .ok_or_else(|| Error::FileReferenceNotFound {
                file_ref: file_ref.to_string(),
            })?;

        let units = disk.capacity_allocation_units.as_deref().unwrap_or("");
        let size_gb = units::capacity_in_gb(&disk.capacity, units)?;

        infos.push(DiskInfo {
            file_path: file.href.clone(),
            size_gb,
        });
    }

    if infos.is_empty() {
        return Err(Error::missing_section("disk items in virtual hardware"));
    }

    Ok(infos)
}

/// Load the package at `package_path` and resolve its disks in one call.
///
/// Each returned disk path is the package path joined with the backing
/// file's href, so callers get locations addressable in storage rather
/// than package-relative names.
///
/// # Errors
///
/// Load failures propagate from [`DescriptorLoader::load`]. Resolution
/// failures are [`Error::NoVirtualSystem`], [`Error::NoVirtualHardware`]
/// and the errors of [`get_disk_infos`].
pub fn get_descriptor_and_disk_paths<S: StorageClient>(
    loader: &DescriptorLoader<S>,
    package_path: &str,
) -> Result<(Descriptor, Vec<DiskInfo>)> {
    let descriptor = loader.load(package_path)?;
    let hardware = get_virtual_hardware_from_descriptor(&descriptor)?;
    let mut infos = get_disk_infos(
        Some(hardware),
        descriptor.disk.as_ref(),
        descriptor.references.as_ref().map(|r| r.files.as_slice()),
    )?;
    for info in &mut infos {
        info.file_path = join_package_path(package_path, &info.file_path);
    }
    Ok((descriptor, infos))
}

/// Join a package path and an href without doubling the separator.
fn join_package_path(package_path: &str, href: &str) -> String {
    if package_path.is_empty() || package_path.ends_with('/') {
        format!("{package_path}{href}")
    } else {
        format!("{package_path}/{href}")
    }
}

/// Extract the disk id from a `ovf:/disk/<diskId>` host resource.
fn parse_disk_host_resource(host_resource: Option<&String>) -> Result<&str> {
    let host_resource = host_resource.ok_or_else(|| Error::InvalidHostResourceFormat {
        host_resource: "<none>".to_string(),
    })?;
    host_resource
        .strip_prefix(DISK_HOST_RESOURCE_PREFIX)
        .filter(|disk_id| !disk_id.is_empty())
        .ok_or_else(|| Error::InvalidHostResourceFormat {
            host_resource: host_resource.clone(),
        })
}
