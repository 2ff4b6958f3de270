//! Integration tests for descriptor loading and package validation.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use ovfimport_core::error::Error;
use ovfimport_core::hardware;
use ovfimport_core::{DescriptorLoader, DescriptorValidator, LocalStorageClient};

const PACKAGE_OVF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Envelope xmlns:ovf="http://schemas.dmtf.org/ovf/envelope/1">
  <References>
    <File ovf:href="disk1.vmdk" ovf:id="file1" ovf:size="1024"/>
    <File ovf:href="disk2.vmdk" ovf:id="file2" ovf:size="512"/>
  </References>
  <DiskSection>
    <Info>Virtual disks</Info>
    <Disk ovf:capacity="20" ovf:capacityAllocationUnits="byte * 2^30" ovf:diskId="vmdisk1" ovf:fileRef="file1"/>
    <Disk ovf:capacity="1" ovf:capacityAllocationUnits="byte * 2^30" ovf:diskId="vmdisk2" ovf:fileRef="file2"/>
  </DiskSection>
  <VirtualSystem ovf:id="vm1">
    <Info>A virtual machine</Info>
    <Name>vm1</Name>
    <VirtualHardwareSection>
      <Info>Hardware</Info>
      <Item>
        <rasd:InstanceID>1</rasd:InstanceID>
        <rasd:ResourceType>3</rasd:ResourceType>
        <rasd:VirtualQuantity>2</rasd:VirtualQuantity>
      </Item>
      <Item>
        <rasd:AllocationUnits>byte * 2^30</rasd:AllocationUnits>
        <rasd:InstanceID>2</rasd:InstanceID>
        <rasd:ResourceType>4</rasd:ResourceType>
        <rasd:VirtualQuantity>4</rasd:VirtualQuantity>
      </Item>
      <Item>
        <rasd:HostResource>ovf:/disk/vmdisk1</rasd:HostResource>
        <rasd:InstanceID>6</rasd:InstanceID>
        <rasd:ResourceType>17</rasd:ResourceType>
      </Item>
      <Item>
        <rasd:HostResource>ovf:/disk/vmdisk2</rasd:HostResource>
        <rasd:InstanceID>7</rasd:InstanceID>
        <rasd:ResourceType>17</rasd:ResourceType>
      </Item>
    </VirtualHardwareSection>
  </VirtualSystem>
</Envelope>
"#;

fn write_file(dir: &Path, name: &str, content: &[u8]) {
    let mut file = File::create(dir.join(name)).unwrap();
    file.write_all(content).unwrap();
}

/// Lay out a complete package: descriptor plus both referenced disks.
fn write_package(dir: &Path) {
    write_file(dir, "appliance.ovf", PACKAGE_OVF.as_bytes());
    write_file(dir, "disk1.vmdk", b"disk one content");
    write_file(dir, "disk2.vmdk", b"disk two content");
}

#[test]
fn test_load_valid_package() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path());

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let descriptor = loader.load(dir.path().to_str().unwrap()).unwrap();

    let references = descriptor.references.as_ref().unwrap();
    assert_eq!(2, references.files.len());

    let section = hardware::get_virtual_hardware_from_descriptor(&descriptor).unwrap();
    assert_eq!(2, hardware::get_number_of_cpus(Some(section)).unwrap());
    assert_eq!(4096, hardware::get_memory_in_mb(Some(section)).unwrap());

    let infos = hardware::get_disk_infos(
        Some(section),
        descriptor.disk.as_ref(),
        descriptor.references.as_ref().map(|r| r.files.as_slice()),
    )
    .unwrap();
    assert_eq!(2, infos.len());
    assert_eq!("disk1.vmdk", infos[0].file_path);
    assert_eq!(20, infos[0].size_gb);
    assert_eq!("disk2.vmdk", infos[1].file_path);
    assert_eq!(1, infos[1].size_gb);
}

#[test]
fn test_load_without_descriptor_object() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "disk1.vmdk", b"content");

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = loader.load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::StorageLookup { .. }));
}

#[test]
fn test_load_malformed_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "appliance.ovf", b"<Envelope><References>");

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = loader.load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::MalformedDescriptor { .. }));
}

#[test]
fn test_load_non_utf8_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "appliance.ovf", &[0xff, 0xfe, 0x00, 0x41]);

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = loader.load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::MalformedDescriptor { .. }));
}

#[test]
fn test_load_fails_when_reference_missing() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "appliance.ovf", PACKAGE_OVF.as_bytes());
    write_file(dir.path(), "disk1.vmdk", b"disk one content");
    // disk2.vmdk deliberately absent

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = loader.load(dir.path().to_str().unwrap()).unwrap_err();
    match err {
        Error::ReferenceNotFound { href, package_path } => {
            assert_eq!("disk2.vmdk", href);
            assert_eq!(dir.path().to_str().unwrap(), package_path);
        }
        other => panic!("expected ReferenceNotFound, got {other:?}"),
    }
}

#[test]
fn test_load_without_references_skips_validation() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "appliance.ovf",
        b"<Envelope><AnnotationSection><Info>i</Info>\
          <Annotation>a</Annotation></AnnotationSection></Envelope>",
    );

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let descriptor = loader.load(dir.path().to_str().unwrap()).unwrap();
    assert!(descriptor.references.is_none());
    assert!(descriptor.annotation.is_some());
}

#[test]
fn test_get_descriptor_and_disk_paths_prefixes_package_path() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path());
    let package_path = dir.path().to_str().unwrap();

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let (descriptor, infos) =
        hardware::get_descriptor_and_disk_paths(&loader, package_path).unwrap();

    assert_eq!(2, descriptor.references.unwrap().files.len());
    assert_eq!(2, infos.len());
    assert_eq!(format!("{package_path}/disk1.vmdk"), infos[0].file_path);
    assert_eq!(20, infos[0].size_gb);
    assert_eq!(format!("{package_path}/disk2.vmdk"), infos[1].file_path);
    assert_eq!(1, infos[1].size_gb);
}

#[test]
fn test_get_descriptor_and_disk_paths_load_failure() {
    let dir = tempfile::tempdir().unwrap();

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = hardware::get_descriptor_and_disk_paths(&loader, dir.path().to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::StorageLookup { .. }));
}

#[test]
fn test_get_descriptor_and_disk_paths_without_virtual_system() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "appliance.ovf",
        b"<Envelope xmlns:ovf=\"http://schemas.dmtf.org/ovf/envelope/1\">\
          <References><File ovf:href=\"disk1.vmdk\" ovf:id=\"file1\" ovf:size=\"1024\"/>\
          </References></Envelope>",
    );
    write_file(dir.path(), "disk1.vmdk", b"disk one content");

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = hardware::get_descriptor_and_disk_paths(&loader, dir.path().to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::NoVirtualSystem));
}

#[test]
fn test_get_descriptor_and_disk_paths_without_virtual_hardware() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "appliance.ovf",
        b"<Envelope xmlns:ovf=\"http://schemas.dmtf.org/ovf/envelope/1\">\
          <VirtualSystem ovf:id=\"vm1\"><Info>A virtual machine</Info>\
          <Name>vm1</Name></VirtualSystem></Envelope>",
    );

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = hardware::get_descriptor_and_disk_paths(&loader, dir.path().to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::NoVirtualHardware));
}

#[test]
fn test_get_descriptor_and_disk_paths_controller_only_hardware() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "appliance.ovf",
        b"<Envelope xmlns:ovf=\"http://schemas.dmtf.org/ovf/envelope/1\">\
          <References><File ovf:href=\"disk1.vmdk\" ovf:id=\"file1\" ovf:size=\"1024\"/>\
          </References>\
          <DiskSection><Info>Virtual disks</Info>\
          <Disk ovf:capacity=\"20\" ovf:capacityAllocationUnits=\"byte * 2^30\" \
                ovf:diskId=\"vmdisk1\" ovf:fileRef=\"file1\"/></DiskSection>\
          <VirtualSystem ovf:id=\"vm1\"><Info>A virtual machine</Info><Name>vm1</Name>\
          <VirtualHardwareSection><Info>Hardware</Info>\
          <Item><rasd:InstanceID>5</rasd:InstanceID>\
          <rasd:ResourceType>6</rasd:ResourceType></Item>\
          </VirtualHardwareSection></VirtualSystem></Envelope>",
    );
    write_file(dir.path(), "disk1.vmdk", b"disk one content");

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = hardware::get_descriptor_and_disk_paths(&loader, dir.path().to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::MissingSection { .. }));
}

#[test]
fn test_get_descriptor_and_disk_paths_without_references() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "appliance.ovf",
        b"<Envelope xmlns:ovf=\"http://schemas.dmtf.org/ovf/envelope/1\">\
          <DiskSection><Info>Virtual disks</Info>\
          <Disk ovf:capacity=\"20\" ovf:capacityAllocationUnits=\"byte * 2^30\" \
                ovf:diskId=\"vmdisk1\" ovf:fileRef=\"file1\"/></DiskSection>\
          <VirtualSystem ovf:id=\"vm1\"><Info>A virtual machine</Info><Name>vm1</Name>\
          <VirtualHardwareSection><Info>Hardware</Info>\
          <Item><rasd:HostResource>ovf:/disk/vmdisk1</rasd:HostResource>\
          <rasd:InstanceID>6</rasd:InstanceID>\
          <rasd:ResourceType>17</rasd:ResourceType></Item>\
          </VirtualHardwareSection></VirtualSystem></Envelope>",
    );

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = hardware::get_descriptor_and_disk_paths(&loader, dir.path().to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::MissingSection { .. }));
}

#[test]
fn test_validation_requires_hidden_reference_by_exact_name() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "appliance.ovf",
        b"<Envelope xmlns:ovf=\"http://schemas.dmtf.org/ovf/envelope/1\">\
          <References><File ovf:href=\".nvram\" ovf:id=\"file1\" ovf:size=\"8\"/>\
          </References></Envelope>",
    );
    // A same-suffix file must not satisfy the reference.
    write_file(dir.path(), "other.nvram", b"not the referenced file");

    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let err = loader.load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::ReferenceNotFound { ref href, .. } if href == ".nvram"));

    write_file(dir.path(), ".nvram", b"nvram content");
    let descriptor = loader.load(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(".nvram", descriptor.references.unwrap().files[0].href);
}

#[test]
fn test_validator_first_missing_reference_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path());
    std::fs::remove_file(dir.path().join("disk1.vmdk")).unwrap();

    let storage = LocalStorageClient::new();
    let descriptor =
        ovfimport_core::parse_descriptor(PACKAGE_OVF).expect("sample descriptor parses");

    let validator = DescriptorValidator::new(&storage);
    let err = validator
        .validate(descriptor, dir.path().to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::ReferenceNotFound { ref href, .. } if href == "disk1.vmdk"));
}
