//! OVF descriptor model and XML parsing.
//!
//! This module defines the in-memory representation of an OVF 1.x
//! descriptor (references, disk section, annotation, virtual system and
//! its hardware items) and parses descriptor XML into it.
//!
//! Elements and attributes are matched by local name, so `ovf:`/`rasd:`
//! namespace prefixes are accepted but not required, and the root element
//! name is irrelevant. Unrecognized elements and attributes are skipped.
//! Sections absent from the XML parse to `None`, never to empty defaults.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// A parsed OVF descriptor. Any section may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    /// The `References` section listing package files.
    pub references: Option<ReferencesSection>,
    /// The `AnnotationSection`, free-form package annotation.
    pub annotation: Option<AnnotationSection>,
    /// The `VirtualSystem` content element.
    pub virtual_system: Option<VirtualSystem>,
    /// The `DiskSection` listing virtual disks.
    pub disk: Option<DiskSection>,
}

/// The `References` section: files that make up the package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencesSection {
    /// The `ovf:required` section attribute, if present.
    pub required: Option<bool>,
    /// The section `Info` text.
    pub info: String,
    /// The `File` entries.
    pub files: Vec<FileReference>,
}

/// A `File` entry in the references section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileReference {
    /// Unique id within the descriptor, joined from `VirtualDisk::file_ref`.
    pub id: String,
    /// Path of the file relative to the package root.
    pub href: String,
    /// File size in bytes.
    pub size: u64,
}

/// The `AnnotationSection`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSection {
    /// The `ovf:required` section attribute, if present.
    pub required: Option<bool>,
    /// The section `Info` text.
    pub info: String,
    /// The annotation text.
    pub annotation: String,
}

/// The `VirtualSystem` content element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualSystem {
    /// The `ovf:id` attribute.
    pub id: String,
    /// The `Info` text.
    pub info: String,
    /// The `Name` text.
    pub name: String,
    /// The `VirtualHardwareSection` elements, in document order.
    pub virtual_hardware: Vec<VirtualHardwareSection>,
}

/// The `DiskSection`: virtual disks in the package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskSection {
    /// The `ovf:required` section attribute, if present.
    pub required: Option<bool>,
    /// The section `Info` text.
    pub info: String,
    /// The `Disk` entries.
    pub disks: Vec<VirtualDisk>,
}

/// A `Disk` entry in the disk section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualDisk {
    /// Unique id within the disk section, referenced from disk items'
    /// host resources.
    pub disk_id: String,
    /// Id of the backing [`FileReference`], if any.
    pub file_ref: Option<String>,
    /// Capacity as numeric text, denominated by the allocation units.
    pub capacity: String,
    /// Allocation units for the capacity (e.g. `byte * 2^30`).
    pub capacity_allocation_units: Option<String>,
}

/// A `VirtualHardwareSection`: an ordered list of resource items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualHardwareSection {
    /// The `Item` elements, in document order.
    pub items: Vec<RasdItem>,
}

/// One CIM Resource Allocation Setting Data item (CPU, memory, disk,
/// controller, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasdItem {
    /// CIM resource-type code (see [`crate::hardware::resource_type`]).
    pub resource_type: Option<u16>,
    /// Identifying string, unique within the section.
    pub instance_id: String,
    /// `InstanceID` of the parent item (controller), if any.
    pub parent: Option<String>,
    /// Position on the parent controller, if any.
    pub address_on_parent: Option<String>,
    /// Human-readable element name.
    pub element_name: String,
    /// Host resource strings; for disks, element 0 is `ovf:/disk/<diskId>`.
    pub host_resource: Vec<String>,
    /// Quantity of the resource (CPU count, memory amount).
    pub virtual_quantity: Option<u64>,
    /// Units for the quantity as declared by `VirtualQuantityUnits`.
    pub virtual_quantity_units: Option<String>,
    /// Units for the quantity as declared by `AllocationUnits`.
    pub allocation_units: Option<String>,
}

/// Parse OVF descriptor XML into a [`Descriptor`].
///
/// # Errors
///
/// Returns [`Error::MalformedDescriptor`] for XML syntax errors, a missing
/// root element, or non-numeric numeric attributes/elements.
pub fn parse_descriptor(xml: &str) -> Result<Descriptor> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut descriptor = Descriptor::default();
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                if !saw_root {
                    saw_root = true;
                    continue;
                }
                match e.local_name().as_ref() {
                    b"References" => {
                        descriptor.references = Some(parse_references(&mut reader, &e)?);
                    }
                    b"DiskSection" => {
                        descriptor.disk = Some(parse_disk_section(&mut reader, &e)?);
                    }
                    b"AnnotationSection" => {
                        descriptor.annotation = Some(parse_annotation(&mut reader, &e)?);
                    }
                    b"VirtualSystem" => {
                        descriptor.virtual_system = Some(parse_virtual_system(&mut reader, &e)?);
                    }
                    _ => skip_element(&mut reader, &e)?,
                }
            }
            Event::Empty(e) => {
                if !saw_root {
                    saw_root = true;
                    continue;
                }
                match e.local_name().as_ref() {
                    b"References" => {
                        descriptor.references = Some(ReferencesSection {
                            required: required_attr(&e)?,
                            ..Default::default()
                        });
                    }
                    b"DiskSection" => {
                        descriptor.disk = Some(DiskSection {
                            required: required_attr(&e)?,
                            ..Default::default()
                        });
                    }
                    b"AnnotationSection" => {
                        descriptor.annotation = Some(AnnotationSection {
                            required: required_attr(&e)?,
                            ..Default::default()
                        });
                    }
                    b"VirtualSystem" => {
                        descriptor.virtual_system = Some(VirtualSystem {
                            id: attr_value(&e, b"id")?.unwrap_or_default(),
                            ..Default::default()
                        });
                    }
                    _ => {}
                }
            }
            Event::End(_) => {}
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(Error::malformed("descriptor has no root element"));
    }

    Ok(descriptor)
}

fn parse_references(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<ReferencesSection> {
    let mut section = ReferencesSection {
        required: required_attr(start)?,
        ..Default::default()
    };

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"File" => {
                    let file = parse_file(&e)?;
                    skip_element(reader, &e)?;
                    section.files.push(file);
                }
                b"Info" => section.info = read_text(reader)?,
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"File" {
                    section.files.push(parse_file(&e)?);
                }
            }
            Event::End(e) if e.local_name().as_ref() == start.local_name().as_ref() => break,
            Event::Eof => return Err(unexpected_eof("References")),
            _ => {}
        }
    }

    Ok(section)
}

fn parse_file(e: &BytesStart<'_>) -> Result<FileReference> {
    let size = match attr_value(e, b"size")? {
        Some(text) => text
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::malformed(format!("invalid file size '{text}'")))?,
        None => 0,
    };
    Ok(FileReference {
        id: attr_value(e, b"id")?.unwrap_or_default(),
        href: attr_value(e, b"href")?.unwrap_or_default(),
        size,
    })
}

fn parse_disk_section(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<DiskSection> {
    let mut section = DiskSection {
        required: required_attr(start)?,
        ..Default::default()
    };

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Disk" => {
                    let disk = parse_disk(&e)?;
                    skip_element(reader, &e)?;
                    section.disks.push(disk);
                }
                b"Info" => section.info = read_text(reader)?,
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"Disk" {
                    section.disks.push(parse_disk(&e)?);
                }
            }
            Event::End(e) if e.local_name().as_ref() == start.local_name().as_ref() => break,
            Event::Eof => return Err(unexpected_eof("DiskSection")),
            _ => {}
        }
    }

    Ok(section)
}

fn parse_disk(e: &BytesStart<'_>) -> Result<VirtualDisk> {
    Ok(VirtualDisk {
        disk_id: attr_value(e, b"diskId")?.unwrap_or_default(),
        file_ref: attr_value(e, b"fileRef")?,
        capacity: attr_value(e, b"capacity")?.unwrap_or_default(),
        capacity_allocation_units: attr_value(e, b"capacityAllocationUnits")?,
    })
}

fn parse_annotation(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<AnnotationSection> {
    let mut section = AnnotationSection {
        required: required_attr(start)?,
        ..Default::default()
    };

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Info" => section.info = read_text(reader)?,
                b"Annotation" => section.annotation = read_text(reader)?,
                _ => skip_element(reader, &e)?,
            },
            Event::End(e) if e.local_name().as_ref() == start.local_name().as_ref() => break,
            Event::Eof => return Err(unexpected_eof("AnnotationSection")),
            _ => {}
        }
    }

    Ok(section)
}

fn parse_virtual_system(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<VirtualSystem> {
    let mut system = VirtualSystem {
        id: attr_value(start, b"id")?.unwrap_or_default(),
        ..Default::default()
    };

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Info" => system.info = read_text(reader)?,
                b"Name" => system.name = read_text(reader)?,
                b"VirtualHardwareSection" => {
                    system.virtual_hardware.push(parse_hardware_section(reader, &e)?);
                }
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"VirtualHardwareSection" {
                    system.virtual_hardware.push(VirtualHardwareSection::default());
                }
            }
            Event::End(e) if e.local_name().as_ref() == start.local_name().as_ref() => break,
            Event::Eof => return Err(unexpected_eof("VirtualSystem")),
            _ => {}
        }
    }

    Ok(system)
}

fn parse_hardware_section(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<VirtualHardwareSection> {
    let mut section = VirtualHardwareSection::default();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Item" => section.items.push(parse_item(reader, &e)?),
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"Item" {
                    section.items.push(RasdItem::default());
                }
            }
            Event::End(e) if e.local_name().as_ref() == start.local_name().as_ref() => break,
            Event::Eof => return Err(unexpected_eof("VirtualHardwareSection")),
            _ => {}
        }
    }

    Ok(section)
}

fn parse_item(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<RasdItem> {
    let mut item = RasdItem::default();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                let text = read_text(reader)?;
                apply_item_field(&mut item, &name, text)?;
            }
            // An empty child element is "present but empty", which matters
            // for fields that distinguish absent from empty.
            Event::Empty(e) => {
                let name = e.local_name().as_ref().to_vec();
                apply_item_field(&mut item, &name, String::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == start.local_name().as_ref() => break,
            Event::Eof => return Err(unexpected_eof("Item")),
            _ => {}
        }
    }

    Ok(item)
}

fn apply_item_field(item: &mut RasdItem, name: &[u8], text: String) -> Result<()> {
    match name {
        b"ResourceType" => {
            let code = text
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::malformed(format!("invalid resource type '{text}'")))?;
            item.resource_type = Some(code);
        }
        b"InstanceID" => item.instance_id = text,
        b"Parent" => item.parent = Some(text),
        b"AddressOnParent" => item.address_on_parent = Some(text),
        b"ElementName" => item.element_name = text,
        b"HostResource" => item.host_resource.push(text),
        b"VirtualQuantity" => {
            let quantity = text
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::malformed(format!("invalid virtual quantity '{text}'")))?;
            item.virtual_quantity = Some(quantity);
        }
        b"VirtualQuantityUnits" => item.virtual_quantity_units = Some(text),
        b"AllocationUnits" => item.allocation_units = Some(text),
        _ => {}
    }
    Ok(())
}

/// Read the text content of the element just started, consuming through
/// its end tag. Nested elements are skipped.
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(e) => {
                if depth == 0 {
                    text.push_str(&e.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(e) => {
                if depth == 0 {
                    text.push_str(
                        std::str::from_utf8(&e)
                            .map_err(|err| Error::malformed(err.to_string()))?,
                    );
                }
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => return Err(unexpected_eof("text content")),
            _ => {}
        }
    }
    Ok(text)
}

/// Skip everything up to and including the end tag of `start`.
fn skip_element(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<()> {
    reader.read_to_end(start.name()).map_err(xml_error)?;
    Ok(())
}

/// Look up an attribute by local name, ignoring any namespace prefix.
fn attr_value(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::malformed(err.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|err| Error::malformed(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse the `ovf:required` section attribute.
fn required_attr(e: &BytesStart<'_>) -> Result<Option<bool>> {
    match attr_value(e, b"required")? {
        None => Ok(None),
        Some(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(Error::malformed(format!(
                "invalid required attribute '{text}'"
            ))),
        },
    }
}

fn xml_error(err: quick_xml::Error) -> Error {
    Error::malformed(err.to_string())
}

fn unexpected_eof(context: &str) -> Error {
    Error::malformed(format!("unexpected end of document in {context}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_value_matches_local_name() {
        let start = BytesStart::from_content(r#"File ovf:href="a.vmdk" id="file1""#, 4);
        assert_eq!(
            attr_value(&start, b"href").unwrap(),
            Some("a.vmdk".to_string())
        );
        assert_eq!(attr_value(&start, b"id").unwrap(), Some("file1".to_string()));
        assert_eq!(attr_value(&start, b"size").unwrap(), None);
    }

    #[test]
    fn test_required_attr_values() {
        let start = BytesStart::from_content(r#"AnnotationSection ovf:required="false""#, 17);
        assert_eq!(required_attr(&start).unwrap(), Some(false));

        let start = BytesStart::from_content(r#"AnnotationSection ovf:required="TRUE""#, 17);
        assert_eq!(required_attr(&start).unwrap(), Some(true));

        let start = BytesStart::from_content(r#"AnnotationSection ovf:required="maybe""#, 17);
        assert!(required_attr(&start).is_err());

        let start = BytesStart::from_content("AnnotationSection", 17);
        assert_eq!(required_attr(&start).unwrap(), None);
    }

    #[test]
    fn test_parse_empty_input_is_malformed() {
        assert!(matches!(
            parse_descriptor(""),
            Err(Error::MalformedDescriptor { .. })
        ));
    }
}
