//! Canonical XML -> typed `Update` decoding.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use catalog_core::driver::DriverMetadataEntry;
use catalog_core::file::{DigestAlgorithm, FileDigest, UpdateFile};
use catalog_core::identity::PackageIdentity;
use catalog_core::prerequisite::Prerequisite;
use catalog_core::update::{DriverUpdateData, SoftwareUpdateData, Update, UpdateHeader};

use crate::error::{XmlError, XmlResult};
use crate::tree::{XmlElement, parse_document};

/// Decode an update's canonical XML into the typed model.
///
/// # Errors
///
/// Returns an error if the document is malformed, is missing a field a
/// variant requires, or carries an `UpdateType`/`CategoryType` combination
/// that does not map to a known variant.
pub fn decode_update(xml: &str) -> XmlResult<Update> {
    let root = parse_document(xml)?;
    let identity = parse_identity(
        root.child("UpdateIdentity")
            .ok_or(XmlError::MissingField("UpdateIdentity"))?,
    )?;
    let properties = root
        .child("Properties")
        .ok_or(XmlError::MissingField("Properties"))?;
    let update_type = properties
        .attr("UpdateType")
        .ok_or(XmlError::MissingField("Properties/@UpdateType"))?;

    let (title, description) = localized_text(&root);
    let header = UpdateHeader {
        identity,
        title,
        description,
    };

    match update_type {
        "Detectoid" => Ok(Update::Detectoid { header }),
        "Category" => {
            let category_type = root
                .child("HandlerSpecificData")
                .and_then(|h| h.child("CategoryInformation"))
                .and_then(|c| c.attr("CategoryType"));
            if category_type == Some("UpdateClassification") {
                Ok(Update::Classification { header })
            } else {
                Ok(Update::Product { header })
            }
        }
        "Software" => Ok(Update::SoftwareUpdate {
            header,
            data: SoftwareUpdateData {
                files: parse_files(&root)?,
                prerequisites: parse_prerequisites(&root)?,
                superseded: parse_identity_list(&root, "SupersededUpdates")?,
                bundled_with: parse_identity_list(&root, "BundledWithUpdates")?,
                bundled_members: parse_identity_list(&root, "BundledUpdates")?,
                kb_article_id: properties.attr("KBArticleID").map(str::to_string),
                support_url: properties.attr("SupportUrl").map(str::to_string),
                os_upgrade: properties.attr("OSUpgrade") == Some("true"),
                product_ids: Vec::new(),
                classification_ids: Vec::new(),
            },
        }),
        "Driver" => Ok(Update::DriverUpdate {
            header,
            data: DriverUpdateData {
                files: parse_files(&root)?,
                prerequisites: parse_prerequisites(&root)?,
                driver_metadata: parse_driver_metadata(&root)?,
                product_ids: Vec::new(),
                classification_ids: Vec::new(),
            },
        }),
        other => Err(XmlError::UnknownUpdateType {
            update_type: other.to_string(),
            category_type: root
                .child("HandlerSpecificData")
                .and_then(|h| h.child("CategoryInformation"))
                .and_then(|c| c.attr("CategoryType"))
                .map(str::to_string),
        }),
    }
}

fn localized_text(root: &XmlElement) -> (String, Option<String>) {
    let Some(collection) = root.child("LocalizedPropertiesCollection") else {
        return (String::new(), None);
    };
    let candidates: Vec<&XmlElement> = collection.children_named("LocalizedProperties").collect();
    let chosen = candidates
        .iter()
        .find(|props| props.attr("Language") == Some("en"))
        .or_else(|| candidates.first())
        .copied();
    let Some(props) = chosen else {
        return (String::new(), None);
    };
    let title = props.child("Title").map(XmlElement::text).unwrap_or_default();
    let description = props.child("Description").map(XmlElement::text);
    (title, description)
}

fn parse_identity(elem: &XmlElement) -> XmlResult<PackageIdentity> {
    let id_str = elem.attr("UpdateID").ok_or(XmlError::MissingField("UpdateID"))?;
    let id = Uuid::parse_str(id_str).map_err(|_| XmlError::InvalidValue {
        field: "UpdateID",
        value: id_str.to_string(),
    })?;
    let revision_str = elem
        .attr("RevisionNumber")
        .ok_or(XmlError::MissingField("RevisionNumber"))?;
    let revision = revision_str.parse().map_err(|_| XmlError::InvalidValue {
        field: "RevisionNumber",
        value: revision_str.to_string(),
    })?;
    Ok(PackageIdentity::new(id, revision))
}

fn parse_identity_list(root: &XmlElement, group: &str) -> XmlResult<Vec<PackageIdentity>> {
    let Some(relationships) = root.child("Relationships") else {
        return Ok(Vec::new());
    };
    let Some(group_elem) = relationships.child(group) else {
        return Ok(Vec::new());
    };
    group_elem.children_named("UpdateIdentity").map(parse_identity).collect()
}

fn parse_prerequisites(root: &XmlElement) -> XmlResult<Vec<Prerequisite>> {
    let Some(prereqs) = root
        .child("Relationships")
        .and_then(|r| r.child("Prerequisites"))
    else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for node in &prereqs.children {
        let crate::tree::XmlNode::Element(element) = node else {
            continue;
        };
        match element.name.as_str() {
            "Simple" => {
                let target = parse_identity(
                    element
                        .child("UpdateIdentity")
                        .ok_or(XmlError::MissingField("Simple/UpdateIdentity"))?,
                )?;
                out.push(Prerequisite::Simple { target });
            }
            "AtLeastOne" => {
                let simples = element
                    .children_named("UpdateIdentity")
                    .map(parse_identity)
                    .collect::<XmlResult<Vec<_>>>()?;
                out.push(Prerequisite::AtLeastOne {
                    simples,
                    is_category: element.attr("IsCategory") == Some("true"),
                });
            }
            _ => {}
        }
    }
    Ok(out)
}

fn parse_files(root: &XmlElement) -> XmlResult<Vec<UpdateFile>> {
    let Some(files) = root.child("Files") else {
        return Ok(Vec::new());
    };
    files.children_named("File").map(parse_file).collect()
}

fn parse_file(elem: &XmlElement) -> XmlResult<UpdateFile> {
    let file_name = elem
        .attr("FileName")
        .ok_or(XmlError::MissingField("File/@FileName"))?
        .to_string();
    let size_str = elem.attr("Size").ok_or(XmlError::MissingField("File/@Size"))?;
    let size = size_str.parse().map_err(|_| XmlError::InvalidValue {
        field: "Size",
        value: size_str.to_string(),
    })?;
    let source_url = elem.attr("SourceUrl").unwrap_or_default().to_string();
    let digests = elem
        .children_named("Digest")
        .filter_map(parse_digest)
        .collect();
    Ok(UpdateFile {
        file_name,
        size,
        source_url,
        digests,
    })
}

fn parse_digest(elem: &XmlElement) -> Option<FileDigest> {
    let algorithm = match elem.attr("Algorithm")? {
        "SHA1" => DigestAlgorithm::Sha1,
        "SHA256" => DigestAlgorithm::Sha256,
        _ => return None,
    };
    let bytes = BASE64.decode(elem.text().trim()).ok()?;
    Some(FileDigest { algorithm, bytes })
}

fn parse_driver_metadata(root: &XmlElement) -> XmlResult<Vec<DriverMetadataEntry>> {
    let Some(rules) = root.child("ApplicabilityRules") else {
        return Ok(Vec::new());
    };
    rules
        .children_named("d.WindowsDriverMetaData")
        .map(parse_driver_entry)
        .collect()
}

fn parse_driver_entry(elem: &XmlElement) -> XmlResult<DriverMetadataEntry> {
    let hardware_id = elem
        .attr("HardwareID")
        .ok_or(XmlError::MissingField("WindowsDriverMetaData/@HardwareID"))?
        .to_string();
    let rank_str = elem
        .attr("RankingNumber")
        .ok_or(XmlError::MissingField("WindowsDriverMetaData/@RankingNumber"))?;
    let rank = parse_rank(rank_str)?;
    let version = (
        parse_u16_attr(elem, "VersionMajor")?,
        parse_u16_attr(elem, "VersionMinor")?,
        parse_u16_attr(elem, "VersionBuild")?,
        parse_u16_attr(elem, "VersionRevision")?,
    );
    let date_str = elem.attr("Date").ok_or(XmlError::MissingField("WindowsDriverMetaData/@Date"))?;
    let date: DateTime<Utc> = date_str
        .parse()
        .map_err(|_| XmlError::InvalidValue {
            field: "Date",
            value: date_str.to_string(),
        })?;

    Ok(DriverMetadataEntry {
        hardware_id,
        compatible_id: elem.attr("CompatibleID").map(str::to_string),
        computer_hardware_id: elem.attr("ComputerHardwareID").map(str::to_string),
        rank,
        version,
        date,
        class: elem.attr("Class").unwrap_or_default().to_string(),
        provider: elem.attr("Provider").unwrap_or_default().to_string(),
    })
}

fn parse_rank(value: &str) -> XmlResult<u32> {
    let parsed = value
        .strip_prefix("0x")
        .map_or_else(|| value.parse::<u32>(), |hex| u32::from_str_radix(hex, 16));
    parsed.map_err(|_| XmlError::InvalidValue {
        field: "RankingNumber",
        value: value.to_string(),
    })
}

fn parse_u16_attr(elem: &XmlElement, field: &'static str) -> XmlResult<u16> {
    let value = elem.attr(field).unwrap_or("0");
    value.parse().map_err(|_| XmlError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOFTWARE_XML: &str = r#"<Update>
        <UpdateIdentity UpdateID="11111111-1111-1111-1111-111111111111" RevisionNumber="2" />
        <Properties UpdateType="Software" KBArticleID="KB123" OSUpgrade="false" />
        <LocalizedPropertiesCollection>
            <LocalizedProperties Language="en"><Title>Sample Update</Title><Description>desc</Description></LocalizedProperties>
        </LocalizedPropertiesCollection>
        <Relationships>
            <Prerequisites>
                <Simple><UpdateIdentity UpdateID="22222222-2222-2222-2222-222222222222" RevisionNumber="1" /></Simple>
            </Prerequisites>
            <BundledUpdates>
                <UpdateIdentity UpdateID="33333333-3333-3333-3333-333333333333" RevisionNumber="1" />
            </BundledUpdates>
        </Relationships>
        <Files>
            <File FileName="payload.cab" Size="1024" SourceUrl="https://example.invalid/payload.cab">
                <Digest Algorithm="SHA256">AQIDBA==</Digest>
            </File>
        </Files>
    </Update>"#;

    #[test]
    fn decodes_software_update_with_prerequisites_bundles_and_files() {
        let update = decode_update(SOFTWARE_XML).expect("decodes");
        let Update::SoftwareUpdate { header, data } = update else {
            panic!("expected software update");
        };
        assert_eq!(header.title, "Sample Update");
        assert_eq!(header.description.as_deref(), Some("desc"));
        assert_eq!(data.kb_article_id.as_deref(), Some("KB123"));
        assert_eq!(data.prerequisites.len(), 1);
        assert_eq!(data.bundled_members.len(), 1);
        assert_eq!(data.files.len(), 1);
        assert_eq!(data.files[0].strongest_digest().unwrap().bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn decodes_detectoid_with_no_payload() {
        let xml = r#"<Update>
            <UpdateIdentity UpdateID="11111111-1111-1111-1111-111111111111" RevisionNumber="1" />
            <Properties UpdateType="Detectoid" />
        </Update>"#;
        let update = decode_update(xml).expect("decodes");
        assert!(matches!(update, Update::Detectoid { .. }));
    }

    #[test]
    fn decodes_classification_category() {
        let xml = r#"<Update>
            <UpdateIdentity UpdateID="11111111-1111-1111-1111-111111111111" RevisionNumber="1" />
            <Properties UpdateType="Category" />
            <HandlerSpecificData><CategoryInformation CategoryType="UpdateClassification" /></HandlerSpecificData>
        </Update>"#;
        let update = decode_update(xml).expect("decodes");
        assert!(matches!(update, Update::Classification { .. }));
    }

    #[test]
    fn decodes_product_category_by_default() {
        let xml = r#"<Update>
            <UpdateIdentity UpdateID="11111111-1111-1111-1111-111111111111" RevisionNumber="1" />
            <Properties UpdateType="Category" />
            <HandlerSpecificData><CategoryInformation CategoryType="Product" /></HandlerSpecificData>
        </Update>"#;
        let update = decode_update(xml).expect("decodes");
        assert!(matches!(update, Update::Product { .. }));
    }

    #[test]
    fn decodes_driver_metadata_from_applicability_rules() {
        let xml = r#"<Update xmlns:d="http://schemas.microsoft.com/msus/2002/12/Applicability/Driver">
            <UpdateIdentity UpdateID="11111111-1111-1111-1111-111111111111" RevisionNumber="1" />
            <Properties UpdateType="Driver" />
            <ApplicabilityRules>
                <d:WindowsDriverMetaData HardwareID="PCI\VEN_1&amp;DEV_2" RankingNumber="0x12345678"
                    VersionMajor="1" VersionMinor="2" VersionBuild="3" VersionRevision="4"
                    Date="2024-01-01T00:00:00Z" Class="Net" Provider="Contoso" />
            </ApplicabilityRules>
        </Update>"#;
        let update = decode_update(xml).expect("decodes");
        let Update::DriverUpdate { data, .. } = update else {
            panic!("expected driver update");
        };
        assert_eq!(data.driver_metadata.len(), 1);
        assert_eq!(data.driver_metadata[0].hardware_id, "PCI\\VEN_1&DEV_2");
        assert_eq!(data.driver_metadata[0].feature_score(), 0x34);
    }

    #[test]
    fn unknown_update_type_is_rejected() {
        let xml = r#"<Update>
            <UpdateIdentity UpdateID="11111111-1111-1111-1111-111111111111" RevisionNumber="1" />
            <Properties UpdateType="Bogus" />
        </Update>"#;
        assert!(decode_update(xml).is_err());
    }
}
