//! Core/extended/localized fragment extraction.
//!
//! Each fragment is built by filtering the parsed tree and re-serializing it
//! with [`XmlElement::to_xml_string`], so the same namespace-rewriting and
//! whitespace-free output rules apply uniformly across all three.

use crate::error::XmlResult;
use crate::tree::{XmlElement, XmlNode, parse_document};

const CORE_PROPERTIES_ALLOW: &[&str] = &[
    "UpdateType",
    "AutoSelectOnWebSites",
    "EulaID",
    "ExplicitlyDeployable",
    "OSUpgrade",
];

const EXTENDED_PROPERTIES_DENY: &[&str] = &[
    "UpdateType",
    "ExplicitlyDeployable",
    "AutoSelectOnWebSites",
    "EulaID",
    "PublicationState",
    "PublisherID",
    "CreationDate",
    "IsPublic",
    "LegacyName",
    "DetectoidType",
    "OSUpgrade",
    "PerUser",
];

/// Build the core fragment: `UpdateIdentity` + filtered `Properties` +
/// `Relationships` + `ApplicabilityRules` with driver metadata emptied.
///
/// # Errors
///
/// Returns an error if `xml` is not well-formed.
pub fn core_fragment(xml: &str) -> XmlResult<String> {
    let root = parse_document(xml)?;
    let mut out = String::new();

    if let Some(identity) = root.child("UpdateIdentity") {
        out.push_str(&identity.to_xml_string());
    }
    if let Some(properties) = root.child("Properties") {
        out.push_str(&filter_attrs(properties, CORE_PROPERTIES_ALLOW, AttrFilter::Allow).to_xml_string());
    }
    if let Some(relationships) = root.child("Relationships") {
        out.push_str(&relationships.to_xml_string());
    }
    if let Some(rules) = root.child("ApplicabilityRules") {
        out.push_str(&empty_driver_metadata(rules).to_xml_string());
    }
    Ok(out)
}

/// Build the extended fragment: `Properties` (renamed `ExtendedProperties`,
/// with denied attributes stripped) + `Files` + `HandlerSpecificData`.
///
/// # Errors
///
/// Returns an error if `xml` is not well-formed.
pub fn extended_fragment(xml: &str) -> XmlResult<String> {
    let root = parse_document(xml)?;
    let mut out = String::new();

    if let Some(properties) = root.child("Properties") {
        let mut renamed = filter_attrs(properties, EXTENDED_PROPERTIES_DENY, AttrFilter::Deny);
        renamed.name = "ExtendedProperties".to_string();
        out.push_str(&renamed.to_xml_string());
    }
    if let Some(files) = root.child("Files") {
        out.push_str(&files.to_xml_string());
    }
    if let Some(handler_data) = root.child("HandlerSpecificData") {
        out.push_str(&handler_data.to_xml_string());
    }
    Ok(out)
}

/// Build the localized fragment: the first `LocalizedProperties` element
/// whose `Language` attribute is one of `languages`, or an empty string if
/// none match.
///
/// # Errors
///
/// Returns an error if `xml` is not well-formed.
pub fn localized_fragment(xml: &str, languages: &[&str]) -> XmlResult<String> {
    let root = parse_document(xml)?;
    let Some(collection) = root.child("LocalizedPropertiesCollection") else {
        return Ok(String::new());
    };
    let chosen = collection
        .children_named("LocalizedProperties")
        .find(|props| props.attr("Language").is_some_and(|lang| languages.contains(&lang)));
    Ok(chosen.map(XmlElement::to_xml_string).unwrap_or_default())
}

enum AttrFilter {
    Allow,
    Deny,
}

fn filter_attrs(elem: &XmlElement, list: &[&str], mode: AttrFilter) -> XmlElement {
    let attrs = elem
        .attrs
        .iter()
        .filter(|(key, _)| {
            let contains = list.contains(&key.as_str());
            match mode {
                AttrFilter::Allow => contains,
                AttrFilter::Deny => !contains,
            }
        })
        .cloned()
        .collect();
    XmlElement {
        name: elem.name.clone(),
        attrs,
        children: elem.children.clone(),
    }
}

/// Clone `rules`, replacing every direct `d.WindowsDriverMetaData` child with
/// an empty element of the same name (tag kept, attributes and children
/// dropped) and leaving every other child untouched.
fn empty_driver_metadata(rules: &XmlElement) -> XmlElement {
    let children = rules
        .children
        .iter()
        .map(|node| match node {
            XmlNode::Element(element) if element.name == "d.WindowsDriverMetaData" => {
                XmlNode::Element(XmlElement {
                    name: element.name.clone(),
                    attrs: Vec::new(),
                    children: Vec::new(),
                })
            }
            other => other.clone(),
        })
        .collect();
    XmlElement {
        name: rules.name.clone(),
        attrs: rules.attrs.clone(),
        children,
    }
}
