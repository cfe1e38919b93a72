//! Related-identifier handling in registrar metadata documents.
//!
//! Documents are DataCite kernel XML. The rewrite streams every event through
//! unchanged and only adds one `relatedIdentifier` element, so everything the
//! tenant supplied is preserved as-is.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use registrar::MetadataDocument;
use thiserror::Error;
use url::Url;

/// Relation type marking a resource as a duplicate of another.
pub const IS_IDENTICAL_TO: &str = "IsIdenticalTo";

/// Identifier type used for URL relations.
pub const URL_IDENTIFIER_TYPE: &str = "URL";

const ROOT: &[u8] = b"resource";
const CONTAINER: &[u8] = b"relatedIdentifiers";
const ENTRY: &[u8] = b"relatedIdentifier";

/// Errors raised while reading or rewriting a metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The document is not well-formed XML.
    #[error("Malformed metadata XML: {0}")]
    Xml(String),

    /// The document has no `resource` root element.
    #[error("Metadata document has no <resource> root element")]
    MissingResource,
}

fn xml_error(err: impl std::fmt::Display) -> MetadataError {
    MetadataError::Xml(err.to_string())
}

/// A `relatedIdentifier` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedIdentifier {
    pub value: String,
    pub identifier_type: String,
    pub relation_type: String,
}

impl RelatedIdentifier {
    /// An `IsIdenticalTo` relation pointing at `url`.
    pub fn duplicate_of(url: &Url) -> Self {
        Self {
            value: url.to_string(),
            identifier_type: URL_IDENTIFIER_TYPE.to_string(),
            relation_type: IS_IDENTICAL_TO.to_string(),
        }
    }

    /// Two relations are the same if value, identifier type and relation type match.
    ///
    /// Type names compare case-insensitively, values after trimming.
    pub fn same_as(&self, other: &RelatedIdentifier) -> bool {
        self.value.trim() == other.value.trim()
            && self.identifier_type.eq_ignore_ascii_case(&other.identifier_type)
            && self.relation_type.eq_ignore_ascii_case(&other.relation_type)
    }
}

/// Reads every `relatedIdentifier` entry in the document.
pub fn related_identifiers(
    document: &MetadataDocument,
) -> Result<Vec<RelatedIdentifier>, MetadataError> {
    let mut reader = Reader::from_str(document.as_str());
    let mut found = Vec::new();
    let mut current: Option<(String, String)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if e.local_name().as_ref() == ENTRY => {
                current = Some((
                    attribute(&e, "relatedIdentifierType")?,
                    attribute(&e, "relationType")?,
                ));
                text.clear();
            }
            Event::Text(t) if current.is_some() => {
                text.push_str(&t.unescape().map_err(xml_error)?);
            }
            Event::CData(c) if current.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(e) if e.local_name().as_ref() == ENTRY => {
                if let Some((identifier_type, relation_type)) = current.take() {
                    found.push(RelatedIdentifier {
                        value: text.trim().to_string(),
                        identifier_type,
                        relation_type,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(found)
}

/// Adds an `IsIdenticalTo` relation to `duplicate_of`, unless an identical
/// relation is already present, in which case the document is returned as-is.
pub fn add_duplicate_relation(
    document: &MetadataDocument,
    duplicate_of: &Url,
) -> Result<MetadataDocument, MetadataError> {
    let relation = RelatedIdentifier::duplicate_of(duplicate_of);
    if related_identifiers(document)?
        .iter()
        .any(|existing| existing.same_as(&relation))
    {
        tracing::debug!(%duplicate_of, "duplicate relation already present");
        return Ok(document.clone());
    }
    insert_relation(document, &relation)
}

fn insert_relation(
    document: &MetadataDocument,
    relation: &RelatedIdentifier,
) -> Result<MetadataDocument, MetadataError> {
    let mut reader = Reader::from_str(document.as_str());
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;
    let mut root_seen = false;
    let mut inserted = false;
    let mut container_prefix: Option<String> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                depth += 1;
                if depth == 1 {
                    root_seen = e.local_name().as_ref() == ROOT;
                } else if depth == 2 && root_seen && e.local_name().as_ref() == CONTAINER {
                    container_prefix = Some(prefix_of(&e));
                }
                writer.write_event(Event::Start(e)).map_err(xml_error)?;
            }
            Event::Empty(e) => {
                let local = e.local_name().as_ref().to_vec();
                if depth == 0 && local == ROOT {
                    // <resource/>: expand so the container can go inside.
                    let prefix = prefix_of(&e);
                    let name = qualified_name(&e);
                    writer.write_event(Event::Start(e)).map_err(xml_error)?;
                    write_container(&mut writer, &prefix, relation)?;
                    writer
                        .write_event(Event::End(BytesEnd::new(name)))
                        .map_err(xml_error)?;
                    inserted = true;
                } else if depth == 1 && root_seen && !inserted && local == CONTAINER {
                    let prefix = prefix_of(&e);
                    let name = qualified_name(&e);
                    writer.write_event(Event::Start(e)).map_err(xml_error)?;
                    write_entry(&mut writer, &prefix, relation)?;
                    writer
                        .write_event(Event::End(BytesEnd::new(name)))
                        .map_err(xml_error)?;
                    inserted = true;
                } else {
                    writer.write_event(Event::Empty(e)).map_err(xml_error)?;
                }
            }
            Event::End(e) => {
                if !inserted && root_seen {
                    let local = e.local_name().as_ref().to_vec();
                    if depth == 2 && local == CONTAINER {
                        if let Some(prefix) = container_prefix.take() {
                            write_entry(&mut writer, &prefix, relation)?;
                            inserted = true;
                        }
                    } else if depth == 1 && local == ROOT {
                        let prefix = e
                            .name()
                            .prefix()
                            .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
                            .unwrap_or_default();
                        write_container(&mut writer, &prefix, relation)?;
                        inserted = true;
                    }
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(e)).map_err(xml_error)?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(xml_error)?,
        }
    }

    if !inserted {
        return Err(MetadataError::MissingResource);
    }

    let xml = String::from_utf8(writer.into_inner()).map_err(xml_error)?;
    Ok(MetadataDocument::new(xml))
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<String, MetadataError> {
    match e.try_get_attribute(name).map_err(xml_error)? {
        Some(attr) => Ok(attr.unescape_value().map_err(xml_error)?.into_owned()),
        None => Ok(String::new()),
    }
}

fn prefix_of(e: &BytesStart<'_>) -> String {
    e.name()
        .prefix()
        .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
        .unwrap_or_default()
}

fn qualified_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn write_container(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    relation: &RelatedIdentifier,
) -> Result<(), MetadataError> {
    let name = format!("{prefix}relatedIdentifiers");
    writer
        .write_event(Event::Start(BytesStart::new(name.as_str())))
        .map_err(xml_error)?;
    write_entry(writer, prefix, relation)?;
    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .map_err(xml_error)?;
    Ok(())
}

fn write_entry(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    relation: &RelatedIdentifier,
) -> Result<(), MetadataError> {
    let name = format!("{prefix}relatedIdentifier");
    let mut start = BytesStart::new(name.as_str());
    start.push_attribute(("relatedIdentifierType", relation.identifier_type.as_str()));
    start.push_attribute(("relationType", relation.relation_type.as_str()));
    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::new(&relation.value)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .map_err(xml_error)?;
    Ok(())
}
