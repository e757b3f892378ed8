//! XML front-end: turns the textual tree format into the logical model
//! consumed by the factory. The factory itself never sees XML.

use std::{collections::HashMap, io::Cursor, string::FromUtf8Error};

use log::{debug, info};
use quick_xml::{
    events::{attributes::Attributes, Event},
    Reader,
};
use thiserror::Error;

use crate::model::{NodeModel, TreeModel, TreeModelCollection};

#[derive(Debug, Error)]
pub enum XmlParseError {
    #[error("error occurred parsing XML attribute: {0}")]
    AttrError(#[from] quick_xml::events::attributes::AttrError),
    #[error("error occurred parsing XML: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("expected to find <root> start tag at start of XML")]
    MissingRoot,
    #[error("expected a <BehaviorTree> tag, found <{0}> instead")]
    ExpectedBehaviorTree(String),
    #[error("reached EOF of the XML unexpectedly")]
    UnexpectedEof,
    #[error("error parsing UTF8: {0}")]
    Utf8Error(#[from] FromUtf8Error),
    #[error("{0}")]
    MissingAttribute(String),
    #[error("a <BehaviorTree> must contain exactly one root element, [{0}] has {1}")]
    SingleChildExpected(String, usize),
    #[error("errors like this shouldn't happen: {0}")]
    InternalError(String),
}

type XmlReader = Reader<Cursor<Vec<u8>>>;

fn attributes_to_map(attributes: Attributes<'_>) -> Result<HashMap<String, String>, XmlParseError> {
    let mut map = HashMap::new();
    for attr in attributes.into_iter() {
        let attr = attr?;
        let name = String::from_utf8(attr.key.0.into())?;
        let value = String::from_utf8(attr.value.to_vec())?;

        map.insert(name, value);
    }

    Ok(map)
}

/// Parse an XML document into tree models.
///
/// Expected layout, as in the usual tree file format:
///
/// ```xml
/// <root main_tree_to_execute="main">
///     <BehaviorTree ID="main">
///         <Sequence> ... </Sequence>
///     </BehaviorTree>
/// </root>
/// ```
///
/// A `<TreeNodesModel>` section is tolerated and skipped.
pub fn parse_tree_models(xml: impl AsRef<str>) -> Result<TreeModelCollection, XmlParseError> {
    let mut reader = Reader::from_reader(Cursor::new(xml.as_ref().as_bytes().to_vec()));
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut collection = TreeModelCollection::default();

    // Find the <root> tag
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Decl(_) | Event::Comment(_) => buf.clear(),
            Event::Start(e) => {
                let name = String::from_utf8(e.name().0.into())?;
                if name != "root" {
                    return Err(XmlParseError::MissingRoot);
                }

                let attributes = attributes_to_map(e.attributes())?;
                if let Some(tree_id) = attributes.get("main_tree_to_execute") {
                    info!("found main tree ID: {tree_id}");
                    collection.main_tree_id = Some(tree_id.clone());
                }

                buf.clear();
                break;
            }
            Event::Eof => return Err(XmlParseError::UnexpectedEof),
            _ => return Err(XmlParseError::MissingRoot),
        }
    }

    // Each child of <root> is a BehaviorTree (or the node model section)
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8(e.name().0.into())?;
                let attributes = attributes_to_map(e.attributes())?;

                if name == "TreeNodesModel" {
                    skip_to_matching_end(&mut reader, "TreeNodesModel")?;
                    continue;
                }

                if name != "BehaviorTree" {
                    return Err(XmlParseError::ExpectedBehaviorTree(name));
                }

                let id = attributes.get("ID").cloned().ok_or_else(|| {
                    XmlParseError::MissingAttribute(
                        "found a BehaviorTree definition without ID".to_string(),
                    )
                })?;

                let mut children = Vec::new();
                while let Some(child) = build_element(&mut reader)? {
                    children.push(child);
                }

                if children.len() != 1 {
                    return Err(XmlParseError::SingleChildExpected(id, children.len()));
                }

                debug!("registered tree model [{id}]");
                // Exactly one by the check above
                collection
                    .trees
                    .push(TreeModel::new(id, children.pop().unwrap()));
            }
            Event::End(e) => {
                let name = String::from_utf8(e.name().0.into())?;
                if name == "root" {
                    break;
                }
                return Err(XmlParseError::InternalError(format!(
                    "stray end tag </{name}>"
                )));
            }
            Event::Comment(_) => {}
            Event::Eof => return Err(XmlParseError::UnexpectedEof),
            event => {
                return Err(XmlParseError::InternalError(format!(
                    "unexpected XML event {event:?}"
                )))
            }
        }
        buf.clear();
    }

    Ok(collection)
}

/// Recursively build one element. Returns `None` on the enclosing end tag.
fn build_element(reader: &mut XmlReader) -> Result<Option<NodeModel>, XmlParseError> {
    let mut buf = Vec::new();

    let model = match reader.read_event_into(&mut buf)? {
        // Node with children
        Event::Start(e) => {
            let registration_id = String::from_utf8(e.name().0.into())?;
            let attributes = attributes_to_map(e.attributes())?;

            let mut model = NodeModel::new(registration_id);
            model.attributes = attributes;

            while let Some(child) = build_element(reader)? {
                model.children.push(child);
            }

            Some(model)
        }
        // Leaf node
        Event::Empty(e) => {
            let registration_id = String::from_utf8(e.name().0.into())?;
            let attributes = attributes_to_map(e.attributes())?;

            let mut model = NodeModel::new(registration_id);
            model.attributes = attributes;

            Some(model)
        }
        Event::End(_) => None,
        Event::Comment(_) => return build_element(reader),
        Event::Eof => return Err(XmlParseError::UnexpectedEof),
        event => {
            return Err(XmlParseError::InternalError(format!(
                "unexpected XML event {event:?}"
            )))
        }
    };

    Ok(model)
}

fn skip_to_matching_end(reader: &mut XmlReader, tag: &str) -> Result<(), XmlParseError> {
    let mut buf = Vec::new();
    let mut depth = 1usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                let name = String::from_utf8(e.name().0.into())?;
                depth -= 1;
                if depth == 0 {
                    if name != tag {
                        return Err(XmlParseError::InternalError(format!(
                            "mismatched end tag </{name}>, expected </{tag}>"
                        )));
                    }
                    return Ok(());
                }
            }
            Event::Eof => return Err(XmlParseError::UnexpectedEof),
            _ => {}
        }
        buf.clear();
    }
}
