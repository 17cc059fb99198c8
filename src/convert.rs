//! XML to JSON conversion
//!
//! Mapping rules, kept compatible with the files the server historically
//! produced:
//! - a text-only element becomes a JSON string, or an object with a
//!   `__text` key when the element also carries attributes
//! - attributes are stored under their key prefixed with `_`
//! - an element with children becomes an object; any interleaved character
//!   data is whitespace-stripped and stored under `__text` when non-empty
//! - repeated sibling tags collapse into an array
//! - the document object carries `version` and `encoding` keys; duplicate
//!   top-level tags abort the body and leave only those two keys

use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::AppError;
use crate::xml::{XmlDocument, XmlNode};

/// Convert one element to a JSON value
pub fn node_to_value(node: &XmlNode) -> Value {
    // Text-only leaf
    if node.children.is_empty() {
        if let Some(text) = &node.inner_text {
            if node.attributes.is_empty() {
                return Value::String(text.clone());
            }
            let mut object = Map::new();
            object.insert("__text".to_string(), Value::String(text.clone()));
            for attr in &node.attributes {
                object.insert(format!("_{}", attr.key), Value::String(attr.value.clone()));
            }
            return Value::Object(object);
        }
    }

    let mut object = Map::new();

    if let Some(text) = &node.inner_text {
        let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if !stripped.is_empty() {
            object.insert("__text".to_string(), Value::String(stripped));
        }
    }

    for child in &node.children {
        let child_value = node_to_value(child);
        match object.get_mut(&child.tag) {
            Some(Value::Array(items)) => items.push(child_value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, child_value]);
            }
            None => {
                object.insert(child.tag.clone(), child_value);
            }
        }
    }

    Value::Object(object)
}

/// Convert a whole document to a JSON value
pub fn document_to_value(doc: &XmlDocument) -> Value {
    let mut object = Map::new();
    object.insert(
        "version".to_string(),
        json!(doc.version.as_deref().unwrap_or("1.0")),
    );
    object.insert(
        "encoding".to_string(),
        json!(doc.encoding.as_deref().unwrap_or("UTF-8")),
    );

    // Duplicate top-level tags cannot be represented; keep the header only
    let children = &doc.root.children;
    for (i, a) in children.iter().enumerate() {
        for b in &children[i + 1..] {
            if a.tag == b.tag {
                return Value::Object(object);
            }
        }
    }

    for child in children {
        object.insert(child.tag.clone(), node_to_value(child));
    }
    Value::Object(object)
}

/// Convert the XML file at `xml_path` and write pretty JSON to `json_path`
///
/// The source must carry a `.xml` extension. Parse failures surface as
/// `AppError::Xml`; callers log them rather than reporting to the client.
pub fn xml_to_json(xml_path: &Path, json_path: &Path) -> Result<(), AppError> {
    if xml_path.extension().and_then(|e| e.to_str()) != Some("xml") {
        return Err(AppError::Xml(format!(
            "{} is not an .xml file",
            xml_path.display()
        )));
    }

    let text = std::fs::read_to_string(xml_path)?;
    let doc = XmlDocument::parse(&text)?;
    let value = document_to_value(&doc);
    std::fs::write(json_path, serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> XmlDocument {
        XmlDocument::parse(input).unwrap()
    }

    #[test]
    fn test_text_leaf_becomes_string() {
        let doc = parse("<store><name>Books</name></store>");
        let value = node_to_value(&doc.root.children[0]);
        assert_eq!(value, json!({ "name": "Books" }));
    }

    #[test]
    fn test_leaf_attributes_get_underscore_prefix() {
        let doc = parse("<store><name lang=\"en\">Books</name></store>");
        let value = node_to_value(&doc.root.children[0]);
        assert_eq!(
            value,
            json!({ "name": { "__text": "Books", "_lang": "en" } })
        );
    }

    #[test]
    fn test_repeated_tags_collapse_into_array() {
        let doc = parse("<store><book>A</book><book>B</book><book>C</book></store>");
        let value = node_to_value(&doc.root.children[0]);
        assert_eq!(value, json!({ "book": ["A", "B", "C"] }));
    }

    #[test]
    fn test_document_header_keys() {
        let doc = parse("<?xml version=\"1.1\" encoding=\"ascii\"?><a><b>x</b></a>");
        let value = document_to_value(&doc);
        assert_eq!(value["version"], json!("1.1"));
        assert_eq!(value["encoding"], json!("ascii"));
        assert_eq!(value["a"], json!({ "b": "x" }));
    }

    #[test]
    fn test_duplicate_root_tags_abort_body() {
        let doc = parse("<a>1</a><a>2</a>");
        let value = document_to_value(&doc);
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("version"));
        assert!(object.contains_key("encoding"));
    }

    #[test]
    fn test_xml_to_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let xml = dir.path().join("catalog.xml");
        let json = dir.path().join("catalog.json");
        std::fs::write(
            &xml,
            "<store><book><title>A</title></book><book><title>B</title></book></store>",
        )
        .unwrap();

        xml_to_json(&xml, &json).unwrap();

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value["store"]["book"][1]["title"], json!("B"));
    }

    #[test]
    fn test_non_xml_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("catalog.txt");
        std::fs::write(&src, "<a>x</a>").unwrap();
        let err = xml_to_json(&src, &dir.path().join("out.json")).unwrap_err();
        assert!(matches!(err, AppError::Xml(_)));
    }
}
