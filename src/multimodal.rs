//! Separates embedded media from structured content.
//!
//! Traversal is depth-first in field-declaration order, so media is reported
//! in the order it appears when the record is read top to bottom. Providers
//! correlate attached media positionally, which makes this order part of the
//! contract.

use serde::Serialize;
use serde_json::Value;

use crate::content::{Content, Node};
use crate::error::Result;
use crate::media::Media;

/// Media pulled out of a content tree plus the JSON-compatible remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub media: Vec<Media>,
    /// `None` when the root itself was media.
    pub residual: Option<Node>,
}

impl Extraction {
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub fn residual_value(&self) -> Result<Option<Value>> {
        self.residual.as_ref().map(Node::to_value).transpose()
    }

    /// Residual as JSON text; empty when nothing but media was present.
    pub fn residual_json(&self) -> Result<String> {
        match &self.residual {
            Some(node) => Ok(serde_json::to_string(node)?),
            None => Ok(String::new()),
        }
    }
}

pub fn extract(node: &Node) -> Extraction {
    let mut media = Vec::new();
    let residual = strip(node, &mut media);
    Extraction { media, residual }
}

/// Extract from raw JSON. Unrecognized media objects fail with their path.
pub fn extract_value(value: Value) -> Result<Extraction> {
    Ok(extract(&Node::from_value(value)?))
}

/// Extract from a typed record, e.g. an `IoSchema` with media fields.
pub fn extract_schema<T: Serialize + ?Sized>(record: &T) -> Result<Extraction> {
    Ok(extract(&Node::from_serialize(record)?))
}

pub fn extract_content(content: &Content) -> Extraction {
    match content {
        Content::Text(text) => Extraction {
            media: Vec::new(),
            residual: Some(Node::String(text.clone())),
        },
        Content::Media(media) => Extraction {
            media: vec![media.clone()],
            residual: None,
        },
        Content::Structured(node) => extract(node),
    }
}

fn strip(node: &Node, media: &mut Vec<Media>) -> Option<Node> {
    match node {
        Node::Media(found) => {
            media.push(found.clone());
            None
        }
        Node::List(items) if items.is_empty() => Some(Node::List(Vec::new())),
        Node::List(items) => {
            let kept: Vec<Node> = items.iter().filter_map(|item| strip(item, media)).collect();
            // a list holding nothing but media is itself pure media
            if kept.is_empty() {
                None
            } else {
                Some(Node::List(kept))
            }
        }
        Node::Record(fields) => Some(Node::Record(
            fields
                .iter()
                .filter_map(|(key, value)| strip(value, media).map(|rest| (key.clone(), rest)))
                .collect(),
        )),
        Node::Null | Node::Bool(_) | Node::Number(_) | Node::String(_) => Some(node.clone()),
    }
}
