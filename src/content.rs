//! Message content and the structured content tree.

use std::fmt;
use std::ops::Deref;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::error::{AtomicError, Result};
use crate::media::{Media, MEDIA_TAG};

const ROOT: &str = "$";

/// One node of a structured content tree.
///
/// Records keep their fields in declaration order so that a tree converted
/// from a typed schema re-serializes to the same JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Media(Media),
    List(Vec<Node>),
    Record(Vec<(String, Node)>),
}

impl Node {
    /// Convert a JSON value, recognizing tagged media objects at any depth.
    ///
    /// Fails with [`AtomicError::UnsupportedNode`] naming the field path when a
    /// `$media` object is malformed or names an unknown media kind.
    pub fn from_value(value: Value) -> Result<Self> {
        convert(value, ROOT)
    }

    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Self::from_value(serde_json::to_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_value()?).map_err(|err| AtomicError::validation(ROOT, err))
    }

    pub fn is_media(&self) -> bool {
        matches!(self, Node::Media(_))
    }

    /// Field of a record node.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Record(fields) => fields.iter().find(|(name, _)| name == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Number of media references anywhere below this node.
    pub fn media_count(&self) -> usize {
        match self {
            Node::Media(_) => 1,
            Node::List(items) => items.iter().map(Node::media_count).sum(),
            Node::Record(fields) => fields.iter().map(|(_, v)| v.media_count()).sum(),
            Node::Null | Node::Bool(_) | Node::Number(_) | Node::String(_) => 0,
        }
    }
}

fn convert(value: Value, path: &str) -> Result<Node> {
    match value {
        Value::Null => Ok(Node::Null),
        Value::Bool(flag) => Ok(Node::Bool(flag)),
        Value::Number(number) => Ok(Node::Number(number)),
        Value::String(text) => Ok(Node::String(text)),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| convert(item, &format!("{path}[{index}]")))
            .collect::<Result<Vec<_>>>()
            .map(Node::List),
        Value::Object(map) if map.contains_key(MEDIA_TAG) => {
            serde_json::from_value::<Media>(Value::Object(map))
                .map(Node::Media)
                .map_err(|err| AtomicError::unsupported(path, format!("unrecognized media object: {err}")))
        }
        Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| {
                let child = convert(item, &format!("{path}.{key}"))?;
                Ok((key, child))
            })
            .collect::<Result<Vec<_>>>()
            .map(Node::Record),
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(flag) => serializer.serialize_bool(*flag),
            Node::Number(number) => number.serialize(serializer),
            Node::String(text) => serializer.serialize_str(text),
            Node::Media(media) => media.serialize(serializer),
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, item) in fields {
                    map.serialize_entry(key, item)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Node::from_value(value).map_err(D::Error::custom)
    }
}

/// Content of a single message.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Media(Media),
    /// A record or a list, possibly with media nested inside.
    Structured(Structure),
}

/// A record or list node.
///
/// Scalars and bare media have their own [`Content`] variants, so this is the
/// only shape `Content::Structured` can hold; that keeps `dump`/`load` exact.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure(Node);

impl Structure {
    pub fn new(node: Node) -> Result<Self> {
        match node {
            Node::Record(_) | Node::List(_) => Ok(Self(node)),
            other => Err(AtomicError::validation(
                ROOT,
                format!(
                    "structured content must be a record or list, found {}",
                    node_kind(&other)
                ),
            )),
        }
    }

    pub fn as_node(&self) -> &Node {
        &self.0
    }

    pub fn into_node(self) -> Node {
        self.0
    }
}

impl Deref for Structure {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.0
    }
}

impl TryFrom<Node> for Structure {
    type Error = AtomicError;

    fn try_from(node: Node) -> Result<Self> {
        Self::new(node)
    }
}

impl Serialize for Structure {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl Content {
    /// Accepts a string, a media object, a record or a list.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(Content::Text(text)),
            Value::Object(_) | Value::Array(_) => Self::from_node(Node::from_value(value)?),
            other => Err(AtomicError::validation(
                ROOT,
                format!(
                    "content must be a string, record or list, found {}",
                    value_kind(&other)
                ),
            )),
        }
    }

    pub fn from_node(node: Node) -> Result<Self> {
        match node {
            Node::Media(media) => Ok(Content::Media(media)),
            Node::String(text) => Ok(Content::Text(text)),
            node @ (Node::Record(_) | Node::List(_)) => Ok(Content::Structured(Structure(node))),
            Node::Null | Node::Bool(_) | Node::Number(_) => Err(AtomicError::validation(
                ROOT,
                "content must be a string, record or list",
            )),
        }
    }

    /// Content for a typed record, e.g. an agent input or output schema.
    pub fn from_schema<T: Serialize + ?Sized>(record: &T) -> Result<Self> {
        Self::from_value(serde_json::to_value(record)?)
    }

    /// Parse the content back into a typed record. Text content is read as
    /// JSON text.
    pub fn to_schema<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Content::Text(text) => {
                serde_json::from_str(text).map_err(|err| AtomicError::validation(ROOT, err))
            }
            Content::Media(media) => serde_json::from_value(serde_json::to_value(media)?)
                .map_err(|err| AtomicError::validation(ROOT, err)),
            Content::Structured(node) => node.deserialize_into(),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn media_count(&self) -> usize {
        match self {
            Content::Text(_) => 0,
            Content::Media(_) => 1,
            Content::Structured(node) => node.media_count(),
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Text(text) => f.write_str(text),
            Content::Media(media) => write!(f, "<{} media>", media.kind.as_str()),
            Content::Structured(node) => {
                let text = serde_json::to_string(node).map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Media> for Content {
    fn from(media: Media) -> Self {
        Content::Media(media)
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Content::Text(text) => serializer.serialize_str(text),
            Content::Media(media) => media.serialize(serializer),
            Content::Structured(node) => node.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Content::from_value(value).map_err(D::Error::custom)
    }
}

fn node_kind(node: &Node) -> &'static str {
    match node {
        Node::Null => "null",
        Node::Bool(_) => "a boolean",
        Node::Number(_) => "a number",
        Node::String(_) => "a string",
        Node::Media(_) => "media",
        Node::List(_) => "a list",
        Node::Record(_) => "a record",
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a record",
    }
}
