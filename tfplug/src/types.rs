//! Core type system for tfplug
//!
//! This module provides the value types exchanged with Terraform: the
//! `Dynamic` value tree, the object-shaped `DynamicValue` used for config
//! and state, attribute paths and diagnostics.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel used for unknown values in human readable encodings
const UNKNOWN_SENTINEL: &str = "__unknown__";

/// msgpack extension code Terraform uses for unknown values
const UNKNOWN_EXT_CODE: i8 = 0;

/// Dynamic represents Terraform values that can be of any type
/// This is the core type for all configuration and state data
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64 to match Terraform)
    Number(f64),
    /// String value
    String(String),
    /// List of values (also used for sets and nested blocks)
    List(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as Maps)
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn as_string(&self) -> Option<&String> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numbers may arrive as strings when Terraform encodes big values
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            Dynamic::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Dynamic>> {
        match self {
            Dynamic::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// True for values that carry actual data
    pub fn is_known(&self) -> bool {
        !self.is_null() && !self.is_unknown()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }

    /// Builds a list of strings
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Dynamic::List(
            items
                .into_iter()
                .map(|s| Dynamic::String(s.into()))
                .collect(),
        )
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl From<f64> for Dynamic {
    fn from(value: f64) -> Self {
        Dynamic::Number(value)
    }
}

impl From<i64> for Dynamic {
    fn from(value: i64) -> Self {
        Dynamic::Number(value as f64)
    }
}

impl<T: Into<Dynamic>> From<Option<T>> for Dynamic {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Dynamic::Null)
    }
}

/// Serializes the payload of an extension value as a msgpack bin
struct ExtPayload<'a>(&'a [u8]);

impl Serialize for ExtPayload<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(self.0)
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => {
                if serializer.is_human_readable() {
                    serializer.serialize_str(UNKNOWN_SENTINEL)
                } else {
                    serializer.serialize_newtype_struct(
                        rmp_serde::MSGPACK_EXT_STRUCT_NAME,
                        &(UNKNOWN_EXT_CODE, ExtPayload(&[0])),
                    )
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Dynamic, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Dynamic::deserialize(deserializer)
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                if value == UNKNOWN_SENTINEL {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                if value == UNKNOWN_SENTINEL {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value))
                }
            }

            // msgpack extension values surface as a newtype wrapping (code, payload)
            fn visit_newtype_struct<D>(
                self,
                deserializer: D,
            ) -> std::result::Result<Dynamic, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                de::IgnoredAny::deserialize(deserializer)?;
                Ok(Dynamic::Unknown)
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut hashmap = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    hashmap.insert(key, value);
                }
                Ok(Dynamic::Map(hashmap))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue is an object value: the attributes of a config, plan or state
///
/// Getters treat null and unknown attributes as absent, so resource code only
/// sees values the user (or a previous apply) actually set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicValue {
    pub values: HashMap<String, Dynamic>,
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;

impl DynamicValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: HashMap<String, Dynamic>) -> Self {
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.values.get(name).filter(|v| v.is_known())
    }

    pub fn is_unknown(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(Dynamic::is_unknown)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Dynamic::as_string).cloned()
    }

    /// Like `get_string` but empty strings count as absent
    pub fn get_non_empty_string(&self, name: &str) -> Option<String> {
        self.get_string(name).filter(|s| !s.is_empty())
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Dynamic::as_number)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get_number(name).map(|n| n as i64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Dynamic::as_bool)
    }

    pub fn get_list(&self, name: &str) -> Option<Vec<Dynamic>> {
        self.get(name).and_then(Dynamic::as_list).cloned()
    }

    /// Known string elements of a list or set attribute
    pub fn get_string_list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(Dynamic::as_list)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_string().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_map(&self, name: &str) -> Option<HashMap<String, Dynamic>> {
        self.get(name).and_then(Dynamic::as_map).cloned()
    }

    pub fn get_string_map(&self, name: &str) -> HashMap<String, String> {
        self.get(name)
            .and_then(Dynamic::as_map)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_string().map(|s| (k.clone(), s.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every element of a nested block (list or set nesting)
    pub fn get_blocks(&self, name: &str) -> Vec<DynamicValue> {
        match self.get(name) {
            Some(Dynamic::List(items)) => items
                .iter()
                .filter_map(|item| item.as_map().cloned().map(DynamicValue::from_map))
                .collect(),
            Some(Dynamic::Map(m)) => vec![DynamicValue::from_map(m.clone())],
            _ => Vec::new(),
        }
    }

    /// The first element of a nested block, for blocks limited to one item
    pub fn get_block(&self, name: &str) -> Option<DynamicValue> {
        self.get_blocks(name).into_iter().next()
    }

    pub fn set(&mut self, name: &str, value: Dynamic) {
        self.values.insert(name.to_string(), value);
    }

    pub fn set_string(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, Dynamic::String(value.into()));
    }

    /// Sets the string or null when absent
    pub fn set_optional_string(&mut self, name: &str, value: Option<impl Into<String>>) {
        self.set(name, value.map(|v| Dynamic::String(v.into())).unwrap_or(Dynamic::Null));
    }

    pub fn set_number(&mut self, name: &str, value: f64) {
        self.set(name, Dynamic::Number(value));
    }

    pub fn set_i64(&mut self, name: &str, value: i64) {
        self.set(name, Dynamic::Number(value as f64));
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set(name, Dynamic::Bool(value));
    }

    pub fn set_list(&mut self, name: &str, value: Vec<Dynamic>) {
        self.set(name, Dynamic::List(value));
    }

    pub fn set_string_list<I, S>(&mut self, name: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(name, Dynamic::string_list(items));
    }

    pub fn set_map(&mut self, name: &str, value: HashMap<String, Dynamic>) {
        self.set(name, Dynamic::Map(value));
    }

    pub fn set_string_map(&mut self, name: &str, value: &HashMap<String, String>) {
        self.set(
            name,
            Dynamic::Map(
                value
                    .iter()
                    .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
                    .collect(),
            ),
        );
    }

    pub fn set_blocks(&mut self, name: &str, blocks: Vec<DynamicValue>) {
        self.set(
            name,
            Dynamic::List(blocks.into_iter().map(DynamicValue::into_dynamic).collect()),
        );
    }

    pub fn set_null(&mut self, name: &str) {
        self.set(name, Dynamic::Null);
    }

    /// Copies an attribute verbatim from another value (config or prior state)
    pub fn copy_from(&mut self, other: &DynamicValue, name: &str) {
        let value = other.values.get(name).cloned().unwrap_or(Dynamic::Null);
        self.set(name, value);
    }

    pub fn into_dynamic(self) -> Dynamic {
        Dynamic::Map(self.values)
    }

    /// Encoding for the wire protocol; Terraform uses msgpack by default
    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::encode::to_vec_named(&self.values)
            .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e)))
    }

    /// A null object decodes to an empty value
    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        Ok(Self::decode_msgpack_nullable(data)?.unwrap_or_default())
    }

    /// Like `decode_msgpack`, but keeps a null object distinct as `None`
    pub fn decode_msgpack_nullable(data: &[u8]) -> Result<Option<Self>> {
        if data.is_empty() {
            return Ok(None);
        }

        match rmp_serde::decode::from_slice::<Dynamic>(data) {
            Ok(value) => Self::from_object(value),
            Err(e) => Err(TfplugError::DecodingError(format!(
                "msgpack decoding failed: {}",
                e
            ))),
        }
    }

    /// msgpack encoding of a null object
    pub fn encode_null_msgpack() -> Result<Vec<u8>> {
        rmp_serde::encode::to_vec(&Dynamic::Null)
            .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e)))
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.values)
            .map_err(|e| TfplugError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        Ok(Self::decode_json_nullable(data)?.unwrap_or_default())
    }

    pub fn decode_json_nullable(data: &[u8]) -> Result<Option<Self>> {
        if data.is_empty() {
            return Ok(None);
        }

        let value: Dynamic = serde_json::from_slice(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Self::from_object(value)
    }

    fn from_object(value: Dynamic) -> Result<Option<Self>> {
        match value {
            Dynamic::Map(values) => Ok(Some(Self { values })),
            Dynamic::Null => Ok(None),
            other => Err(TfplugError::TypeMismatch {
                expected: "object".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[\"{}\"]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    /// Access attribute by name in object/map
    AttributeName(String),
    /// Access element by string key (for maps)
    ElementKeyString(String),
    /// Access element by integer index (for lists)
    ElementKeyInt(i64),
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub summary: String,
    pub detail: Option<String>,
    pub attribute: Option<AttributePath>,
}

/// Diagnostics collects errors and warnings for a single RPC
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.errors.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: None,
        });
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.warnings.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: None,
        });
    }

    pub fn add_attribute_error(
        &mut self,
        attribute: AttributePath,
        summary: impl Into<String>,
        detail: Option<impl Into<String>>,
    ) {
        self.errors.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: Some(attribute),
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Convenience for the common single error case
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        let mut diags = Self::new();
        diags.add_error(summary, Some(detail));
        diags
    }
}
