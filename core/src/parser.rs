//! Typed deserialization of untyped response trees.
//!
//! # Design
//! `ResponseParser` is the seam between the response-handling algorithm and
//! whatever knows how to build domain objects. The algorithm only decides
//! *which* shape to ask for; the parser decides *how* to build it.
//! `ObjectParser` is the default: it checks the JSON shape against the
//! `ResponseType`, recognises fault objects, and hands the rest to serde.
//! Parser settings arrive with every call, so one parser serves any number
//! of configurations.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::fault::{ApiFault, FAULT_OBJECT_TYPE};

/// Coarse shape a call is expected to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Object,
    Array,
    Map,
    Scalar,
    Void,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Object => "object",
            ResponseType::Array => "array",
            ResponseType::Map => "map",
            ResponseType::Scalar => "scalar",
            ResponseType::Void => "void",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown response type tag '{0}'")]
pub struct UnknownResponseType(pub String);

/// Accepts the one-letter wire tags as well as the long names.
impl FromStr for ResponseType {
    type Err = UnknownResponseType;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "o" | "object" => Ok(ResponseType::Object),
            "a" | "array" => Ok(ResponseType::Array),
            "m" | "map" => Ok(ResponseType::Map),
            "s" | "n" | "b" | "scalar" => Ok(ResponseType::Scalar),
            "v" | "void" => Ok(ResponseType::Void),
            other => Err(UnknownResponseType(other.to_string())),
        }
    }
}

/// What a call is expected to return: a type tag plus, for objects and
/// collections of objects, the name of the concrete object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseShape {
    pub expected: ResponseType,
    pub subtype: Option<String>,
}

impl ResponseShape {
    pub fn new(expected: ResponseType, subtype: Option<String>) -> Self {
        Self { expected, subtype }
    }

    pub fn object(subtype: impl Into<String>) -> Self {
        Self::new(ResponseType::Object, Some(subtype.into()))
    }

    pub fn array(subtype: impl Into<String>) -> Self {
        Self::new(ResponseType::Array, Some(subtype.into()))
    }

    pub fn map(subtype: impl Into<String>) -> Self {
        Self::new(ResponseType::Map, Some(subtype.into()))
    }

    pub fn scalar() -> Self {
        Self::new(ResponseType::Scalar, None)
    }

    pub fn void() -> Self {
        Self::new(ResponseType::Void, None)
    }

    /// The shape every fault-tagged value is parsed with.
    pub fn fault() -> Self {
        Self::object(FAULT_OBJECT_TYPE)
    }

    pub fn is_void(&self) -> bool {
        self.expected == ResponseType::Void
    }

    fn is_fault(&self) -> bool {
        self.expected == ResponseType::Object && self.subtype.as_deref() == Some(FAULT_OBJECT_TYPE)
    }
}

/// Renders as `type / subtype`, with an empty subtype when none is set.
impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.expected, self.subtype.as_deref().unwrap_or(""))
    }
}

/// What a parser built out of an untyped value.
#[derive(Debug, Clone, PartialEq)]
pub enum Deserialized<T> {
    Value(T),
    Fault(ApiFault),
    /// Nothing to build, e.g. for a void call.
    Empty,
}

pub trait ResponseParser {
    /// Build a `T` (or a fault) out of `raw`, which sits at `path` inside the
    /// response. The root of the response has an empty path.
    fn parse_property<T: DeserializeOwned>(
        &self,
        path: &str,
        shape: &ResponseShape,
        raw: &Value,
        config: &ParserConfig,
    ) -> Result<Deserialized<T>, ParseError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectParser;

impl ObjectParser {
    fn check_object_type(
        &self,
        path: &str,
        shape: &ResponseShape,
        raw: &Value,
        config: &ParserConfig,
    ) -> Result<(), ParseError> {
        if !config.strict_object_type {
            return Ok(());
        }
        let (Some(expected), Some(found)) = (
            shape.subtype.as_deref(),
            raw.get("objectType").and_then(Value::as_str),
        ) else {
            return Ok(());
        };
        if expected == found {
            return Ok(());
        }
        Err(ParseError::ObjectTypeMismatch {
            path: display_path(path),
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

impl ResponseParser for ObjectParser {
    fn parse_property<T: DeserializeOwned>(
        &self,
        path: &str,
        shape: &ResponseShape,
        raw: &Value,
        config: &ParserConfig,
    ) -> Result<Deserialized<T>, ParseError> {
        if shape.is_void() {
            return Ok(Deserialized::Empty);
        }
        if shape.is_fault() || ApiFault::is_tagged(raw) {
            expect_shape(path, ResponseType::Object, raw)?;
            return decode(path, raw).map(Deserialized::Fault);
        }

        expect_shape(path, shape.expected, raw)?;
        match shape.expected {
            ResponseType::Object => self.check_object_type(path, shape, raw, config)?,
            // `Vec<T>` has no slot for a fault, so a failed item fails the whole list.
            ResponseType::Array => {
                if let Some(item) = raw
                    .as_array()
                    .and_then(|items| items.iter().find(|item| ApiFault::is_tagged(item)))
                {
                    return decode(path, item).map(Deserialized::Fault);
                }
            }
            ResponseType::Map | ResponseType::Scalar | ResponseType::Void => {}
        }
        decode(path, raw).map(Deserialized::Value)
    }
}

fn expect_shape(path: &str, expected: ResponseType, raw: &Value) -> Result<(), ParseError> {
    let matches = match expected {
        ResponseType::Object | ResponseType::Map => raw.is_object(),
        ResponseType::Array => raw.is_array(),
        ResponseType::Scalar => !raw.is_object() && !raw.is_array(),
        ResponseType::Void => true,
    };
    if matches {
        return Ok(());
    }
    Err(ParseError::UnexpectedShape {
        path: display_path(path),
        expected,
        found: json_kind(raw),
    })
}

fn decode<T: DeserializeOwned>(path: &str, raw: &Value) -> Result<T, ParseError> {
    <T as serde::Deserialize>::deserialize(raw).map_err(|source| ParseError::Decode {
        path: display_path(path),
        source,
    })
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "response".to_string()
    } else {
        path.to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i64,
    }

    fn parse<T: DeserializeOwned>(shape: &ResponseShape, raw: Value) -> Result<Deserialized<T>, ParseError> {
        ObjectParser.parse_property("", shape, &raw, &ParserConfig::default())
    }

    #[test]
    fn tags_parse_short_and_long_forms() {
        assert_eq!("o".parse::<ResponseType>().unwrap(), ResponseType::Object);
        assert_eq!("array".parse::<ResponseType>().unwrap(), ResponseType::Array);
        assert_eq!("n".parse::<ResponseType>().unwrap(), ResponseType::Scalar);
        assert_eq!("v".parse::<ResponseType>().unwrap(), ResponseType::Void);
        assert_eq!(
            "x".parse::<ResponseType>().unwrap_err(),
            UnknownResponseType("x".to_string())
        );
    }

    #[test]
    fn shape_display_names_type_and_subtype() {
        assert_eq!(ResponseShape::object("Item").to_string(), "object / Item");
        assert_eq!(ResponseShape::scalar().to_string(), "scalar / ");
    }

    #[test]
    fn object_is_decoded_with_serde() {
        let parsed: Deserialized<Item> =
            parse(&ResponseShape::object("Item"), json!({"objectType": "Item", "id": 5})).unwrap();
        assert_eq!(parsed, Deserialized::Value(Item { id: 5 }));
    }

    #[test]
    fn fault_tag_overrides_requested_shape() {
        let parsed: Deserialized<Item> = parse(
            &ResponseShape::object("Item"),
            json!({"objectType": "Fault", "code": "X", "message": "bad"}),
        )
        .unwrap();
        assert_eq!(parsed, Deserialized::Fault(ApiFault::new("X", "bad")));
    }

    #[test]
    fn void_ignores_payload() {
        let parsed: Deserialized<()> = parse(&ResponseShape::void(), json!({"id": 1})).unwrap();
        assert_eq!(parsed, Deserialized::Empty);
    }

    #[test]
    fn array_of_objects() {
        let parsed: Deserialized<Vec<Item>> =
            parse(&ResponseShape::array("Item"), json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(parsed, Deserialized::Value(vec![Item { id: 1 }, Item { id: 2 }]));
    }

    #[test]
    fn array_with_fault_item_is_a_fault() {
        let parsed: Deserialized<Vec<Item>> = parse(
            &ResponseShape::array("Item"),
            json!([{"id": 1}, {"objectType": "Fault", "code": "X", "message": "bad"}]),
        )
        .unwrap();
        assert_eq!(parsed, Deserialized::Fault(ApiFault::new("X", "bad")));
    }

    #[test]
    fn map_of_objects() {
        let parsed: Deserialized<HashMap<String, Item>> =
            parse(&ResponseShape::map("Item"), json!({"a": {"id": 1}})).unwrap();
        let Deserialized::Value(map) = parsed else {
            panic!("expected a value");
        };
        assert_eq!(map["a"], Item { id: 1 });
    }

    #[test]
    fn scalar_values() {
        let parsed: Deserialized<String> = parse(&ResponseShape::scalar(), json!("ks")).unwrap();
        assert_eq!(parsed, Deserialized::Value("ks".to_string()));
        let parsed: Deserialized<u32> = parse(&ResponseShape::scalar(), json!(42)).unwrap();
        assert_eq!(parsed, Deserialized::Value(42));
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let err = parse::<Item>(&ResponseShape::object("Item"), json!([1, 2])).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedShape {
                expected: ResponseType::Object,
                found: "array",
                ..
            }
        ));
        assert_eq!(err.to_string(), "response: expected object, found array");

        let err = parse::<String>(&ResponseShape::scalar(), json!({"a": 1})).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedShape { .. }));
    }

    #[test]
    fn serde_failure_is_a_decode_error() {
        let err = parse::<Item>(&ResponseShape::object("Item"), json!({"id": "five"})).unwrap_err();
        assert!(matches!(err, ParseError::Decode { .. }));
    }

    #[test]
    fn object_type_mismatch_is_tolerated_by_default() {
        let parsed: Deserialized<Item> =
            parse(&ResponseShape::object("Item"), json!({"objectType": "LiveItem", "id": 3})).unwrap();
        assert_eq!(parsed, Deserialized::Value(Item { id: 3 }));
    }

    #[test]
    fn strict_object_type_rejects_mismatch() {
        let strict = ParserConfig {
            strict_object_type: true,
        };
        let err = ObjectParser
            .parse_property::<Item>(
                "",
                &ResponseShape::object("Item"),
                &json!({"objectType": "LiveItem", "id": 3}),
                &strict,
            )
            .unwrap_err();
        assert!(matches!(err, ParseError::ObjectTypeMismatch { .. }));

        // no discriminator, nothing to compare
        let parsed = ObjectParser
            .parse_property::<Item>("", &ResponseShape::object("Item"), &json!({"id": 3}), &strict)
            .unwrap();
        assert_eq!(parsed, Deserialized::Value(Item { id: 3 }));
    }
}
