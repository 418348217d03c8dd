use crate::types::Dynamic;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    pub fn list_of(elem: AttributeType) -> Self {
        AttributeType::List(Box::new(elem))
    }

    pub fn set_of(elem: AttributeType) -> Self {
        AttributeType::Set(Box::new(elem))
    }

    pub fn map_of(elem: AttributeType) -> Self {
        AttributeType::Map(Box::new(elem))
    }

    /// The cty JSON type encoding sent in schema responses
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Map, Value};

        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_json()]),
            AttributeType::Object(attrs) => {
                let fields: Map<String, Value> = attrs
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Null and unknown values conform to every type
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (value, self) {
            (Dynamic::Null, _) | (Dynamic::Unknown, _) => true,
            (Dynamic::String(_), AttributeType::String) => true,
            (Dynamic::Number(_), AttributeType::Number) => true,
            (Dynamic::String(s), AttributeType::Number) => s.parse::<f64>().is_ok(),
            (Dynamic::Bool(_), AttributeType::Bool) => true,
            (Dynamic::List(items), AttributeType::List(elem))
            | (Dynamic::List(items), AttributeType::Set(elem)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (Dynamic::Map(map), AttributeType::Map(elem)) => {
                map.values().all(|item| elem.accepts(item))
            }
            (Dynamic::Map(map), AttributeType::Object(attrs)) => attrs
                .iter()
                .all(|(name, ty)| map.get(name).map_or(true, |v| ty.accepts(v))),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_types_encode_as_strings() {
        assert_eq!(AttributeType::String.to_json_bytes(), b"\"string\"".to_vec());
        assert_eq!(AttributeType::Number.to_json_bytes(), b"\"number\"".to_vec());
        assert_eq!(AttributeType::Bool.to_json_bytes(), b"\"bool\"".to_vec());
    }

    #[test]
    fn collection_types_encode_with_element_type() {
        let list = AttributeType::list_of(AttributeType::String);
        assert_eq!(list.to_json(), serde_json::json!(["list", "string"]));

        let nested = AttributeType::set_of(AttributeType::map_of(AttributeType::Number));
        assert_eq!(
            nested.to_json(),
            serde_json::json!(["set", ["map", "number"]])
        );
    }

    #[test]
    fn object_type_encodes_fields() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), AttributeType::String);
        attrs.insert("port".to_string(), AttributeType::Number);

        let ty = AttributeType::Object(attrs);
        assert_eq!(
            ty.to_json(),
            serde_json::json!(["object", {"name": "string", "port": "number"}])
        );
    }

    #[test]
    fn accepts_matching_values() {
        let list = AttributeType::list_of(AttributeType::String);
        assert!(list.accepts(&Dynamic::string_list(["a", "b"])));
        assert!(!list.accepts(&Dynamic::List(vec![Dynamic::Bool(true)])));
        assert!(AttributeType::Number.accepts(&Dynamic::Unknown));
        assert!(!AttributeType::Bool.accepts(&Dynamic::String("yes".to_string())));
    }
}
