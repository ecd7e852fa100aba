//! Schema-driven mapping between attribute values and native documents
//!
//! The remote speaks JSON objects keyed by native (camelCase) field
//! names. Every declared attribute has exactly one mapping rule, so
//! decoding rejects fields the schema does not declare.

use crate::error::{Error, Result};
use crate::schema::{BlockSpec, Nesting, ResourceSchema, Selection, ValueType};
use crate::value::{AttributePath, AttributeValue, Attributes, Scalar};
use serde_json::Value;

/// A resource in the remote's native representation, without its id.
pub type NativeObject = serde_json::Map<String, Value>;

/// Encode planned attributes as a native document.
///
/// Null and unknown attributes are omitted so the remote fills them.
pub fn to_native(schema: &ResourceSchema, attrs: &Attributes) -> Result<NativeObject> {
    encode_object(schema, attrs, &AttributePath::root())
}

/// Decode a native document into attributes with every declared key.
pub fn from_native(schema: &ResourceSchema, document: &NativeObject) -> Result<Attributes> {
    decode_object(schema, document, &AttributePath::root())
}

fn encode_object(
    schema: &ResourceSchema,
    attrs: &Attributes,
    path: &AttributePath,
) -> Result<NativeObject> {
    let mut doc = NativeObject::new();

    for spec in &schema.attributes {
        let value = attrs.get(&spec.name).unwrap_or(&AttributeValue::Null);
        if value.is_null() || value.is_unknown() {
            continue;
        }
        doc.insert(spec.native.clone(), encode_value(value, &path.child(&spec.name))?);
    }

    for block in &schema.blocks {
        let value = attrs.get(&block.name).unwrap_or(&AttributeValue::Null);
        if value.is_null() || value.is_unknown() {
            continue;
        }
        let block_path = path.child(&block.name);
        let inner = block_schema(block, attrs, &block_path)?;
        let encoded = match (block.nesting, value) {
            (Nesting::Single, AttributeValue::Object(obj)) => {
                Value::Object(encode_object(inner, obj, &block_path)?)
            }
            (Nesting::List, AttributeValue::List(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = block_path.index(i);
                    let obj = item
                        .as_object()
                        .ok_or_else(|| Error::invalid(&item_path, "expected block"))?;
                    out.push(Value::Object(encode_object(inner, obj, &item_path)?));
                }
                Value::Array(out)
            }
            (_, other) => {
                return Err(Error::invalid(
                    &block_path,
                    format!("expected block, found {}", other.type_name()),
                ));
            }
        };
        doc.insert(block.native.clone(), encoded);
    }

    Ok(doc)
}

fn encode_value(value: &AttributeValue, path: &AttributePath) -> Result<Value> {
    match value {
        AttributeValue::Null => Ok(Value::Null),
        AttributeValue::Unknown => Err(Error::invalid(path, "value is not known yet")),
        AttributeValue::Scalar(Scalar::String(s)) => Ok(Value::String(s.clone())),
        AttributeValue::Scalar(Scalar::Bool(b)) => Ok(Value::Bool(*b)),
        AttributeValue::Scalar(Scalar::Number(n)) => Ok(Value::Number(n.clone())),
        AttributeValue::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| encode_value(item, &path.index(i)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        AttributeValue::Object(_) => Err(Error::invalid(path, "objects are only allowed as blocks")),
    }
}

fn block_schema<'a>(
    block: &'a BlockSpec,
    parent: &Attributes,
    path: &AttributePath,
) -> Result<&'a ResourceSchema> {
    match block.shape.select(parent) {
        Selection::Schema(schema) => Ok(schema),
        Selection::NoVariant(tag) => Err(Error::invalid(path, format!("no variant for {tag:?}"))),
        Selection::Pending | Selection::Unselected => Err(Error::invalid(
            path,
            "block shape depends on a value that is not set",
        )),
    }
}

fn decode_object(
    schema: &ResourceSchema,
    document: &NativeObject,
    path: &AttributePath,
) -> Result<Attributes> {
    for field in document.keys() {
        let declared = schema.attributes.iter().any(|a| &a.native == field)
            || schema.blocks.iter().any(|b| &b.native == field);
        if !declared {
            return Err(Error::invalid(
                &path.child(field),
                "field is not declared by the schema",
            ));
        }
    }

    let mut attrs = Attributes::new();
    for spec in &schema.attributes {
        let attr_path = path.child(&spec.name);
        let value = match document.get(&spec.native) {
            None | Some(Value::Null) => AttributeValue::Null,
            Some(raw) => decode_value(&spec.value_type, raw, &attr_path)?,
        };
        attrs.insert(spec.name.clone(), value);
    }

    // Blocks are decoded after attributes so selected shapes can see
    // their discriminator.
    let mut blocks = Vec::with_capacity(schema.blocks.len());
    for block in &schema.blocks {
        let block_path = path.child(&block.name);
        let value = match document.get(&block.native) {
            None | Some(Value::Null) => AttributeValue::Null,
            Some(raw) => {
                let inner = block_schema(block, &attrs, &block_path)?;
                decode_block(block.nesting, inner, raw, &block_path)?
            }
        };
        blocks.push((block.name.clone(), value));
    }
    attrs.extend(blocks);

    Ok(attrs)
}

fn decode_block(
    nesting: Nesting,
    schema: &ResourceSchema,
    raw: &Value,
    path: &AttributePath,
) -> Result<AttributeValue> {
    match (nesting, raw) {
        (Nesting::Single, Value::Object(obj)) => {
            Ok(AttributeValue::Object(decode_object(schema, obj, path)?))
        }
        (Nesting::List, Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_path = path.index(i);
                let Value::Object(obj) = item else {
                    return Err(Error::invalid(&item_path, "expected object"));
                };
                out.push(AttributeValue::Object(decode_object(schema, obj, &item_path)?));
            }
            Ok(AttributeValue::List(out))
        }
        (Nesting::Single, _) => Err(Error::invalid(path, "expected object")),
        (Nesting::List, _) => Err(Error::invalid(path, "expected array")),
    }
}

fn decode_value(value_type: &ValueType, raw: &Value, path: &AttributePath) -> Result<AttributeValue> {
    match (value_type, raw) {
        (ValueType::String, Value::String(s)) => Ok(AttributeValue::string(s.clone())),
        (ValueType::Bool, Value::Bool(b)) => Ok(AttributeValue::bool(*b)),
        (ValueType::Number, Value::Number(n)) => Ok(AttributeValue::number(n.clone())),
        (ValueType::List(element), Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| decode_value(element, item, &path.index(i)))
            .collect::<Result<Vec<_>>>()
            .map(AttributeValue::List),
        (expected, found) => Err(Error::invalid(
            path,
            format!("expected {expected}, found {}", json_type(found)),
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSpec, BlockSpec, Role};
    use serde_json::json;

    fn schema() -> ResourceSchema {
        ResourceSchema::new()
            .attribute(AttributeSpec::required("type", ValueType::String))
            .attribute(AttributeSpec::optional_computed("retry_join", ValueType::list_of(ValueType::String)))
            .attribute(AttributeSpec::optional("serf_lan", ValueType::Number).native("serfLAN"))
            .block(BlockSpec::selected(
                "policy_data",
                Role::Required,
                "type",
                [
                    (
                        "vault",
                        ResourceSchema::new()
                            .attribute(AttributeSpec::required("cluster_id", ValueType::String).native("id"))
                            .attribute(AttributeSpec::optional("read", ValueType::Bool)),
                    ),
                    (
                        "terraform",
                        ResourceSchema::new()
                            .attribute(AttributeSpec::required("workspace_id", ValueType::String).native("id")),
                    ),
                ],
            ))
    }

    fn as_object(value: Value) -> NativeObject {
        match value {
            Value::Object(obj) => obj,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_encode_omits_null_and_unknown() {
        let attrs = Attributes::from([
            ("type".to_string(), AttributeValue::from("vault")),
            ("retry_join".to_string(), AttributeValue::Unknown),
            ("serf_lan".to_string(), AttributeValue::from(8301_i64)),
            (
                "policy_data".to_string(),
                AttributeValue::object([
                    ("cluster_id", AttributeValue::from("c-1")),
                    ("read", AttributeValue::Null),
                ]),
            ),
        ]);
        let doc = to_native(&schema(), &attrs).unwrap();
        assert_eq!(
            Value::Object(doc),
            json!({"type": "vault", "serfLAN": 8301, "policyData": {"id": "c-1"}})
        );
    }

    #[test]
    fn test_decode_fills_every_key() {
        let doc = as_object(json!({
            "type": "terraform",
            "retryJoin": ["a", "b"],
            "policyData": {"id": "ws-1"}
        }));
        let attrs = from_native(&schema(), &doc).unwrap();
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs["serf_lan"], AttributeValue::Null);
        assert_eq!(
            attrs["retry_join"],
            AttributeValue::List(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            attrs["policy_data"],
            AttributeValue::object([("workspace_id", AttributeValue::from("ws-1"))])
        );
    }

    #[test]
    fn test_decode_rejects_undeclared_field() {
        let doc = as_object(json!({"type": "vault", "colour": "blue"}));
        let err = from_native(&schema(), &doc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for colour: field is not declared by the schema"
        );

        let doc = as_object(json!({"type": "vault", "policyData": {"id": "c", "plan": true}}));
        let err = from_native(&schema(), &doc).unwrap_err();
        assert!(err.to_string().contains("policy_data.plan"));
    }

    #[test]
    fn test_decode_type_mismatch() {
        let doc = as_object(json!({"type": "vault", "serfLAN": "8301"}));
        let err = from_native(&schema(), &doc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for serf_lan: expected number, found string"
        );
    }

    #[test]
    fn test_unknown_variant_is_rejected() {
        let doc = as_object(json!({"type": "nomad", "policyData": {"id": "c"}}));
        assert!(from_native(&schema(), &doc).is_err());
    }

    #[test]
    fn test_round_trip_through_native() {
        let doc = as_object(json!({
            "type": "vault",
            "retryJoin": [],
            "serfLAN": 8301,
            "policyData": {"id": "c-1", "read": true}
        }));
        let attrs = from_native(&schema(), &doc).unwrap();
        let encoded = to_native(&schema(), &attrs).unwrap();
        assert_eq!(encoded, doc);
    }
}
