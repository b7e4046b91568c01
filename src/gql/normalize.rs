use serde_json::{Map, Value};

use crate::db::value::{DbValue, NodeValue, RawRecord, RelationshipValue};

/// A result row ready for JSON transport. Key order follows the driver's column order.
pub type NormalizedRecord = Map<String, Value>;

/// Convert a driver value into a transport-safe JSON value.
///
/// Integers become their exact decimal string; lists and maps are walked
/// recursively keeping order, length and null placement. Graph entities turn
/// into plain objects with the same rule applied to their properties.
/// Applying this to its own output (lifted back through `DbValue::from`) is a no-op.
pub fn normalize(value: DbValue) -> Value {
    match value {
        DbValue::Null => Value::Null,
        DbValue::Bool(b) => Value::Bool(b),
        DbValue::Int(i) => Value::String(i.to_string()),
        DbValue::Number(n) => Value::Number(n),
        DbValue::Text(s) => Value::String(s),
        DbValue::List(items) => Value::Array(items.into_iter().map(normalize).collect()),
        DbValue::Map(entries) => Value::Object(normalize_entries(entries)),
        DbValue::Node(node) => Value::Object(normalize_node(node)),
        DbValue::Relationship(rel) => Value::Object(normalize_relationship(rel)),
    }
}

pub fn normalize_record(record: RawRecord) -> NormalizedRecord {
    normalize_entries(record.fields)
}

fn normalize_entries(entries: Vec<(String, DbValue)>) -> Map<String, Value> {
    entries.into_iter().map(|(k, v)| (k, normalize(v))).collect()
}

fn normalize_node(node: NodeValue) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("identity".into(), Value::String(node.identity.to_string()));
    obj.insert("labels".into(), Value::Array(node.labels.into_iter().map(Value::String).collect()));
    obj.insert("properties".into(), Value::Object(normalize_entries(node.properties)));
    obj
}

fn normalize_relationship(rel: RelationshipValue) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("identity".into(), Value::String(rel.identity.to_string()));
    obj.insert("start".into(), Value::String(rel.start.to_string()));
    obj.insert("end".into(), Value::String(rel.end.to_string()));
    obj.insert("type".into(), Value::String(rel.rel_type));
    obj.insert("properties".into(), Value::Object(normalize_entries(rel.properties)));
    obj
}
