use serde_json::{Number, Value};

// Basic type aliases for clarity
pub type EntityId = i64;
type Key = String;

/// A value as handed back by the database driver, before normalization.
///
/// The set of kinds is closed: anything the driver produces is mapped onto one
/// of these variants by the adapter in [`crate::db::neo4j`].
#[derive(Clone, Debug, PartialEq)]
pub enum DbValue {
    Null,
    Bool(bool),
    // 64-bit driver integer; wider than what JSON numbers carry safely
    Int(i64),
    // Plain number that already fits the transport format
    Number(Number),
    Text(String),
    List(Vec<DbValue>),
    Map(Vec<(Key, DbValue)>),
    Node(NodeValue),
    Relationship(RelationshipValue),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeValue {
    pub identity: EntityId,
    pub labels: Vec<String>,
    pub properties: Vec<(Key, DbValue)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelationshipValue {
    pub identity: EntityId,
    pub start: EntityId,
    pub end: EntityId,
    pub rel_type: String,
    pub properties: Vec<(Key, DbValue)>,
}

impl DbValue {
    /// Float from the driver. JSON has no NaN or infinities, so those become null.
    pub fn float(f: f64) -> Self {
        Number::from_f64(f).map(DbValue::Number).unwrap_or(DbValue::Null)
    }

    pub fn text(s: impl Into<String>) -> Self {
        DbValue::Text(s.into())
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, DbValue)>) -> Self {
        DbValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }
}

// Lifting already-transported JSON back into the value model. Numbers stay
// plain numbers, so normalizing a lifted value is a no-op.
impl From<Value> for DbValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => DbValue::Null,
            Value::Bool(b) => DbValue::Bool(b),
            Value::Number(n) => DbValue::Number(n),
            Value::String(s) => DbValue::Text(s),
            Value::Array(items) => DbValue::List(items.into_iter().map(DbValue::from).collect()),
            Value::Object(obj) => DbValue::Map(obj.into_iter().map(|(k, v)| (k, DbValue::from(v))).collect()),
        }
    }
}

/// One result row: column alias to value, in the order the driver reported the columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRecord {
    pub fields: Vec<(Key, DbValue)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: DbValue) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&DbValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, DbValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, DbValue)>>(iter: I) -> Self {
        RawRecord { fields: iter.into_iter().collect() }
    }
}
