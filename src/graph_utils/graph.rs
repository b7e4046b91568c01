use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const FALLBACK_NODE_LABEL: &str = "Unknown";
pub const FALLBACK_EDGE_LABEL: &str = "RELATED";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeElement {
    pub id: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeElement {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
}

/// One entry of the diagram's element list. Serializes as a bare
/// `{id, label}` or `{id, source, target, label}` object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphElement {
    // Edge first: a node-shaped match would also accept edge objects
    Edge(EdgeElement),
    Node(NodeElement),
}

impl GraphElement {
    pub fn id(&self) -> &str {
        match self {
            GraphElement::Node(n) => &n.id,
            GraphElement::Edge(e) => &e.id,
        }
    }
}

/// Column aliases the projection reads from each record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionFields {
    pub start: String,
    pub relationship: String,
    pub end: String,
}

impl Default for ProjectionFields {
    fn default() -> Self {
        Self { start: "n".into(), relationship: "r".into(), end: "m".into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing field '{0}'")]
    MissingField(String),
    #[error("invalid start node identity")]
    InvalidStartId,
    #[error("invalid end node identity")]
    InvalidEndId,
    #[error("invalid relationship identity")]
    InvalidRelationshipId,
}

/// A record the projection could not use. Never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("record {index} skipped: {reason}")]
pub struct MalformedRecord {
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    pub elements: Vec<GraphElement>,
    pub skipped: Vec<MalformedRecord>,
}

/// Field access over a normalized record, whether it arrived as a JSON object
/// or as an already-unpacked map.
pub trait RecordView {
    fn field(&self, name: &str) -> Option<&Value>;
}

impl RecordView for Map<String, Value> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl RecordView for Value {
    fn field(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.get(name))
    }
}

pub fn project_records<R: RecordView>(records: &[R], fields: &ProjectionFields) -> Vec<GraphElement> {
    project_records_with_report(records, fields).elements
}

/// Build the deduplicated node/edge list for a diagram.
///
/// Records are visited in order; elements appear in first-seen order. Edge ids
/// are `source-TYPE-target`, so two relationships of the same type between the
/// same pair of nodes collapse into one edge.
pub fn project_records_with_report<R: RecordView>(records: &[R], fields: &ProjectionFields) -> Projection {
    let mut out = Projection::default();
    let mut node_ids: HashSet<String> = HashSet::new();
    let mut edge_ids: HashSet<String> = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        if let Err(reason) = project_one(record, fields, &mut out.elements, &mut node_ids, &mut edge_ids) {
            let skip = MalformedRecord { index, reason };
            warn!("{}", skip);
            out.skipped.push(skip);
        }
    }
    out
}

fn project_one<R: RecordView>(
    record: &R,
    fields: &ProjectionFields,
    elements: &mut Vec<GraphElement>,
    node_ids: &mut HashSet<String>,
    edge_ids: &mut HashSet<String>,
) -> Result<(), SkipReason> {
    let start = present(record, &fields.start)?;
    let rel = present(record, &fields.relationship)?;
    let end = present(record, &fields.end)?;

    let source_id = identity(start).ok_or(SkipReason::InvalidStartId)?;
    let target_id = identity(end).ok_or(SkipReason::InvalidEndId)?;

    for (id, node) in [(source_id, start), (target_id, end)] {
        if node_ids.insert(id.to_string()) {
            elements.push(GraphElement::Node(NodeElement { id: id.to_string(), label: first_label(node) }));
        }
    }

    identity(rel).ok_or(SkipReason::InvalidRelationshipId)?;
    let rel_type = non_empty_str(rel.get("type")).unwrap_or(FALLBACK_EDGE_LABEL);
    let edge_id = format!("{}-{}-{}", source_id, rel_type, target_id);
    if !edge_ids.contains(&edge_id) {
        edge_ids.insert(edge_id.clone());
        elements.push(GraphElement::Edge(EdgeElement {
            id: edge_id,
            source: source_id.to_string(),
            target: target_id.to_string(),
            label: rel_type.to_string(),
        }));
    }
    Ok(())
}

// Null counts as absent
fn present<'a, R: RecordView>(record: &'a R, name: &str) -> Result<&'a Value, SkipReason> {
    match record.field(name) {
        Some(v) if !v.is_null() => Ok(v),
        _ => Err(SkipReason::MissingField(name.to_string())),
    }
}

fn identity(entity: &Value) -> Option<&str> {
    non_empty_str(entity.get("identity"))
}

fn first_label(node: &Value) -> String {
    node.get("labels")
        .and_then(Value::as_array)
        .and_then(|labels| non_empty_str(labels.first()))
        .unwrap_or(FALLBACK_NODE_LABEL)
        .to_string()
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.is_empty())
}
