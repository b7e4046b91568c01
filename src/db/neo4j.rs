//! Neo4j adapter: connection handle, per-query sessions and Bolt value conversion.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use neo4rs::{query, BoltMap, BoltType, Graph, Row};
use tokio::sync::OnceCell;

use super::session::{DbError, GraphSession, SessionSource};
use super::value::{DbValue, NodeValue, RawRecord, RelationshipValue};

/// Connection target and credentials, read from the process environment.
///
/// | Variable         | Default                 |
/// |------------------|-------------------------|
/// | `NEO4J_URI`      | `bolt://localhost:7687` |
/// | `NEO4J_USER`     | `neo4j`                 |
/// | `NEO4J_PASSWORD` | `password`              |
///
/// The fallbacks are only suitable for local development.
#[derive(Clone)]
pub struct DbSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl DbSettings {
    pub const DEFAULT_URI: &'static str = "bolt://localhost:7687";
    pub const DEFAULT_USER: &'static str = "neo4j";
    pub const DEFAULT_PASSWORD: &'static str = "password";

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`; unset or empty values take the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| match lookup(key) {
            Some(v) if !v.is_empty() => v,
            _ => default.to_string(),
        };
        Self {
            uri: get("NEO4J_URI", Self::DEFAULT_URI),
            user: get("NEO4J_USER", Self::DEFAULT_USER),
            password: get("NEO4J_PASSWORD", Self::DEFAULT_PASSWORD),
        }
    }
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            uri: Self::DEFAULT_URI.to_string(),
            user: Self::DEFAULT_USER.to_string(),
            password: Self::DEFAULT_PASSWORD.to_string(),
        }
    }
}

// Keep the password out of logs
impl fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSettings")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Process-lifetime handle to the database. The driver object is created on
/// first use; concurrent cold-start callers all wait on the same initialization.
pub struct Neo4jConnection {
    settings: DbSettings,
    graph: OnceCell<Arc<Graph>>,
}

impl Neo4jConnection {
    pub fn new(settings: DbSettings) -> Self {
        Self { settings, graph: OnceCell::new() }
    }

    pub fn settings(&self) -> &DbSettings {
        &self.settings
    }

    async fn graph(&self) -> Result<Arc<Graph>, DbError> {
        let graph = self
            .graph
            .get_or_try_init(|| async {
                info!("connecting to {} as {}", self.settings.uri, self.settings.user);
                Graph::new(
                    self.settings.uri.clone(),
                    self.settings.user.clone(),
                    self.settings.password.clone(),
                )
                .await
                .map(Arc::new)
                .map_err(|e| DbError::connect(e.to_string()))
            })
            .await?;
        Ok(Arc::clone(graph))
    }
}

#[async_trait]
impl SessionSource for Neo4jConnection {
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, DbError> {
        let graph = self.graph().await?;
        Ok(Box::new(Neo4jSession { graph }))
    }
}

/// One query's worth of access to the driver. The pooled Bolt connection used
/// by `run` goes back to the pool when the row stream is dropped.
pub struct Neo4jSession {
    graph: Arc<Graph>,
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn run(&mut self, text: &str) -> Result<Vec<RawRecord>, DbError> {
        let mut stream = self
            .graph
            .execute(query(text))
            .await
            .map_err(|e| DbError::execute(e.to_string()))?;
        let mut records = Vec::new();
        while let Some(row) = stream.next().await.map_err(|e| DbError::execute(e.to_string()))? {
            records.push(record_from_row(&row)?);
        }
        Ok(records)
    }

    async fn close(self: Box<Self>) {
        debug!("session closed");
    }
}

/// Convert one driver row into a record.
///
/// The driver keeps a row's columns in a hash map and does not expose the
/// `RETURN` order, so columns come out sorted by name.
pub fn record_from_row(row: &Row) -> Result<RawRecord, DbError> {
    let columns: BoltMap = row.to_strict().map_err(|e| DbError::execute(e.to_string()))?;
    Ok(sorted_entries(columns).into_iter().collect())
}

/// Map a Bolt value onto the closed value model.
///
/// Bolt maps carry no key order, so entries are sorted by key to keep
/// downstream output deterministic. Temporal, spatial and byte values have no
/// structural counterpart and are carried as their textual rendering.
pub fn from_bolt(value: BoltType) -> DbValue {
    match value {
        BoltType::Null(_) => DbValue::Null,
        BoltType::Boolean(b) => DbValue::Bool(b.value),
        BoltType::Integer(i) => DbValue::Int(i.value),
        BoltType::Float(f) => DbValue::float(f.value),
        BoltType::String(s) => DbValue::Text(s.value),
        BoltType::List(l) => DbValue::List(l.value.into_iter().map(from_bolt).collect()),
        BoltType::Map(m) => DbValue::Map(sorted_entries(m)),
        BoltType::Node(n) => DbValue::Node(NodeValue {
            identity: n.id.value,
            labels: n
                .labels
                .value
                .into_iter()
                .filter_map(|l| match l {
                    BoltType::String(s) => Some(s.value),
                    _ => None,
                })
                .collect(),
            properties: sorted_entries(n.properties),
        }),
        BoltType::Relation(r) => DbValue::Relationship(RelationshipValue {
            identity: r.id.value,
            start: r.start_node_id.value,
            end: r.end_node_id.value,
            rel_type: r.typ.value,
            properties: sorted_entries(r.properties),
        }),
        BoltType::UnboundedRelation(r) => DbValue::map([
            ("identity", DbValue::Int(r.id.value)),
            ("type", DbValue::Text(r.typ.value)),
            ("properties", DbValue::Map(sorted_entries(r.properties))),
        ]),
        BoltType::Path(p) => DbValue::map([
            ("nodes", DbValue::List(p.nodes.value.into_iter().map(from_bolt).collect())),
            ("relationships", DbValue::List(p.rels.value.into_iter().map(from_bolt).collect())),
        ]),
        other => DbValue::Text(format!("{:?}", other)),
    }
}

fn sorted_entries(map: BoltMap) -> Vec<(String, DbValue)> {
    let mut entries: Vec<(String, DbValue)> = map
        .value
        .into_iter()
        .map(|(k, v)| (k.value, from_bolt(v)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}
