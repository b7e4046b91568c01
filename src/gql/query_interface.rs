use std::sync::Arc;

use log::{debug, error};
use thiserror::Error;

use crate::db::session::SessionSource;
use super::normalize::{normalize_record, NormalizedRecord};

#[derive(Debug, Error)]
pub enum QueryError {
    // Missing/empty query or unparsable payload; the database is never contacted
    #[error("{0}")]
    InvalidRequest(String),
    // Carries the database's own message
    #[error("{0}")]
    QueryExecution(String),
}

impl QueryError {
    pub const QUERY_REQUIRED: &'static str = "Query is required";
    pub const INVALID_REQUEST: &'static str = "Invalid request";

    pub fn query_required() -> Self {
        QueryError::InvalidRequest(Self::QUERY_REQUIRED.to_string())
    }

    pub fn invalid_request() -> Self {
        QueryError::InvalidRequest(Self::INVALID_REQUEST.to_string())
    }
}

/// Runs one query per call against the injected session source.
///
/// Stateless apart from the shared source, so one instance serves all
/// concurrent requests; each call opens and closes its own session.
#[derive(Clone)]
pub struct QueryService {
    source: Arc<dyn SessionSource>,
}

impl QueryService {
    pub fn new(source: Arc<dyn SessionSource>) -> Self {
        Self { source }
    }

    /// Execute `query` unmodified and return the normalized rows in driver order.
    pub async fn submit(&self, query: Option<&str>) -> Result<Vec<NormalizedRecord>, QueryError> {
        let query = match query {
            Some(q) if !q.is_empty() => q,
            _ => return Err(QueryError::query_required()),
        };

        let mut session = self.source.open_session().await.map_err(|e| {
            error!("failed to open session: {}", e);
            QueryError::QueryExecution(e.to_string())
        })?;
        let result = session.run(query).await;
        // close before inspecting the result so failures release the session too
        session.close().await;

        let rows = result.map_err(|e| {
            error!("query failed: {}", e);
            QueryError::QueryExecution(e.to_string())
        })?;
        debug!("query returned {} rows", rows.len());
        Ok(rows.into_iter().map(normalize_record).collect())
    }
}
