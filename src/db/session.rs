use async_trait::async_trait;
use thiserror::Error;

use super::value::RawRecord;

/// Failures coming back from the database layer. The message is the driver's
/// own text and is surfaced verbatim to API callers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Connect(String),
    #[error("{0}")]
    Execute(String),
}

impl DbError {
    pub fn connect<T: Into<String>>(msg: T) -> Self {
        DbError::Connect(msg.into())
    }

    pub fn execute<T: Into<String>>(msg: T) -> Self {
        DbError::Execute(msg.into())
    }
}

/// Hands out one session per query execution.
///
/// Implementations own whatever long-lived connection object the driver needs;
/// sessions borrow nothing from the source and may outlive the call that made them.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, DbError>;
}

/// A scoped database session. Callers run at most one query and then close it.
/// Dropping a session without `close` (e.g. while unwinding) must still release it.
#[async_trait]
pub trait GraphSession: Send {
    /// Execute `query` exactly as given and collect every row.
    async fn run(&mut self, query: &str) -> Result<Vec<RawRecord>, DbError>;

    /// Release the session. Must be called on every exit path.
    async fn close(self: Box<Self>);
}
