pub mod neo4j;
pub mod session;
pub mod value;

pub use session::{DbError, GraphSession, SessionSource};
pub use value::{DbValue, NodeValue, RawRecord, RelationshipValue};
