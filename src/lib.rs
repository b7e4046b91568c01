pub mod db;
pub mod gql;
pub mod graph_utils;
pub mod persistence;

#[cfg(feature = "api")]
pub mod api;
