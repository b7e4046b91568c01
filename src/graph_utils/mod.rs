pub mod graph;
pub mod table;
