pub mod normalize;
pub mod query_interface;
