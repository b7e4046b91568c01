pub mod html;
pub mod server;

pub use server::{routes, run_server, ApiConfig};
