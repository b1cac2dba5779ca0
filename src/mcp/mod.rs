pub mod params;
pub mod server;

pub use params::*;
pub use server::McpServer;
