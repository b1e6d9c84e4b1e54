//! Convenience constructors for the filtering server.

use crate::{config::ServerConfig, server::FilterServer};

/// Creates a server with the default configuration.
pub fn create_server() -> FilterServer {
    FilterServer::new(ServerConfig::default())
}

/// Creates a server with a custom configuration.
pub fn create_server_with_config(config: ServerConfig) -> FilterServer {
    FilterServer::new(config)
}
