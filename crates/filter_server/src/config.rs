//! Server configuration types and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration structure for the filtering server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// File backing the rectangle log
    pub data_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            data_file: PathBuf::from("data.csv"),
        }
    }
}
