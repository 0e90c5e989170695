//! Server configuration.

use std::net::SocketAddr;

/// Server configuration for the request surface.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address and port to listen on.
    pub listen: SocketAddr,
}
