//! Configuration for the coordinator and the connection manager

/// Configuration for the server-side coordinator
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the TCP listener binds to
    pub bind_addr: String,

    /// WebSocket upgrade path; requests for any other path are rejected so
    /// the lobby can share a port with unrelated upgrade handlers
    pub ws_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            ws_path: "/ws/game".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Set the WebSocket upgrade path
    pub fn with_ws_path(mut self, path: impl Into<String>) -> Self {
        self.ws_path = path.into();
        self
    }
}

/// Configuration for the client-side connection manager
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Coordinator URL, including the upgrade path (e.g. `ws://host:port/ws/game`)
    pub url: String,

    /// Delay before each automatic reconnect attempt (in milliseconds)
    pub reconnect_delay_ms: u64,

    /// How long a join request may go unanswered before the synthetic
    /// `join-timeout` event fires (in milliseconds)
    pub join_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws/game".to_string(),
            reconnect_delay_ms: 3000,
            join_timeout_ms: 5000,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coordinator URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the reconnect delay in milliseconds
    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Set the join timeout in milliseconds
    pub fn with_join_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.join_timeout_ms = timeout_ms;
        self
    }
}
