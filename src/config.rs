use std::net::SocketAddr;
use std::time::Duration;

/// How long a stopped job gets to exit after SIGTERM before the
/// manager escalates to SIGKILL. This is a policy constant, not a
/// per-request parameter.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Default port the HTTP API listens on.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API listens on.
    pub listen_addr: SocketAddr,
    /// Grace period between SIGTERM and SIGKILL when stopping a job.
    pub grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: format!("0.0.0.0:{DEFAULT_PORT}")
                .parse()
                .expect("default listen address is valid"),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }
}
