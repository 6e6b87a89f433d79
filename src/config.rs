//! Server configuration from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_PORT: u16 = 5173;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// `HOST` and `PORT` override the defaults; malformed values fall back
    /// with a warning rather than aborting startup.
    pub fn from_env() -> Self {
        let host: IpAddr = match std::env::var("HOST") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid HOST '{}', binding to 0.0.0.0", raw);
                IpAddr::V4(Ipv4Addr::UNSPECIFIED)
            }),
            Err(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid PORT '{}', using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        Self {
            bind_addr: SocketAddr::new(host, port),
        }
    }
}
