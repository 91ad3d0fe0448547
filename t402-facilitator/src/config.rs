//! Service configuration from flags and environment.

use std::net::IpAddr;

use clap::Parser;

/// Facilitator service options.
#[derive(Debug, Clone, Parser)]
#[command(name = "t402-facilitator", about = "x402 facilitator HTTP service")]
pub struct ServiceConfig {
    /// Bind address.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Bind port.
    #[arg(long, env = "PORT", default_value_t = 4021)]
    pub port: u16,
}

impl ServiceConfig {
    /// Loads configuration, reading a `.env` file when present.
    #[must_use]
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }
}
