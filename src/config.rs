use clap::Parser;
use tracing::Level;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compiled defaults, overridable from the command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatterbox", version = VERSION, about = "Multi-user TCP chat server")]
pub struct ServerConfig {
    /// Interface to listen on
    #[arg(short = 'b', long = "bind", default_value = "127.0.0.1")]
    pub addr: String,

    /// Port to accept TCP connections on
    #[arg(short = 'p', long = "port", default_value_t = 8000)]
    pub port: u16,

    /// Maximum bytes read per command line
    #[arg(long = "buffer-size", default_value_t = 5120)]
    pub buffer_size: usize,

    /// Number of recent public messages replayed on entering general chat
    #[arg(long = "history-depth", default_value_t = 20)]
    pub short_history_depth: usize,

    /// Maximum `/send` messages a user may post per wall-clock hour
    #[arg(long = "rate-cap", default_value_t = 20)]
    pub rate_cap: u32,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: "127.0.0.1".to_string(),
            port: 8000,
            buffer_size: 5120,
            short_history_depth: 20,
            rate_cap: 20,
            verbosity: 0,
        }
    }
}

impl ServerConfig {
    pub fn from_args() -> Self {
        ServerConfig::parse()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    pub fn verbosity_level(&self) -> Level {
        match self.verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
