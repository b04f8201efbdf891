use clap::Parser;

/// Bind address, batch size cap, and logging location for the server
/// binary. Everything here is ambient server configuration — the
/// session core itself takes no environment or CLI surface.
#[derive(Debug, Clone, Parser)]
#[command(name = "capnweb-server", about = "Cap'n Web RPC session server")]
pub struct ServerConfig {
    /// Address to bind the HTTP/WebSocket listener on.
    #[arg(long, env = "CAPNWEB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the HTTP/WebSocket listener on.
    #[arg(long, env = "CAPNWEB_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Maximum number of messages accepted in one HTTP-batch request.
    #[arg(long, env = "CAPNWEB_MAX_BATCH_SIZE", default_value_t = 100)]
    pub max_batch_size: usize,

    /// Directory rolling log files are written to.
    #[arg(long, env = "CAPNWEB_LOG_DIR", default_value = "logs")]
    pub log_dir: String,

    /// Idle-session sweep interval, in seconds.
    #[arg(long, env = "CAPNWEB_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// How long a WebSocket session may sit idle before the sweep evicts it.
    #[arg(long, env = "CAPNWEB_SESSION_TIMEOUT_SECS", default_value_t = 300)]
    pub session_timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_batch_size: 100,
            log_dir: "logs".to_string(),
            sweep_interval_secs: 60,
            session_timeout_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_joins_host_and_port() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9090,
            ..Default::default()
        };
        assert_eq!(config.bind_addr(), "0.0.0.0:9090");
    }
}
