use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub upstream_base_url: String,
    pub upstream_access_key: String,
    pub upstream_request_timeout_secs: u64,
    pub upstream_user_agent: String,
    pub upstream_page_cap: usize,
    pub upstream_inter_page_delay_ms: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub snapshot_retention_days: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_access_key", &"[redacted]")
            .field(
                "upstream_request_timeout_secs",
                &self.upstream_request_timeout_secs,
            )
            .field("upstream_user_agent", &self.upstream_user_agent)
            .field("upstream_page_cap", &self.upstream_page_cap)
            .field(
                "upstream_inter_page_delay_ms",
                &self.upstream_inter_page_delay_ms,
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("snapshot_retention_days", &self.snapshot_retention_days)
            .finish()
    }
}
