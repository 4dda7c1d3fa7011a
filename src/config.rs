use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL. When unset the in-memory store is used.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL. When unset responses are not cached.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound applied to every `limit` query parameter
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Limit used when the caller does not pass one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// TTL in seconds for cached trending and similar-content responses
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Load the sample catalog at startup when the store has no content
    #[serde(default = "default_seed_sample_data")]
    pub seed_sample_data: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_limit() -> usize {
    50
}

fn default_limit() -> usize {
    20
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_seed_sample_data() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            host: default_host(),
            port: default_port(),
            max_limit: default_max_limit(),
            default_limit: default_limit(),
            cache_ttl_secs: default_cache_ttl_secs(),
            seed_sample_data: default_seed_sample_data(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Clamps a caller-supplied limit into `1..=max_limit`
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}
