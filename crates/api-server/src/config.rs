//! Server configuration read from the environment (`.env` is loaded first).

use analysis_core::IndustryBenchmark;
use analysis_orchestrator::DEFAULT_CACHE_TTL_SECS;
use anyhow::Context;
use polygon_client::DEFAULT_RATE_LIMIT;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub polygon_api_key: String,
    pub polygon_rate_limit: usize,
    pub snapshot_cache_ttl_secs: i64,
    pub benchmark: IndustryBenchmark,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let polygon_api_key = lookup("POLYGON_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .context("POLYGON_API_KEY must be set")?;

        let defaults = IndustryBenchmark::default();
        let benchmark = IndustryBenchmark {
            pe_benchmark: parse_or(&lookup, "INDUSTRY_PE_BENCHMARK", defaults.pe_benchmark),
            pb_benchmark: parse_or(&lookup, "INDUSTRY_PB_BENCHMARK", defaults.pb_benchmark),
            de_benchmark: parse_or(&lookup, "INDUSTRY_DE_BENCHMARK", defaults.de_benchmark),
            fcf_qualitative_benchmark: lookup("INDUSTRY_FCF_BENCHMARK")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.fcf_qualitative_benchmark),
        };

        Ok(Self {
            host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "API_PORT", 3000),
            polygon_api_key,
            polygon_rate_limit: parse_or(&lookup, "POLYGON_RATE_LIMIT", DEFAULT_RATE_LIMIT),
            snapshot_cache_ttl_secs: parse_or(&lookup, "SNAPSHOT_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
            benchmark,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
                default
            }
        },
    }
}
