use clap::{Parser, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use cps_core::services::ServiceConfig;

const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text-v1.5";
const DEFAULT_TOP_K: usize = 6;
const DEFAULT_MAX_ROWS: usize = 500;
const DEFAULT_MAX_CONTEXT_CHARS: usize = 8000;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4020";

#[derive(Parser, Debug)]
#[command(name = "cps-mcpd", version, about = "CPS data MCP daemon.")]
struct CliArgs {
    /// Path to the CPS SQLite database file.
    #[arg(long, env = "CPS_SQLITE_PATH")]
    sqlite_path: PathBuf,

    /// Path to the school-website vector index file.
    #[arg(long, env = "CPS_INDEX_PATH")]
    index_path: PathBuf,

    /// Embedding model code; must match the model the index was built with.
    #[arg(long, env = "CPS_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Passages retrieved per question; must match the index deployment.
    #[arg(long, env = "CPS_TOP_K", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Result-set row ceiling for SQL queries.
    #[arg(long, env = "CPS_MAX_ROWS", default_value_t = DEFAULT_MAX_ROWS)]
    max_rows: usize,

    /// Maximum assembled context length in characters.
    #[arg(
        long,
        env = "CPS_MAX_CONTEXT_CHARS",
        default_value_t = DEFAULT_MAX_CONTEXT_CHARS
    )]
    max_context_chars: usize,

    #[arg(
        long,
        env = "CPS_QUERY_TIMEOUT_SECS",
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS
    )]
    query_timeout_secs: u64,

    #[arg(
        long,
        env = "CPS_SEARCH_TIMEOUT_SECS",
        default_value_t = DEFAULT_SEARCH_TIMEOUT_SECS
    )]
    search_timeout_secs: u64,

    /// Serve streamable HTTP instead of stdio.
    #[arg(
        long = "http",
        env = "CPS_SERVE_HTTP",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    serve_http: bool,

    #[arg(long, env = "CPS_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone)]
pub struct CpsConfig {
    pub sqlite_path: PathBuf,
    pub index_path: PathBuf,
    pub embedding_model: String,
    pub top_k: usize,
    pub max_rows: usize,
    pub max_context_chars: usize,
    pub query_timeout: Duration,
    pub search_timeout: Duration,
    pub serve_http: bool,
    pub mcp_http_addr: SocketAddr,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl CpsConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }

    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            sqlite_path: self.sqlite_path.clone(),
            index_path: self.index_path.clone(),
            embedding_model: self.embedding_model.clone(),
            top_k: self.top_k,
            max_rows: self.max_rows,
            max_context_chars: self.max_context_chars,
            query_timeout: self.query_timeout,
            search_timeout: self.search_timeout,
        }
    }
}

impl TryFrom<CliArgs> for CpsConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.top_k == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CPS_TOP_K",
                value: args.top_k.to_string(),
            });
        }
        if args.max_rows == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CPS_MAX_ROWS",
                value: args.max_rows.to_string(),
            });
        }
        if args.max_context_chars == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CPS_MAX_CONTEXT_CHARS",
                value: args.max_context_chars.to_string(),
            });
        }
        if args.query_timeout_secs == 0 || args.search_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CPS_QUERY_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        if args.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "CPS_EMBEDDING_MODEL",
                value: args.embedding_model,
            });
        }

        Ok(Self {
            sqlite_path: args.sqlite_path,
            index_path: args.index_path,
            embedding_model: args.embedding_model,
            top_k: args.top_k,
            max_rows: args.max_rows,
            max_context_chars: args.max_context_chars,
            query_timeout: Duration::from_secs(args.query_timeout_secs),
            search_timeout: Duration::from_secs(args.search_timeout_secs),
            serve_http: args.serve_http,
            mcp_http_addr: args.mcp_http_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            sqlite_path: PathBuf::from("/data/cps.db"),
            index_path: PathBuf::from("/data/websites.db"),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            max_rows: DEFAULT_MAX_ROWS,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            search_timeout_secs: DEFAULT_SEARCH_TIMEOUT_SECS,
            serve_http: false,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
        }
    }

    #[test]
    fn defaults_parse_into_config() {
        let config = CpsConfig::try_from(base_args()).expect("config should parse");
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert!(!config.serve_http);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut args = base_args();
        args.top_k = 0;
        assert!(CpsConfig::try_from(args).is_err());
    }

    #[test]
    fn blank_embedding_model_is_rejected() {
        let mut args = base_args();
        args.embedding_model = "   ".to_string();
        assert!(CpsConfig::try_from(args).is_err());
    }

    #[test]
    fn service_config_mirrors_cli_settings() {
        let config = CpsConfig::try_from(base_args()).expect("config should parse");
        let service = config.service_config();
        assert_eq!(service.sqlite_path, PathBuf::from("/data/cps.db"));
        assert_eq!(service.max_rows, DEFAULT_MAX_ROWS);
        assert_eq!(service.max_context_chars, DEFAULT_MAX_CONTEXT_CHARS);
    }
}
