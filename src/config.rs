use crate::error::{Result, WalletError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "https://spicy-rpc.chiliz.com";
pub const DEFAULT_CHAIN_ID: u64 = 88882;
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub openai_api_key: Option<String>,
    pub private_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub request_timeout_secs: u64,
    pub listen_addr: String,
    pub seed_file: Option<PathBuf>,
    pub settings_file: Option<PathBuf>,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| WalletError::ConfigError(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let rpc_url = env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        rpc_url
            .parse::<url::Url>()
            .map_err(|e| WalletError::ConfigError(format!("Invalid RPC_URL: {}", e)))?;

        let llm_base_url =
            env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string());
        llm_base_url
            .parse::<url::Url>()
            .map_err(|e| WalletError::ConfigError(format!("Invalid LLM_BASE_URL: {}", e)))?;

        Ok(Config {
            rpc_url,
            chain_id: parse_var("CHAIN_ID", DEFAULT_CHAIN_ID)?,
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            private_key: non_empty_var("PRIVATE_KEY"),
            llm_base_url,
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string()),
            seed_file: non_empty_var("WALLET_SEED_FILE").map(PathBuf::from),
            settings_file: non_empty_var("SETTINGS_FILE").map(PathBuf::from),
        })
    }

    pub fn from_url(rpc_url: String) -> Self {
        Config {
            rpc_url,
            chain_id: DEFAULT_CHAIN_ID,
            openai_api_key: None,
            private_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            seed_file: None,
            settings_file: None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_url(DEFAULT_RPC_URL.to_string())
    }
}
