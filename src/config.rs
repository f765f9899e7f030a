//! 应用配置
//! 从环境变量（及 `.env`）读取，CLI 参数可覆盖

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::utils;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini 接口配置
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64, // 默认 90
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout_secs: 90,
        }
    }
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub db_path: PathBuf,
    pub poll_interval: Duration, // 默认 5 秒
    pub user_id: String,
    pub gateway_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            db_path: utils::get_database_path(),
            poll_interval: Duration::from_secs(5),
            user_id: "local-user".to_string(),
            gateway_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
        }
    }
}

impl AppConfig {
    /// 加载 `.env` 后读取进程环境变量
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意键值来源构建配置，未设置的项使用默认值
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get("GEMINI_API_KEY") {
            config.gemini.api_key = key;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            config.gemini.base_url = url;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            config.gemini.model = model;
        }
        if let Some(secs) = get("GEMINI_TIMEOUT_SECS") {
            config.gemini.timeout_secs = parse_number("GEMINI_TIMEOUT_SECS", &secs)?;
        }
        if let Some(path) = get("STUDYFORGE_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(secs) = get("STUDYFORGE_POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs(parse_number("STUDYFORGE_POLL_INTERVAL_SECS", &secs)?);
        }
        if let Some(user) = get("STUDYFORGE_USER_ID") {
            config.user_id = user;
        }
        if let Some(addr) = get("STUDYFORGE_GATEWAY_ADDR") {
            config.gateway_addr = addr
                .parse()
                .map_err(|_| Error::Config(format!("STUDYFORGE_GATEWAY_ADDR is not a socket address: {}", addr)))?;
        }

        Ok(config)
    }

    /// 调用生成接口前检查密钥
    pub fn require_api_key(&self) -> Result<&str> {
        if self.gemini.api_key.is_empty() {
            return Err(Error::Config("GEMINI_API_KEY is not set".to_string()));
        }
        Ok(&self.gemini.api_key)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    let n: u64 = value
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a positive integer, got: {}", key, value)))?;
    if n == 0 {
        return Err(Error::Config(format!("{} must be greater than zero", key)));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.gemini.timeout_secs, 90);
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("GEMINI_BASE_URL", "http://localhost:9000"),
            ("STUDYFORGE_POLL_INTERVAL_SECS", "2"),
            ("STUDYFORGE_DB_PATH", "/tmp/sf.db"),
            ("STUDYFORGE_USER_ID", "u-1"),
            ("STUDYFORGE_GATEWAY_ADDR", "0.0.0.0:9999"),
        ]))
        .unwrap();

        assert_eq!(config.require_api_key().unwrap(), "abc");
        assert_eq!(config.gemini.base_url, "http://localhost:9000");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.db_path, PathBuf::from("/tmp/sf.db"));
        assert_eq!(config.user_id, "u-1");
        assert_eq!(config.gateway_addr.port(), 9999);
    }

    #[test]
    fn test_bad_numbers_are_config_errors() {
        let err = AppConfig::from_lookup(lookup_from(&[("GEMINI_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = AppConfig::from_lookup(lookup_from(&[("STUDYFORGE_POLL_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = AppConfig::from_lookup(lookup_from(&[("STUDYFORGE_GATEWAY_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
