//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 거래소 설정
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// 폴링 설정
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            exchange: ExchangeConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 거래소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// primary REST API 기본 URL
    pub primary_url: String,
    /// fallback REST API 기본 URL
    pub fallback_url: String,
    /// 거래 쌍 필터링에 사용할 호가 통화
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,
    /// 요청/연결 probe 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 호가창 조회 기본 깊이
    #[serde(default = "default_depth")]
    pub default_depth: u32,
}

fn default_quote_currency() -> String {
    "USD".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_depth() -> u32 {
    10
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            // 운영 환경에서는 fallback을 별도 미러로 오버라이드
            primary_url: "https://api.kraken.com".to_string(),
            fallback_url: "https://api.kraken.com".to_string(),
            quote_currency: default_quote_currency(),
            timeout_secs: default_timeout_secs(),
            default_depth: default_depth(),
        }
    }
}

/// 폴링 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    /// 폴링 간격 (초)
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// 폴링할 거래 쌍 식별자 목록
    #[serde(default)]
    pub pairs: Vec<String>,
}

fn default_poll_interval() -> u64 {
    30
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            pairs: Vec::new(),
        }
    }
}

/// Kraken API 자격증명.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
/// - 설정 파일이 아닌 환경 변수에서만 로드합니다.
#[derive(Clone)]
pub struct KrakenCredentials {
    /// API 키
    pub api_key: String,
    /// API 시크릿 (base64 인코딩)
    pub api_secret: SecretString,
}

impl fmt::Debug for KrakenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("KrakenCredentials")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .finish()
    }
}

impl KrakenCredentials {
    /// 새 자격증명 생성.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::from(api_secret.into()),
        }
    }

    /// 환경 변수에서 생성.
    ///
    /// `KRAKEN_API_KEY`/`KRAKEN_API_SECRET`이 설정되지 않았으면 `None`을 반환합니다.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("KRAKEN_API_KEY").ok()?;
        let api_secret = std::env::var("KRAKEN_API_SECRET").ok()?;
        Some(Self::new(api_key, api_secret))
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("exchange.primary_url", "https://api.kraken.com")?
            .set_default("exchange.fallback_url", "https://api.kraken.com")?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("FEED")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.exchange.quote_currency, "USD");
        assert_eq!(config.exchange.timeout_secs, 10);
        assert_eq!(config.exchange.default_depth, 10);
        assert_eq!(config.poll.interval_secs, 30);
    }

    #[test]
    fn test_credentials_debug_masked() {
        let creds = KrakenCredentials::new("vmPUZE6mv9SD5VNHk4Hl", "c2VjcmV0");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("c2VjcmV0"));
        assert!(debug.contains("vmPU"));
        assert!(debug.contains("***REDACTED***"));
    }

    #[test]
    fn test_credentials_debug_short_key_fully_masked() {
        let creds = KrakenCredentials::new("short", "c2VjcmV0");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("short"));
    }
}
