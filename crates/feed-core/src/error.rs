//! 피드 시스템의 에러 타입.

use thiserror::Error;

/// 핵심 피드 에러.
#[derive(Debug, Error)]
pub enum FeedError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),
}

/// 피드 작업을 위한 Result 타입.
pub type FeedResult<T> = Result<T, FeedError>;

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for FeedError {
    fn from(err: config::ConfigError) -> Self {
        FeedError::Config(err.to_string())
    }
}
