//! 거래소 에러 타입.

use thiserror::Error;

/// 거래소 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 연결되지 않은 상태에서 조회 시도
    #[error("Not connected")]
    NotConnected,

    /// 거래소가 에러를 반환함 (error 배열 또는 비정상 HTTP 상태)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// 잘못된 호출 인자
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 인증/권한 에러
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    ///
    /// 폴링 루프는 재시도 가능 여부와 무관하게 다음 주기에 같은 endpoint로
    /// 다시 시도하지만, 호출자는 이 분류로 failover 재연결 여부를 판단할 수 있습니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Network(_) | ExchangeError::Timeout(_) | ExchangeError::Upstream(_)
        )
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_connect() {
            ExchangeError::Network(err.to_string())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}
