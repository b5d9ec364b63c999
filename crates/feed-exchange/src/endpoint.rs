//! Endpoint failover 정책.
//!
//! failover를 하드코딩된 분기가 아닌 데이터로 표현합니다:
//! 정렬된 `(endpoint, max_attempts)` 목록을 순서대로 시도하고,
//! 모두 소진하면 연결 실패로 처리합니다. 두 개 이상의 endpoint를 가진
//! 정책을 주입하면 단위 테스트에서 그대로 검증할 수 있습니다.

use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, ExchangeResult};

/// 시도 순서상의 한 endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointEntry {
    /// REST API 기본 URL
    pub url: String,
    /// 실패 에피소드당 최대 probe 횟수
    pub max_attempts: u32,
}

impl EndpointEntry {
    /// 단일 시도 endpoint를 생성합니다.
    pub fn once(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_attempts: 1,
        }
    }
}

/// 정렬된 endpoint 시도 정책.
///
/// 첫 번째 항목이 primary이며, `Connected` 상태는 primary에
/// 연결되었을 때만 보고됩니다. 나머지 항목으로 연결되면
/// `ConnectedFallback`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPolicy {
    entries: Vec<EndpointEntry>,
}

impl EndpointPolicy {
    /// 임의 항목 목록으로 정책을 생성합니다.
    ///
    /// # Errors
    /// 빈 목록이거나 `max_attempts`가 0인 항목이 있으면
    /// `ExchangeError::InvalidArgument`를 반환합니다. 정책은 설정
    /// 데이터로 주입되므로 잘못된 값은 생성 시점에 거부합니다.
    pub fn new(entries: Vec<EndpointEntry>) -> ExchangeResult<Self> {
        if entries.is_empty() {
            return Err(ExchangeError::InvalidArgument(
                "endpoint policy requires at least one entry".to_string(),
            ));
        }
        if let Some(entry) = entries.iter().find(|e| e.max_attempts == 0) {
            return Err(ExchangeError::InvalidArgument(format!(
                "endpoint {} has zero max_attempts",
                entry.url
            )));
        }
        Ok(Self { entries })
    }

    /// 고전적인 primary/fallback 2단계 정책 (각 1회 시도).
    pub fn primary_fallback(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            entries: vec![
                EndpointEntry::once(primary),
                EndpointEntry::once(fallback),
            ],
        }
    }

    /// primary endpoint URL을 반환합니다.
    pub fn primary(&self) -> &str {
        &self.entries[0].url
    }

    /// primary endpoint URL을 교체합니다.
    ///
    /// `reset()` 시 외부 설정(저장소의 기본 endpoint)을 반영하는 데 사용됩니다.
    pub fn set_primary(&mut self, url: impl Into<String>) {
        self.entries[0].url = url.into();
    }

    /// 시도 순서대로 항목을 순회합니다.
    pub fn entries(&self) -> impl Iterator<Item = &EndpointEntry> {
        self.entries.iter()
    }

    /// 주어진 URL이 primary인지 확인합니다.
    pub fn is_primary(&self, url: &str) -> bool {
        self.primary() == url
    }
}
