//! 연결 관리자.
//!
//! 어떤 endpoint가 활성인지 결정하고 probe 성공/실패에 따라
//! 연결 상태를 전이시킵니다. 상태는 연결 관리자 인스턴스가 단독
//! 소유하며 접근자 메서드로만 노출됩니다.
//!
//! Failover 의미론:
//! - probe 실패(전송 에러, 비정상 HTTP 상태, 거래소 error 배열)는 모두
//!   동일하게 취급되어 정책상 다음 endpoint 시도로 이어집니다.
//! - 모든 endpoint가 소진되어야 `Failed`가 되며, `last_error`에 각
//!   endpoint의 실패 원인이 합쳐져 기록됩니다.
//! - `connect()` 중의 probe 실패는 예외가 아닌 상태 전이로 흡수됩니다.
//!   호출자는 반환된 snapshot의 상태를 검사해야 합니다.
//! - fallback으로 연결된 뒤 primary로 자동 복귀하지 않습니다.
//!   `reset()` 후 `connect()`가 명시적인 복귀 경로입니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use feed_core::store::{KEY_DEFAULT_ENDPOINT, KEY_LAST_CONNECTED_AT, KEY_LAST_ENDPOINT};
use feed_core::{ConnectionStatus, KvStore};

use crate::endpoint::EndpointPolicy;
use crate::error::{ExchangeError, ExchangeResult};
use crate::wire::KrakenResponse;

/// 연결 상태의 읽기 전용 스냅샷.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    /// 현재 상태
    pub status: ConnectionStatus,
    /// 활성 endpoint (연결된 상태에서만 `Some`)
    pub active_endpoint: Option<String>,
    /// 마지막 실패 원인
    pub last_error: Option<String>,
}

/// 내부 가변 상태. Mutex로 보호되어 동시 `connect()` 호출이
/// 일관된 상태 머신을 관찰하도록 합니다 (실패 에피소드당
/// fallback 시도는 최대 entry별 `max_attempts`회).
struct ConnectionState {
    status: ConnectionStatus,
    active_endpoint: Option<String>,
    last_error: Option<String>,
    policy: EndpointPolicy,
}

/// 거래소 연결 관리자.
pub struct ConnectionManager {
    http: reqwest::Client,
    store: Arc<dyn KvStore>,
    state: Mutex<ConnectionState>,
}

impl ConnectionManager {
    /// 새 연결 관리자를 생성합니다. 초기 상태는 `Disconnected`입니다.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::Network`를 반환합니다.
    pub fn new(
        policy: EndpointPolicy,
        store: Arc<dyn KvStore>,
        timeout: Duration,
    ) -> ExchangeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            store,
            state: Mutex::new(ConnectionState {
                status: ConnectionStatus::Disconnected,
                active_endpoint: None,
                last_error: None,
                policy,
            }),
        })
    }

    /// 공유 HTTP 클라이언트를 반환합니다.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// 정책 순서대로 endpoint에 연결을 시도합니다.
    ///
    /// 이미 연결된 상태면 probe 없이 현재 스냅샷을 반환합니다 (멱등).
    /// 모든 endpoint가 실패하면 상태는 `Failed`가 되고 `last_error`에
    /// 모든 실패 원인이 기록됩니다.
    pub async fn connect(&self) -> ConnectionSnapshot {
        let mut state = self.state.lock().await;

        if state.status.is_connected() {
            debug!(status = %state.status, "Already connected, skipping probe");
            return Self::snapshot_of(&state);
        }

        state.status = ConnectionStatus::Connecting;
        state.active_endpoint = None;

        let policy = state.policy.clone();
        let mut failures: Vec<String> = Vec::new();

        for (index, entry) in policy.entries().enumerate() {
            for attempt in 1..=entry.max_attempts {
                debug!(url = %entry.url, attempt, "Probing endpoint");
                match self.probe(&entry.url).await {
                    Ok(()) => {
                        state.status = if index == 0 {
                            ConnectionStatus::Connected
                        } else {
                            ConnectionStatus::ConnectedFallback
                        };
                        state.active_endpoint = Some(entry.url.clone());
                        state.last_error = None;

                        info!(
                            url = %entry.url,
                            status = %state.status,
                            "Connected to exchange"
                        );

                        self.record_connection(&entry.url).await;
                        return Self::snapshot_of(&state);
                    }
                    Err(e) => {
                        warn!(url = %entry.url, attempt, error = %e, "Endpoint probe failed");
                        failures.push(format!("{}: {}", entry.url, e));
                    }
                }
            }
        }

        state.status = ConnectionStatus::Failed;
        state.active_endpoint = None;
        state.last_error = Some(failures.join("; "));
        warn!(error = %state.last_error.as_deref().unwrap_or(""), "All endpoints failed");

        Self::snapshot_of(&state)
    }

    /// 상태를 `Disconnected`로 되돌리고 `last_error`를 지웁니다.
    ///
    /// 저장소에 외부 기본 endpoint(`default_endpoint`)가 설정되어 있으면
    /// 다음 `connect()` 전에 primary로 반영합니다.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.status = ConnectionStatus::Disconnected;
        state.active_endpoint = None;
        state.last_error = None;

        match self.store.get(KEY_DEFAULT_ENDPOINT).await {
            Ok(Some(url)) => {
                info!(url = %url, "Applying externally configured default endpoint");
                state.policy.set_primary(url);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read default endpoint from store"),
        }

        info!("Connection state reset");
    }

    /// 연결을 해제합니다. 설정된 endpoint는 유지됩니다.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        state.status = ConnectionStatus::Disconnected;
        state.active_endpoint = None;
        info!("Disconnected from exchange");
    }

    /// 활성 endpoint를 반환합니다. 연결되지 않은 상태면 `None`.
    pub async fn current_endpoint(&self) -> Option<String> {
        let state = self.state.lock().await;
        if state.status.is_connected() {
            state.active_endpoint.clone()
        } else {
            None
        }
    }

    /// 현재 연결 상태를 반환합니다.
    pub async fn status(&self) -> ConnectionStatus {
        self.state.lock().await.status
    }

    /// 마지막 실패 원인을 반환합니다.
    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    /// 현재 상태의 스냅샷을 반환합니다.
    pub async fn snapshot(&self) -> ConnectionSnapshot {
        let state = self.state.lock().await;
        Self::snapshot_of(&state)
    }

    fn snapshot_of(state: &ConnectionState) -> ConnectionSnapshot {
        ConnectionSnapshot {
            status: state.status,
            active_endpoint: state.active_endpoint.clone(),
            last_error: state.last_error.clone(),
        }
    }

    /// 연결 probe: `GET {url}/0/public/Time`.
    ///
    /// 전송 에러, 비정상 HTTP 상태, 비어 있지 않은 error 배열은
    /// 모두 probe 실패입니다.
    async fn probe(&self, base_url: &str) -> ExchangeResult<()> {
        let url = format!("{}/0/public/Time", base_url.trim_end_matches('/'));

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ExchangeError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        let parsed: KrakenResponse<serde_json::Value> = serde_json::from_str(&body)?;
        parsed.into_result().map(|_| ())
    }

    /// 마지막 성공 endpoint와 시각을 표시용 저장소에 기록합니다.
    ///
    /// 저장소는 정합성에 관여하지 않으므로 기록 실패는 경고만 남깁니다.
    async fn record_connection(&self, url: &str) {
        if let Err(e) = self.store.set(KEY_LAST_ENDPOINT, url).await {
            warn!(error = %e, "Failed to record last endpoint");
        }
        let now = Utc::now().to_rfc3339();
        if let Err(e) = self.store.set(KEY_LAST_CONNECTED_AT, &now).await {
            warn!(error = %e, "Failed to record connection timestamp");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::MemoryStore;

    fn manager() -> ConnectionManager {
        let policy =
            EndpointPolicy::primary_fallback("https://a.invalid", "https://b.invalid");
        ConnectionManager::new(policy, Arc::new(MemoryStore::new()), Duration::from_secs(1))
            .expect("manager construction")
    }

    #[tokio::test]
    async fn test_initial_state() {
        let mgr = manager();
        let snap = mgr.snapshot().await;
        assert_eq!(snap.status, ConnectionStatus::Disconnected);
        assert_eq!(snap.active_endpoint, None);
        assert_eq!(snap.last_error, None);
        assert_eq!(mgr.current_endpoint().await, None);
    }

    #[tokio::test]
    async fn test_reset_applies_stored_default_endpoint() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(KEY_DEFAULT_ENDPOINT, "https://c.invalid")
            .await
            .unwrap();

        let policy = EndpointPolicy::primary_fallback("https://a.invalid", "https://b.invalid");
        let mgr = ConnectionManager::new(policy, store, Duration::from_secs(1)).unwrap();

        mgr.reset().await;

        let state = mgr.state.lock().await;
        assert_eq!(state.policy.primary(), "https://c.invalid");
    }
}
