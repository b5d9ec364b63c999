//! CLI 명령어 구현 모듈.

pub mod balance;
pub mod book;
pub mod pairs;
pub mod status;
pub mod ticker;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::info;

use feed_core::{AppConfig, KrakenCredentials, MemoryStore};
use feed_exchange::{ConnectionManager, ConnectionSnapshot, EndpointPolicy, MarketClient};

/// 명령어 공용 컨텍스트.
pub struct FeedContext {
    pub manager: Arc<ConnectionManager>,
    pub client: Arc<MarketClient>,
    pub snapshot: ConnectionSnapshot,
}

/// 설정으로 연결 관리자와 클라이언트를 만들고 연결합니다.
///
/// 모든 endpoint 연결에 실패하면 실패 원인과 함께 종료합니다.
pub async fn connect(config: &AppConfig) -> Result<FeedContext> {
    let policy = EndpointPolicy::primary_fallback(
        config.exchange.primary_url.clone(),
        config.exchange.fallback_url.clone(),
    );
    let manager = Arc::new(ConnectionManager::new(
        policy,
        Arc::new(MemoryStore::new()),
        Duration::from_secs(config.exchange.timeout_secs),
    )?);

    let snapshot = manager.connect().await;
    if !snapshot.status.is_connected() {
        bail!(
            "Failed to connect to exchange: {}",
            snapshot.last_error.as_deref().unwrap_or("unknown error")
        );
    }

    info!(
        status = %snapshot.status,
        endpoint = snapshot.active_endpoint.as_deref().unwrap_or(""),
        "Exchange connection established"
    );

    let mut client = MarketClient::new(
        Arc::clone(&manager),
        config.exchange.quote_currency.clone(),
    );
    if let Some(credentials) = KrakenCredentials::from_env() {
        client = client.with_credentials(credentials);
    }

    Ok(FeedContext {
        manager,
        client: Arc::new(client),
        snapshot,
    })
}
