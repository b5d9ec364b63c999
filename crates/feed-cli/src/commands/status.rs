//! 연결 상태 점검.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use feed_core::{AppConfig, MemoryStore};
use feed_exchange::{ConnectionManager, EndpointPolicy};

/// endpoint 연결을 시도하고 결과 상태를 출력합니다.
///
/// 연결 실패도 상태 보고이므로 에러로 종료하지 않습니다.
pub async fn show_status(config: &AppConfig) -> Result<()> {
    let policy = EndpointPolicy::primary_fallback(
        config.exchange.primary_url.clone(),
        config.exchange.fallback_url.clone(),
    );
    let manager = Arc::new(ConnectionManager::new(
        policy,
        Arc::new(MemoryStore::new()),
        Duration::from_secs(config.exchange.timeout_secs),
    )?);

    println!("\n연결 상태 확인 중...");
    println!("primary:  {}", config.exchange.primary_url);
    println!("fallback: {}", config.exchange.fallback_url);

    let snapshot = manager.connect().await;

    println!("\n상태: {}", snapshot.status);
    match snapshot.active_endpoint {
        Some(endpoint) => println!("활성 endpoint: {}", endpoint),
        None => println!("활성 endpoint: 없음"),
    }
    if let Some(error) = snapshot.last_error {
        println!("마지막 에러: {}", error);
    }

    Ok(())
}
