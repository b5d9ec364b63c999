//! Endpoint failover 및 시장 데이터 조회 통합 테스트.
//!
//! mockito로 Kraken REST API를 흉내내어 연결 상태 머신과
//! fetcher 동작을 HTTP 레벨에서 검증합니다.

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use feed_core::store::KEY_LAST_ENDPOINT;
use feed_core::{ConnectionStatus, KrakenCredentials, KvStore, MemoryStore};
use feed_exchange::{
    ConnectionManager, EndpointEntry, EndpointPolicy, ExchangeError, MarketClient, PollEvent,
    Poller,
};

const TIME_OK: &str =
    r#"{"error":[],"result":{"unixtime":1688669448,"rfc1123":"Thu, 06 Jul 23 18:50:48 +0000"}}"#;

fn manager_with(policy: EndpointPolicy, store: Arc<MemoryStore>) -> Arc<ConnectionManager> {
    Arc::new(
        ConnectionManager::new(policy, store, Duration::from_secs(2))
            .expect("manager construction"),
    )
}

async fn mock_time_ok(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/0/public/Time")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TIME_OK)
        .create_async()
        .await
}

async fn mock_time_failure(server: &mut ServerGuard, body: &str) -> mockito::Mock {
    server
        .mock("GET", "/0/public/Time")
        .with_status(500)
        .with_body(body.to_string())
        .create_async()
        .await
}

/// 연결된 클라이언트와 fallback 서버를 준비합니다.
async fn connected_client() -> (ServerGuard, Arc<ConnectionManager>, MarketClient) {
    let mut server = Server::new_async().await;
    let _time = mock_time_ok(&mut server).await;

    let policy = EndpointPolicy::primary_fallback(server.url(), "http://127.0.0.1:1/unused");
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));
    let snapshot = manager.connect().await;
    assert_eq!(snapshot.status, ConnectionStatus::Connected);

    let client = MarketClient::new(Arc::clone(&manager), "USD");
    (server, manager, client)
}

#[tokio::test]
async fn initial_state_is_disconnected() {
    let policy = EndpointPolicy::primary_fallback("http://127.0.0.1:1/a", "http://127.0.0.1:1/b");
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.active_endpoint, None);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(manager.current_endpoint().await, None);
}

#[tokio::test]
async fn primary_success_never_probes_fallback() {
    let mut primary = Server::new_async().await;
    let mut fallback = Server::new_async().await;

    let primary_mock = mock_time_ok(&mut primary).await;
    let fallback_mock = fallback
        .mock("GET", "/0/public/Time")
        .with_status(200)
        .with_body(TIME_OK)
        .expect(0)
        .create_async()
        .await;

    let policy = EndpointPolicy::primary_fallback(primary.url(), fallback.url());
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));

    let snapshot = manager.connect().await;
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
    assert_eq!(snapshot.active_endpoint.as_deref(), Some(primary.url().as_str()));
    assert_eq!(snapshot.last_error, None);

    primary_mock.assert_async().await;
    fallback_mock.assert_async().await;
}

#[tokio::test]
async fn primary_failure_falls_back_once() {
    let mut primary = Server::new_async().await;
    let mut fallback = Server::new_async().await;

    let primary_mock = mock_time_failure(&mut primary, "boom").await;
    let fallback_mock = mock_time_ok(&mut fallback).await;

    let store = Arc::new(MemoryStore::new());
    let policy = EndpointPolicy::primary_fallback(primary.url(), fallback.url());
    let manager = manager_with(policy, Arc::clone(&store));

    let snapshot = manager.connect().await;
    assert_eq!(snapshot.status, ConnectionStatus::ConnectedFallback);
    assert_eq!(
        snapshot.active_endpoint.as_deref(),
        Some(fallback.url().as_str())
    );

    // fallback probe는 정확히 1회
    primary_mock.assert_async().await;
    fallback_mock.assert_async().await;

    // 표시용 저장소에 마지막 성공 endpoint 기록
    assert_eq!(
        store.get(KEY_LAST_ENDPOINT).await.unwrap(),
        Some(fallback.url())
    );
}

#[tokio::test]
async fn upstream_error_array_triggers_fallback() {
    let mut primary = Server::new_async().await;
    let mut fallback = Server::new_async().await;

    // HTTP 200이어도 error 배열이 비어 있지 않으면 probe 실패
    let _primary_mock = primary
        .mock("GET", "/0/public/Time")
        .with_status(200)
        .with_body(r#"{"error":["EService:Unavailable"]}"#)
        .create_async()
        .await;
    let _fallback_mock = mock_time_ok(&mut fallback).await;

    let policy = EndpointPolicy::primary_fallback(primary.url(), fallback.url());
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));

    let snapshot = manager.connect().await;
    assert_eq!(snapshot.status, ConnectionStatus::ConnectedFallback);
}

#[tokio::test]
async fn both_endpoints_failing_yields_failed_with_combined_error() {
    let mut primary = Server::new_async().await;
    let mut fallback = Server::new_async().await;

    let _p = mock_time_failure(&mut primary, "primary down").await;
    let _f = mock_time_failure(&mut fallback, "fallback down").await;

    let policy = EndpointPolicy::primary_fallback(primary.url(), fallback.url());
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));

    let snapshot = manager.connect().await;
    assert_eq!(snapshot.status, ConnectionStatus::Failed);
    assert_eq!(snapshot.active_endpoint, None);
    assert_eq!(manager.current_endpoint().await, None);

    // 두 실패 원인이 모두 기록됨
    let error = snapshot.last_error.expect("last_error populated");
    assert!(error.contains(&primary.url()));
    assert!(error.contains(&fallback.url()));
    assert!(error.contains("primary down"));
    assert!(error.contains("fallback down"));
}

#[tokio::test]
async fn reset_returns_to_disconnected_and_clears_error() {
    let mut primary = Server::new_async().await;
    let mut fallback = Server::new_async().await;

    let _p = mock_time_failure(&mut primary, "down").await;
    let _f = mock_time_failure(&mut fallback, "down").await;

    let policy = EndpointPolicy::primary_fallback(primary.url(), fallback.url());
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));

    let snapshot = manager.connect().await;
    assert_eq!(snapshot.status, ConnectionStatus::Failed);
    assert!(snapshot.last_error.is_some());

    manager.reset().await;

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.active_endpoint, None);
}

#[tokio::test]
async fn connect_is_idempotent_while_connected() {
    let mut server = Server::new_async().await;
    let time_mock = server
        .mock("GET", "/0/public/Time")
        .with_status(200)
        .with_body(TIME_OK)
        .expect(1)
        .create_async()
        .await;

    let policy = EndpointPolicy::primary_fallback(server.url(), "http://127.0.0.1:1/unused");
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));

    let first = manager.connect().await;
    let second = manager.connect().await;

    assert_eq!(first, second);
    assert_eq!(second.status, ConnectionStatus::Connected);
    // 두 번째 connect()는 추가 probe를 수행하지 않음
    time_mock.assert_async().await;
}

#[tokio::test]
async fn disconnect_keeps_endpoints_and_allows_reconnect() {
    let mut server = Server::new_async().await;
    let time_mock = server
        .mock("GET", "/0/public/Time")
        .with_status(200)
        .with_body(TIME_OK)
        .expect(2)
        .create_async()
        .await;

    let policy = EndpointPolicy::primary_fallback(server.url(), "http://127.0.0.1:1/unused");
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));

    manager.connect().await;
    manager.disconnect().await;
    assert_eq!(manager.status().await, ConnectionStatus::Disconnected);
    assert_eq!(manager.current_endpoint().await, None);

    let snapshot = manager.connect().await;
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
    time_mock.assert_async().await;
}

#[tokio::test]
async fn three_endpoint_policy_walks_in_order() {
    let mut first = Server::new_async().await;
    let mut second = Server::new_async().await;
    let mut third = Server::new_async().await;

    let _a = mock_time_failure(&mut first, "down").await;
    let _b = mock_time_failure(&mut second, "down").await;
    let third_mock = mock_time_ok(&mut third).await;

    let policy = EndpointPolicy::new(vec![
        EndpointEntry::once(first.url()),
        EndpointEntry::once(second.url()),
        EndpointEntry::once(third.url()),
    ])
    .expect("valid policy");
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));

    let snapshot = manager.connect().await;
    assert_eq!(snapshot.status, ConnectionStatus::ConnectedFallback);
    assert_eq!(snapshot.active_endpoint, Some(third.url()));
    third_mock.assert_async().await;
}

#[tokio::test]
async fn fetch_while_disconnected_fails_without_network_calls() {
    let mut server = Server::new_async().await;
    let pairs_mock = server
        .mock("GET", "/0/public/AssetPairs")
        .expect(0)
        .create_async()
        .await;
    let ticker_mock = server
        .mock("GET", "/0/public/Ticker")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let depth_mock = server
        .mock("GET", "/0/public/Depth")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let policy = EndpointPolicy::primary_fallback(server.url(), server.url());
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));
    let client = MarketClient::new(manager, "USD");

    assert!(matches!(
        client.list_tradable_pairs().await,
        Err(ExchangeError::NotConnected)
    ));
    assert!(matches!(
        client.fetch_ticker("XXBTZUSD").await,
        Err(ExchangeError::NotConnected)
    ));
    assert!(matches!(
        client.fetch_order_book("XXBTZUSD", 10).await,
        Err(ExchangeError::NotConnected)
    ));

    pairs_mock.assert_async().await;
    ticker_mock.assert_async().await;
    depth_mock.assert_async().await;
}

#[tokio::test]
async fn list_tradable_pairs_filters_by_quote_currency() {
    let (mut server, _manager, client) = connected_client().await;

    let body = r#"{"error":[],"result":{
        "XXBTZUSD": {"wsname":"XBT/USD","base":"XXBT","quote":"ZUSD"},
        "XETHZEUR": {"wsname":"ETH/EUR","base":"XETH","quote":"ZEUR"},
        "SOLUSD": {"wsname":"SOL/USD","base":"SOL","quote":"ZUSD"}
    }}"#;
    let _pairs = server
        .mock("GET", "/0/public/AssetPairs")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let pairs = client.list_tradable_pairs().await.unwrap();

    // EUR 쌍은 제외, id 오름차순 정렬
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].id, "SOLUSD");
    assert_eq!(pairs[0].base, "SOL");
    assert_eq!(pairs[0].quote, "USD");
    assert_eq!(pairs[1].id, "XXBTZUSD");
    assert_eq!(pairs[1].base, "BTC");
    assert_eq!(pairs[1].display_name, "BTC/USD");
}

#[tokio::test]
async fn fetch_ticker_computes_change_percent() {
    let (mut server, _manager, client) = connected_client().await;

    let body = r#"{"error":[],"result":{
        "XXBTZUSD": {
            "c": ["45000.0", "0.01"],
            "v": ["120.5", "350.2"],
            "h": ["45500.0", "46000.0"],
            "l": ["44000.0", "43500.0"],
            "o": "44000.0"
        }
    }}"#;
    let _ticker = server
        .mock("GET", "/0/public/Ticker")
        .match_query(Matcher::UrlEncoded("pair".into(), "XXBTZUSD".into()))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let ticker = client.fetch_ticker("XXBTZUSD").await.unwrap();
    assert_eq!(ticker.last, dec!(45000.0));
    assert_eq!(ticker.open_24h, dec!(44000.0));
    assert_eq!(ticker.volume_24h, dec!(350.2));
    // ((45000 - 44000) / 44000) * 100 = 2.2727...%
    assert_eq!(ticker.change_24h_percent.round_dp(4), dec!(2.2727));
}

#[tokio::test]
async fn fetch_ticker_surfaces_upstream_error_unmodified() {
    let (mut server, _manager, client) = connected_client().await;

    let _ticker = server
        .mock("GET", "/0/public/Ticker")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"error":["EQuery:Unknown asset pair"]}"#)
        .create_async()
        .await;

    match client.fetch_ticker("NOPE").await {
        Err(ExchangeError::Upstream(msg)) => assert_eq!(msg, "EQuery:Unknown asset pair"),
        other => panic!("expected Upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn order_book_truncates_and_sorts() {
    let (mut server, _manager, client) = connected_client().await;

    // 20개 매수 / 15개 매도 호가를 무작위 순서로 구성
    let mut bids = Vec::new();
    for i in 0..20 {
        bids.push(format!(r#"["{}", "1.0", 1688669448]"#, 44000 + i * 10));
    }
    bids.reverse();
    bids.swap(0, 5);
    let mut asks = Vec::new();
    for i in 0..15 {
        asks.push(format!(r#"["{}", "2.0", 1688669448]"#, 45000 + i * 10));
    }
    asks.swap(1, 8);
    let body = format!(
        r#"{{"error":[],"result":{{"XXBTZUSD":{{"bids":[{}],"asks":[{}]}}}}}}"#,
        bids.join(","),
        asks.join(",")
    );

    let _depth = server
        .mock("GET", "/0/public/Depth")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pair".into(), "XXBTZUSD".into()),
            Matcher::UrlEncoded("count".into(), "10".into()),
        ]))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let book = client.fetch_order_book("XXBTZUSD", 10).await.unwrap();

    assert_eq!(book.bids.len(), 10);
    assert_eq!(book.asks.len(), 10);
    // 매수는 내림차순, 최고가부터
    assert_eq!(book.bids[0].price, dec!(44190));
    assert!(book.bids.windows(2).all(|w| w[0].price > w[1].price));
    // 매도는 오름차순, 최저가부터
    assert_eq!(book.asks[0].price, dec!(45000));
    assert!(book.asks.windows(2).all(|w| w[0].price < w[1].price));
}

#[tokio::test]
async fn order_book_zero_depth_rejected_without_network() {
    let (mut server, _manager, client) = connected_client().await;

    let depth_mock = server
        .mock("GET", "/0/public/Depth")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    assert!(matches!(
        client.fetch_order_book("XXBTZUSD", 0).await,
        Err(ExchangeError::InvalidArgument(_))
    ));
    depth_mock.assert_async().await;
}

#[tokio::test]
async fn fetch_balance_requires_credentials() {
    let (_server, _manager, client) = connected_client().await;

    assert!(matches!(
        client.fetch_balance().await,
        Err(ExchangeError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn fetch_balance_signs_request_and_normalizes_assets() {
    let (mut server, _manager, client) = connected_client().await;
    let client = client.with_credentials(KrakenCredentials::new(
        "test-key",
        "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==",
    ));

    let balance_mock = server
        .mock("POST", "/0/private/Balance")
        .match_header("API-Key", "test-key")
        .match_header("API-Sign", Matcher::Regex(".+".to_string()))
        .match_body(Matcher::Regex("^nonce=\\d+$".to_string()))
        .with_status(200)
        .with_body(r#"{"error":[],"result":{"XXBT":"1.5","ZUSD":"100.0"}}"#)
        .create_async()
        .await;

    let balances = client.fetch_balance().await.unwrap();
    assert_eq!(balances.get("BTC"), Some(&dec!(1.5)));
    assert_eq!(balances.get("USD"), Some(&dec!(100.0)));
    balance_mock.assert_async().await;
}

#[tokio::test]
async fn poller_emits_ticks_and_stops_on_cancel() {
    let (mut server, _manager, client) = connected_client().await;

    let body = r#"{"error":[],"result":{
        "XXBTZUSD": {"c":["45000.0","0.01"],"v":["1.0","2.0"],"h":["1","1"],"l":["1","1"],"o":"44000.0"}
    }}"#;
    let _ticker = server
        .mock("GET", "/0/public/Ticker")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body)
        .expect_at_least(1)
        .create_async()
        .await;

    let token = CancellationToken::new();
    let (handle, mut rx) = Poller::spawn(
        Arc::new(client),
        vec!["XXBTZUSD".to_string()],
        Duration::from_millis(10),
        token.clone(),
    );

    match rx.recv().await {
        Some(PollEvent::Tick(tickers)) => {
            assert_eq!(tickers.len(), 1);
            assert_eq!(tickers[0].pair_id, "XXBTZUSD");
        }
        other => panic!("expected tick, got {:?}", other),
    }

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn poller_zero_interval_does_not_panic() {
    // 0 간격은 최소 간격으로 올려 태스크가 panic 없이 동작해야 함
    let policy = EndpointPolicy::primary_fallback("http://127.0.0.1:1/a", "http://127.0.0.1:1/b");
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));
    let client = MarketClient::new(manager, "USD");

    let token = CancellationToken::new();
    let (handle, mut rx) = Poller::spawn(
        Arc::new(client),
        vec!["XXBTZUSD".to_string()],
        Duration::from_secs(0),
        token.clone(),
    );

    assert!(matches!(rx.recv().await, Some(PollEvent::Error(_))));

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn poller_reports_errors_and_keeps_going() {
    // 연결되지 않은 클라이언트 - 매 주기 NotConnected 보고
    let policy = EndpointPolicy::primary_fallback("http://127.0.0.1:1/a", "http://127.0.0.1:1/b");
    let manager = manager_with(policy, Arc::new(MemoryStore::new()));
    let client = MarketClient::new(manager, "USD");

    let token = CancellationToken::new();
    let (handle, mut rx) = Poller::spawn(
        Arc::new(client),
        vec!["XXBTZUSD".to_string()],
        Duration::from_millis(10),
        token.clone(),
    );

    // 실패가 루프를 멈추지 않고 연속 보고되는지 확인
    for _ in 0..2 {
        match rx.recv().await {
            Some(PollEvent::Error(msg)) => assert!(msg.contains("Not connected")),
            other => panic!("expected error event, got {:?}", other),
        }
    }

    token.cancel();
    handle.await.unwrap();
}
