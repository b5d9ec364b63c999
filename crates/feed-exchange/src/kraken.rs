//! Kraken 시장 데이터 클라이언트.
//!
//! 활성 endpoint에 대해 읽기 작업을 수행하고 결과를 공통 스키마로
//! 정규화합니다. 이 클라이언트는 스스로 failover하지 않습니다:
//! 작업 중 endpoint 에러는 그대로 호출자에게 전달되며, failover는
//! 이후의 명시적 `connect()`/`reset()`에서만 일어납니다.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, error};

use feed_core::{KrakenCredentials, MarketPair, OrderBook, OrderBookLevel, Ticker};

use crate::connection::ConnectionManager;
use crate::error::{ExchangeError, ExchangeResult};
use crate::normalize;
use crate::wire::{
    parse_decimal, parse_decimal_at, KrakenResponse, RawAssetPairs, RawBalances, RawDepths,
    RawTickers,
};

type HmacSha512 = Hmac<Sha512>;

/// Kraken 시장 데이터 클라이언트.
pub struct MarketClient {
    manager: Arc<ConnectionManager>,
    http: reqwest::Client,
    quote_currency: String,
    credentials: Option<KrakenCredentials>,
}

impl MarketClient {
    /// 새 클라이언트를 생성합니다. 연결 관리자의 HTTP 클라이언트를 공유합니다.
    pub fn new(manager: Arc<ConnectionManager>, quote_currency: impl Into<String>) -> Self {
        let http = manager.http().clone();
        Self {
            manager,
            http,
            quote_currency: quote_currency.into(),
            credentials: None,
        }
    }

    /// 인증이 필요한 private API 호출용 자격증명을 설정합니다.
    pub fn with_credentials(mut self, credentials: KrakenCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// 연결 관리자를 반환합니다.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// 호가 통화로 필터링된 거래 가능 쌍 목록을 조회합니다.
    pub async fn list_tradable_pairs(&self) -> ExchangeResult<Vec<MarketPair>> {
        let base = self.ensure_connected().await?;
        let raw: RawAssetPairs = self.public_get(&base, "/0/public/AssetPairs", &[]).await?;

        let mut pairs: Vec<MarketPair> = raw
            .into_iter()
            .filter_map(|(id, info)| {
                let quote = normalize::canonical_asset(&info.quote);
                if quote != self.quote_currency {
                    return None;
                }
                let base_asset = normalize::canonical_asset(&info.base);
                let display = normalize::display_name(info.wsname.as_deref(), &base_asset, &quote);
                Some(MarketPair::new(id, base_asset, quote, display))
            })
            .collect();

        pairs.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(count = pairs.len(), quote = %self.quote_currency, "Listed tradable pairs");
        Ok(pairs)
    }

    /// 단일 거래 쌍의 시세를 조회합니다.
    pub async fn fetch_ticker(&self, pair_id: &str) -> ExchangeResult<Ticker> {
        let mut tickers = self.fetch_tickers(&[pair_id.to_string()]).await?;

        if let Some(pos) = tickers.iter().position(|t| t.pair_id == pair_id) {
            return Ok(tickers.swap_remove(pos));
        }
        // Kraken은 요청한 식별자의 별칭 키로 응답하기도 함
        if tickers.len() == 1 {
            return Ok(tickers.remove(0));
        }
        Err(ExchangeError::Upstream(format!(
            "no ticker data for pair {}",
            pair_id
        )))
    }

    /// 여러 거래 쌍의 시세를 한 번에 조회합니다.
    pub async fn fetch_tickers(&self, pair_ids: &[String]) -> ExchangeResult<Vec<Ticker>> {
        if pair_ids.is_empty() {
            return Err(ExchangeError::InvalidArgument(
                "at least one pair id is required".to_string(),
            ));
        }
        let base = self.ensure_connected().await?;

        let joined = pair_ids.join(",");
        let raw: RawTickers = self
            .public_get(&base, "/0/public/Ticker", &[("pair", joined)])
            .await?;

        let now = Utc::now();
        let mut tickers: Vec<Ticker> = raw
            .into_iter()
            .map(|(pair_id, t)| {
                let last = parse_decimal_at(&t.c, 0);
                let open = parse_decimal(&t.o);
                Ticker {
                    pair_id,
                    last,
                    open_24h: open,
                    high_24h: parse_decimal_at(&t.h, 1),
                    low_24h: parse_decimal_at(&t.l, 1),
                    volume_24h: parse_decimal_at(&t.v, 1),
                    change_24h_percent: Ticker::compute_change_percent(last, open),
                    timestamp: now,
                }
            })
            .collect();

        tickers.sort_by(|a, b| a.pair_id.cmp(&b.pair_id));
        Ok(tickers)
    }

    /// 거래 쌍의 호가창을 조회합니다.
    ///
    /// `depth`는 양의 정수여야 하며, 반환되는 매수/매도 호가는 각각
    /// `depth`개로 절단됩니다. 매수는 가격 내림차순, 매도는 오름차순입니다.
    pub async fn fetch_order_book(&self, pair_id: &str, depth: u32) -> ExchangeResult<OrderBook> {
        if depth == 0 {
            return Err(ExchangeError::InvalidArgument(
                "depth must be a positive integer".to_string(),
            ));
        }
        let base = self.ensure_connected().await?;

        let mut raw: RawDepths = self
            .public_get(
                &base,
                "/0/public/Depth",
                &[
                    ("pair", pair_id.to_string()),
                    ("count", depth.to_string()),
                ],
            )
            .await?;

        // Kraken은 요청한 식별자의 별칭 키로 응답하기도 함
        let book = match raw.remove(pair_id) {
            Some(book) => book,
            None => {
                let mut values = raw.into_values();
                match (values.next(), values.next()) {
                    (Some(book), None) => book,
                    _ => {
                        return Err(ExchangeError::Upstream(format!(
                            "no depth data for pair {}",
                            pair_id
                        )))
                    }
                }
            }
        };

        let depth = depth as usize;

        let mut bids: Vec<OrderBookLevel> = book
            .bids
            .iter()
            .map(|(price, qty, _)| OrderBookLevel {
                price: parse_decimal(price),
                quantity: parse_decimal(qty),
            })
            .collect();
        let mut asks: Vec<OrderBookLevel> = book
            .asks
            .iter()
            .map(|(price, qty, _)| OrderBookLevel {
                price: parse_decimal(price),
                quantity: parse_decimal(qty),
            })
            .collect();

        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        bids.truncate(depth);
        asks.truncate(depth);

        Ok(OrderBook {
            pair_id: pair_id.to_string(),
            bids,
            asks,
            timestamp: Utc::now(),
        })
    }

    /// 계좌 잔고를 조회합니다 (private API, 자격증명 필요).
    ///
    /// 자산 코드는 정규 심볼로 변환되어 반환됩니다.
    pub async fn fetch_balance(&self) -> ExchangeResult<BTreeMap<String, Decimal>> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ExchangeError::Unauthorized("API credentials not configured".to_string())
        })?;
        let base = self.ensure_connected().await?;

        let raw: RawBalances = self
            .private_post(&base, "/0/private/Balance", credentials)
            .await?;

        Ok(raw
            .into_iter()
            .map(|(asset, amount)| (normalize::canonical_asset(&asset), parse_decimal(&amount)))
            .collect())
    }

    /// 연결된 상태인지 확인하고 활성 endpoint를 반환합니다.
    ///
    /// 연결되지 않은 상태면 네트워크 호출 없이 `NotConnected`로 실패합니다.
    async fn ensure_connected(&self) -> ExchangeResult<String> {
        self.manager
            .current_endpoint()
            .await
            .ok_or(ExchangeError::NotConnected)
    }

    /// 공개 API GET 요청.
    async fn public_get<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        let query = Self::build_query(params);
        let full_url = if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", full_url);

        let response = self.http.get(&full_url).send().await?;
        Self::handle_response(response).await
    }

    /// 서명된 private API POST 요청.
    async fn private_post<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        credentials: &KrakenCredentials,
    ) -> ExchangeResult<T> {
        let nonce = Self::nonce();
        let postdata = format!("nonce={}", nonce);
        let signature = Self::sign(
            path,
            &nonce,
            &postdata,
            credentials.api_secret.expose_secret(),
        )?;

        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        debug!("POST (signed) {}", path);

        let response = self
            .http
            .post(&url)
            .header("API-Key", &credentials.api_key)
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(postdata)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        if !status.is_success() {
            // Kraken은 에러 응답에도 envelope을 담는 경우가 있음
            if let Ok(parsed) = serde_json::from_str::<KrakenResponse<serde_json::Value>>(&body) {
                if !parsed.error.is_empty() {
                    return Err(ExchangeError::Upstream(parsed.error.join(", ")));
                }
            }
            return Err(ExchangeError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        let parsed: KrakenResponse<T> = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse response: {} - Body: {}", e, body);
            ExchangeError::Parse(e.to_string())
        })?;
        parsed.into_result()
    }

    /// 파라미터에서 쿼리 문자열 생성.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 현재 타임스탬프(밀리초) 기반 nonce 반환.
    fn nonce() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().to_string())
            .unwrap_or_else(|_| "0".to_string())
    }

    /// Kraken 서명: `HMAC-SHA512(secret, path + SHA256(nonce + postdata))`, base64 인코딩.
    fn sign(path: &str, nonce: &str, postdata: &str, secret_b64: &str) -> ExchangeResult<String> {
        let secret = BASE64.decode(secret_b64).map_err(|e| {
            ExchangeError::Unauthorized(format!("invalid API secret encoding: {}", e))
        })?;

        let mut sha = Sha256::new();
        sha.update(nonce.as_bytes());
        sha.update(postdata.as_bytes());
        let digest = sha.finalize();

        let mut mac = HmacSha512::new_from_slice(&secret)
            .map_err(|e| ExchangeError::Unauthorized(format!("invalid API secret: {}", e)))?;
        mac.update(path.as_bytes());
        mac.update(&digest);

        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query() {
        assert_eq!(MarketClient::build_query(&[]), "");
        assert_eq!(
            MarketClient::build_query(&[
                ("pair", "XXBTZUSD".to_string()),
                ("count", "10".to_string())
            ]),
            "pair=XXBTZUSD&count=10"
        );
    }

    #[test]
    fn test_sign_known_vector() {
        // Kraken API 문서의 공개 서명 예제
        let secret = "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";
        let nonce = "1616492376594";
        let postdata =
            "nonce=1616492376594&ordertype=limit&pair=XBTUSD&price=37500&type=buy&volume=1.25";
        let path = "/0/private/AddOrder";

        let signature = MarketClient::sign(path, nonce, postdata, secret).unwrap();
        assert_eq!(
            signature,
            "4/dpxb3iT4tp/ZCVEwSnEsLxx0bqyhLpdfOpc6fn7OR8+UClSV5n9E6aSS8MPtnRfp32bAb7nmbvDL2pthnfRQ=="
        );
    }

    #[test]
    fn test_sign_rejects_invalid_secret() {
        let result = MarketClient::sign("/0/private/Balance", "1", "nonce=1", "not base64!!");
        assert!(matches!(result, Err(ExchangeError::Unauthorized(_))));
    }
}
