//! Kraken REST API 응답 타입.
//!
//! 모든 Kraken 응답은 최상위 `error: string[]` 배열과 `result` 객체를
//! 가집니다. `error`가 비어 있지 않으면 HTTP 상태와 무관하게 실패입니다.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{ExchangeError, ExchangeResult};

/// Kraken 최상위 응답 envelope.
#[derive(Debug, Deserialize)]
pub struct KrakenResponse<T> {
    /// 에러 메시지 배열 - 비어 있지 않으면 실패
    #[serde(default)]
    pub error: Vec<String>,
    /// 응답 본문
    pub result: Option<T>,
}

impl<T> KrakenResponse<T> {
    /// envelope을 풀어 `result`를 꺼냅니다.
    ///
    /// upstream 에러 메시지는 변형 없이 그대로 전달합니다.
    pub fn into_result(self) -> ExchangeResult<T> {
        if !self.error.is_empty() {
            return Err(ExchangeError::Upstream(self.error.join(", ")));
        }
        self.result
            .ok_or_else(|| ExchangeError::Parse("missing result field".to_string()))
    }
}

/// `AssetPairs` 응답의 단일 거래 쌍.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAssetPair {
    /// WebSocket 쌍 이름 (예: "XBT/USD")
    pub wsname: Option<String>,
    /// 기준 자산 코드 (예: "XXBT")
    pub base: String,
    /// 호가 자산 코드 (예: "ZUSD")
    pub quote: String,
}

/// `Ticker` 응답의 단일 거래 쌍.
///
/// Kraken은 시세 필드를 한 글자 키의 문자열 배열로 반환합니다:
/// `c` = 최근 체결 [가격, 수량], `v` = 거래량 [당일, 24시간],
/// `h`/`l` = 고가/저가 [당일, 24시간], `o` = 24시간 시가.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTicker {
    /// 최근 체결 [가격, 수량]
    #[serde(default)]
    pub c: Vec<String>,
    /// 거래량 [당일, 24시간]
    #[serde(default)]
    pub v: Vec<String>,
    /// 고가 [당일, 24시간]
    #[serde(default)]
    pub h: Vec<String>,
    /// 저가 [당일, 24시간]
    #[serde(default)]
    pub l: Vec<String>,
    /// 24시간 시가
    #[serde(default)]
    pub o: String,
}

/// `Depth` 응답의 호가 레벨: [가격, 수량, 타임스탬프].
pub type RawDepthLevel = (String, String, f64);

/// `Depth` 응답의 단일 거래 쌍.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDepth {
    /// 매수 호가
    #[serde(default)]
    pub bids: Vec<RawDepthLevel>,
    /// 매도 호가
    #[serde(default)]
    pub asks: Vec<RawDepthLevel>,
}

/// `AssetPairs` 전체 응답 본문.
pub type RawAssetPairs = HashMap<String, RawAssetPair>;

/// `Ticker` 전체 응답 본문.
pub type RawTickers = HashMap<String, RawTicker>;

/// `Depth` 전체 응답 본문.
pub type RawDepths = HashMap<String, RawDepth>;

/// `Balance` 전체 응답 본문 (자산 코드 → 잔고 문자열).
pub type RawBalances = HashMap<String, String>;

/// 문자열에서 Decimal 파싱. 비어 있거나 잘못된 값은 0으로 처리합니다.
pub fn parse_decimal(s: &str) -> Decimal {
    s.parse().unwrap_or(Decimal::ZERO)
}

/// 문자열 배열의 n번째 요소를 Decimal로 파싱합니다. 없으면 0.
pub fn parse_decimal_at(values: &[String], index: usize) -> Decimal {
    values.get(index).map(|s| parse_decimal(s)).unwrap_or(Decimal::ZERO)
}
