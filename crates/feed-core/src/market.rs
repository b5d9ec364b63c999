//! 시장 데이터 타입 및 구조체.
//!
//! 이 모듈은 시장 데이터 관련 타입을 정의합니다:
//! - `MarketPair` - 정규화된 거래 쌍
//! - `Ticker` - 24시간 통계가 포함된 시세 스냅샷
//! - `OrderBook` - 호가창 데이터
//! - `ConnectionStatus` - 거래소 연결 상태

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 정규화된 거래 가능 상품.
///
/// 거래소 고유 식별자(예: Kraken의 `XXBTZUSD`)와
/// 정규화된 기준/호가 심볼(예: `BTC`/`USD`)을 함께 보관합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPair {
    /// 거래소 고유 식별자 (예: XXBTZUSD)
    pub id: String,
    /// 정규화된 기준 자산 (예: BTC)
    pub base: String,
    /// 정규화된 호가 자산 (예: USD)
    pub quote: String,
    /// 표시 이름 (예: BTC/USD)
    pub display_name: String,
}

impl MarketPair {
    /// 새 거래 쌍을 생성합니다.
    pub fn new(
        id: impl Into<String>,
        base: impl Into<String>,
        quote: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            base: base.into(),
            quote: quote.into(),
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

/// 시세 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    /// 거래소 고유 거래 쌍 식별자
    pub pair_id: String,
    /// 최근 체결가
    pub last: Decimal,
    /// 24시간 시가
    pub open_24h: Decimal,
    /// 24시간 최고가
    pub high_24h: Decimal,
    /// 24시간 최저가
    pub low_24h: Decimal,
    /// 24시간 거래량 (기준 자산 단위)
    pub volume_24h: Decimal,
    /// 24시간 변동률(%)
    pub change_24h_percent: Decimal,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl Ticker {
    /// 24시간 변동률을 계산합니다: `(last - open) / open * 100`.
    ///
    /// 시가가 0이면 (첫 조회 전 기본값) 0을 반환합니다.
    pub fn compute_change_percent(last: Decimal, open: Decimal) -> Decimal {
        if open.is_zero() {
            return Decimal::ZERO;
        }
        (last - open) / open * Decimal::from(100)
    }
}

/// 호가창 가격 레벨.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// 가격
    pub price: Decimal,
    /// 수량
    pub quantity: Decimal,
}

/// 호가창 데이터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    /// 거래소 고유 거래 쌍 식별자
    pub pair_id: String,
    /// 매수 호가 - 가격 내림차순 정렬
    pub bids: Vec<OrderBookLevel>,
    /// 매도 호가 - 가격 오름차순 정렬
    pub asks: Vec<OrderBookLevel>,
    /// 마지막 업데이트 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl OrderBook {
    /// 최우선 매수 호가를 반환합니다.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// 최우선 매도 호가를 반환합니다.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// 스프레드를 반환합니다.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// 중간 가격을 반환합니다.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }
}

/// 거래소 연결 상태.
///
/// 상태 전이는 연결 관리자만 수행합니다:
///
/// ```text
/// Disconnected ──connect()──> Connecting ──primary 성공──> Connected
///                                  │
///                                  ├──primary 실패, fallback 성공──> ConnectedFallback
///                                  └──모든 endpoint 실패──> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// 연결되지 않음
    Disconnected,
    /// 연결 시도 중
    Connecting,
    /// primary endpoint에 연결됨
    Connected,
    /// fallback endpoint에 연결됨
    ConnectedFallback,
    /// 모든 endpoint 연결 실패
    Failed,
}

impl ConnectionStatus {
    /// 데이터 조회가 가능한 상태인지 확인합니다.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connected | ConnectionStatus::ConnectedFallback
        )
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::ConnectedFallback => write!(f, "connected_fallback"),
            ConnectionStatus::Failed => write!(f, "failed"),
        }
    }
}
