//! 거래소 연결 및 시장 데이터 처리.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Endpoint failover 정책 (primary → fallback, 데이터로 표현)
//! - 연결 관리자: 연결 상태 머신 소유
//! - Kraken 공개 API 기반 시장 데이터 조회 및 정규화
//! - 고정 간격 폴링 루프 (취소 가능)

pub mod connection;
pub mod endpoint;
pub mod error;
pub mod kraken;
pub mod normalize;
pub mod poller;
pub mod wire;

pub use connection::{ConnectionManager, ConnectionSnapshot};
pub use endpoint::{EndpointEntry, EndpointPolicy};
pub use error::{ExchangeError, ExchangeResult};
pub use kraken::MarketClient;
pub use poller::{PollEvent, Poller};
