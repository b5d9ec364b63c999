//! # Feed Core
//!
//! 시장 데이터 피드의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 피드 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 시장 데이터 구조체 (거래 쌍, 시세, 호가창)
//! - 연결 상태 정의
//! - 설정 관리
//! - 로깅 인프라
//! - 표시용 key-value 저장소 인터페이스

pub mod config;
pub mod error;
pub mod logging;
pub mod market;
pub mod store;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use market::*;
pub use store::{KvStore, MemoryStore};
