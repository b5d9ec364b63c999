//! 시장 데이터 CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 거래 가능 쌍/시세/호가창 조회
//! - 고정 간격 시세 폴링
//! - 연결 상태 점검

pub mod commands;
