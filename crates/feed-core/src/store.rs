//! 표시용 key-value 저장소 인터페이스.
//!
//! 연결 관리자가 마지막 성공 endpoint와 연결 시각을 대시보드 표시용으로
//! 기록하는 데 사용합니다. 정합성(correctness)에는 관여하지 않으므로
//! 어떤 backing store든 이 인터페이스만 만족하면 됩니다.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::FeedResult;

/// 마지막 성공 endpoint를 기록하는 키.
pub const KEY_LAST_ENDPOINT: &str = "last_endpoint";
/// 마지막 연결 시각(RFC3339)을 기록하는 키.
pub const KEY_LAST_CONNECTED_AT: &str = "last_connected_at";
/// 외부에서 설정한 기본 endpoint를 읽는 키.
pub const KEY_DEFAULT_ENDPOINT: &str = "default_endpoint";

/// 단순 key-value 저장소 trait.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 키에 해당하는 값을 가져옵니다. 없으면 `None`.
    async fn get(&self, key: &str) -> FeedResult<Option<String>>;

    /// 키에 값을 설정합니다.
    async fn set(&self, key: &str, value: &str) -> FeedResult<()>;
}

/// 인메모리 key-value 저장소.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// 새 인메모리 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> FeedResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> FeedResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
