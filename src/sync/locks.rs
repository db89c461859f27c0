//! 문서별 원격 쓰기 잠금.
//!
//! 같은 문서에 대한 원격 쓰기(push, 자동 저장, 수동 저장, pull)는 이 잠금을
//! 잡은 상태에서만 진행됩니다. 그래서 한 문서에 대해 동시에 진행 중인 원격
//! 쓰기는 언제나 최대 하나입니다. 서로 다른 문서는 서로를 막지 않습니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub type DocumentGuard = OwnedMutexGuard<()>;

#[derive(Debug, Clone, Default)]
pub struct DocumentLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_for(&self, document_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.map();
        // 아무도 잡거나 기다리지 않는 잠금은 버립니다.
        map.retain(|id, lock| id == document_id || Arc::strong_count(lock) > 1);
        map.entry(document_id.to_string()).or_default().clone()
    }

    /// 잠금을 얻을 때까지 기다립니다.
    pub async fn acquire(&self, document_id: &str) -> DocumentGuard {
        self.lock_for(document_id).lock_owned().await
    }

    /// 이미 잡혀 있으면 None
    pub fn try_acquire(&self, document_id: &str) -> Option<DocumentGuard> {
        self.lock_for(document_id).try_lock_owned().ok()
    }

    pub fn is_busy(&self, document_id: &str) -> bool {
        self.map()
            .get(document_id)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }
}
