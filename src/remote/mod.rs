//! # 원격 저장소 포트(Ports)
//!
//! 동기화 코어가 소비하는 원격 저장소의 계약(trait)입니다.
//! 코어는 구체적인 원격 구현(호스팅된 API, 테스트용 메모리 저장소 등)을 모르고
//! 이 trait만 보고 동작합니다.
//!
//! 구현체:
//! - `MemoryRemote`: 프로세스 안의 HashMap. 테스트와 오프라인 데모용이며
//!   장애/지연을 주입할 수 있습니다.
//! - `SqliteRemote`: 별도 SQLite 파일을 원격 저장소처럼 사용합니다.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRemote;
pub use sqlite::SqliteRemote;

use crate::error::SyncError;
use crate::models::{DocumentUpdate, NewDocument, NewSnapshot, RemoteDocument, Snapshot};
use async_trait::async_trait;
use std::sync::Arc;

/// 원격 문서 저장소
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// 문서를 덮어씁니다. 레코드가 없으면 `SyncError::NotFound`.
    async fn update(&self, id: &str, update: &DocumentUpdate) -> Result<(), SyncError>;

    /// 문서를 조회합니다. 없으면 `Ok(None)`.
    async fn get(&self, id: &str) -> Result<Option<RemoteDocument>, SyncError>;

    async fn insert(&self, document: &NewDocument) -> Result<RemoteDocument, SyncError>;
}

/// 원격 버전(스냅샷) 저장소. insert 전용이며 수정 API는 없습니다.
#[async_trait]
pub trait RemoteVersionStore: Send + Sync {
    /// `id`와 `created_at`은 원격이 부여합니다.
    async fn insert(&self, snapshot: &NewSnapshot) -> Result<Snapshot, SyncError>;

    /// `created_at` 내림차순, 최대 `limit`개
    async fn list(&self, document_id: &str, limit: u32) -> Result<Vec<Snapshot>, SyncError>;

    /// 없는 ID면 `SyncError::NotFound`.
    async fn delete(&self, id: &str) -> Result<(), SyncError>;
}

pub type SharedDocumentStore = Arc<dyn RemoteDocumentStore>;
pub type SharedVersionStore = Arc<dyn RemoteVersionStore>;

/// 원격 호출에 제한 시간을 겁니다. 시간 초과는 `SyncError::Network`가 됩니다.
///
/// 멈춘 네트워크 호출 하나가 `saving` 상태를 영원히 붙잡지 않게 하려면
/// 모든 원격 호출이 이 함수를 거쳐야 합니다.
pub(crate) async fn call_with_timeout<T, F>(
    timeout: std::time::Duration,
    operation: &str,
    target_id: &str,
    call: F,
) -> Result<T, SyncError>
where
    F: std::future::Future<Output = Result<T, SyncError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::timed_out(operation, target_id)),
    }
}
