//! # 로컬 문서 저장소 (Local Document Store)
//!
//! 기기마다 하나씩 있는 영속 저장소입니다. 문서별 미러와 Draft,
//! 그리고 auto 스냅샷 간격을 위한 시각을 보관합니다.
//!
//! 내부 동시성 제어는 없습니다. 한 문서 ID에 쓰는 주체는 현재 편집 세션 하나뿐이고,
//! 서로 다른 문서의 업서트는 SQLite가 안전하게 처리합니다.

use crate::clock::{duration_ms, SharedClock, SystemClock};
use crate::db;
use crate::error::SyncError;
use crate::models::{Document, Draft};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// 로컬 저장소 핸들. `SqlitePool`이 내부적으로 Arc이므로 clone은 저렴합니다.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    clock: SharedClock,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    /// 파일 기반 저장소를 열고 마이그레이션까지 실행합니다.
    pub async fn open(database_url: &str) -> Result<Self, SyncError> {
        Ok(Self::new(db::connect(database_url).await?))
    }

    pub async fn open_in_memory(clock: SharedClock) -> Result<Self, SyncError> {
        Ok(Self::with_clock(db::connect_in_memory().await?, clock))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // ── 미러 ──

    pub async fn put(&self, document: &Document) -> Result<(), SyncError> {
        db::put_document(&self.pool, document).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Document>, SyncError> {
        db::get_document(&self.pool, id).await
    }

    /// 미러가 반드시 있어야 하는 작업용. 없으면 `Validation` 에러.
    pub async fn require(&self, id: &str) -> Result<Document, SyncError> {
        self.get(id)
            .await?
            .ok_or_else(|| SyncError::Validation(format!("unknown document id {id}")))
    }

    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<Document>, SyncError> {
        db::list_documents_by_project(&self.pool, project_id).await
    }

    pub async fn list_needing_sync(&self) -> Result<Vec<Document>, SyncError> {
        db::list_documents_needing_sync(&self.pool).await
    }

    /// 로컬 백업 틱의 미러 쪽 절반. 기록된 `last_modified`를 반환합니다.
    pub async fn record_edit(
        &self,
        id: &str,
        project_id: &str,
        title: &str,
        content: &str,
        word_count: i64,
    ) -> Result<i64, SyncError> {
        db::record_local_edit(
            &self.pool,
            id,
            project_id,
            title,
            content,
            word_count,
            self.now_ms(),
        )
        .await
    }

    pub async fn mark_synced(&self, id: &str, pushed_last_modified: i64) -> Result<bool, SyncError> {
        db::mark_synced(&self.pool, id, pushed_last_modified, self.now_ms()).await
    }

    pub async fn mark_needs_sync(&self, id: &str) -> Result<bool, SyncError> {
        db::mark_needs_sync(&self.pool, id).await
    }

    // ── Draft ──

    /// Draft를 덮어쓰고 현재 시각을 찍습니다.
    pub async fn save_draft(&self, id: &str, title: &str, content: &str) -> Result<(), SyncError> {
        db::save_draft(&self.pool, id, title, content, self.now_ms()).await
    }

    pub async fn get_draft(&self, id: &str) -> Result<Option<Draft>, SyncError> {
        db::get_draft(&self.pool, id).await
    }

    pub async fn delete_draft(&self, id: &str) -> Result<bool, SyncError> {
        db::delete_draft(&self.pool, id).await
    }

    /// `now - max_age`보다 오래된 Draft를 지웁니다.
    pub async fn purge_drafts_older_than(&self, max_age: Duration) -> Result<u64, SyncError> {
        let cutoff = self.now_ms().saturating_sub(duration_ms(max_age));
        let purged = db::purge_drafts_before(&self.pool, cutoff).await?;
        if purged > 0 {
            tracing::info!(purged, "Purged stale drafts");
        }
        Ok(purged)
    }

    // ── auto 스냅샷 간격 ──

    pub async fn last_auto_version(&self, id: &str) -> Result<Option<i64>, SyncError> {
        db::get_last_auto_version(&self.pool, id).await
    }

    pub async fn claim_auto_version(&self, id: &str, interval: Duration) -> Result<bool, SyncError> {
        db::claim_auto_version(&self.pool, id, self.now_ms(), duration_ms(interval)).await
    }

    /// 이 기기의 로컬 데이터를 모두 지웁니다 (로그아웃 시).
    pub async fn clear_all(&self) -> Result<(), SyncError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM documents").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM drafts").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM auto_versions").execute(&mut *tx).await?;
        tx.commit().await?;
        tracing::info!("Cleared all local data");
        Ok(())
    }
}
