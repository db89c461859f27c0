//! # SQLite 기반 원격 저장소
//!
//! 별도의 SQLite 파일을 "원격" 저장소로 사용하는 구현입니다.
//! 여러 기기(프로세스)가 같은 파일을 가리키면 호스팅된 저장소처럼 동작하므로,
//! 실행 파일과 통합 테스트에서 실제 동기화 흐름을 확인할 수 있습니다.
//!
//! 스키마는 `migrations/remote`에 있습니다.

use super::{RemoteDocumentStore, RemoteVersionStore};
use crate::clock::{SharedClock, SystemClock};
use crate::error::SyncError;
use crate::models::{DocumentUpdate, NewDocument, NewSnapshot, RemoteDocument, Snapshot};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SqliteRemote {
    pool: SqlitePool,
    clock: SharedClock,
}

impl SqliteRemote {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    /// 원격 DB에 연결하고 원격 스키마 마이그레이션을 실행합니다.
    pub async fn connect(database_url: &str) -> Result<Self, SyncError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::debug!("Running remote store migrations");
        sqlx::migrate!("./migrations/remote").run(&pool).await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RemoteDocumentStore for SqliteRemote {
    async fn update(&self, id: &str, update: &DocumentUpdate) -> Result<(), SyncError> {
        // word_count가 None이면 COALESCE로 기존 값을 유지합니다.
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET title = ?, content = ?, word_count = COALESCE(?, word_count), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.content)
        .bind(update.word_count)
        .bind(update.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::NotFound(format!("remote document {id}")));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<RemoteDocument>, SyncError> {
        let doc = sqlx::query_as::<_, RemoteDocument>(
            r#"
            SELECT id, project_id, title, content, word_count, updated_at
            FROM documents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doc)
    }

    async fn insert(&self, document: &NewDocument) -> Result<RemoteDocument, SyncError> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, project_id, title, content, word_count, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.project_id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.word_count)
        .bind(self.clock.now_ms())
        .execute(&self.pool)
        .await?;

        RemoteDocumentStore::get(self, &document.id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("remote document {}", document.id)))
    }
}

#[async_trait]
impl RemoteVersionStore for SqliteRemote {
    async fn insert(&self, snapshot: &NewSnapshot) -> Result<Snapshot, SyncError> {
        let id = uuid::Uuid::now_v7().to_string();

        sqlx::query(
            r#"
            INSERT INTO versions (id, document_id, project_id, title, content,
                                  word_count, snapshot_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&snapshot.document_id)
        .bind(&snapshot.project_id)
        .bind(&snapshot.title)
        .bind(&snapshot.content)
        .bind(snapshot.word_count)
        .bind(snapshot.snapshot_type)
        .bind(self.clock.now_ms())
        .execute(&self.pool)
        .await?;

        let created = sqlx::query_as::<_, Snapshot>(
            r#"
            SELECT id, document_id, project_id, title, content, word_count,
                   snapshot_type, created_at
            FROM versions
            WHERE id = ?
            "#,
        )
        .bind(&id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list(&self, document_id: &str, limit: u32) -> Result<Vec<Snapshot>, SyncError> {
        // 같은 밀리초에 만든 스냅샷은 rowid(삽입 순서)로 정렬합니다.
        let versions = sqlx::query_as::<_, Snapshot>(
            r#"
            SELECT id, document_id, project_id, title, content, word_count,
                   snapshot_type, created_at
            FROM versions
            WHERE document_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(document_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(versions)
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let result = sqlx::query("DELETE FROM versions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::NotFound(format!("snapshot {id}")));
        }
        Ok(())
    }
}
