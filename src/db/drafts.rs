//! # Draft 쿼리 모듈
//!
//! Draft는 커밋된 미러와 별개로, 탭이 닫히거나 앱이 죽었을 때 복구하기 위한
//! 문서당 하나짜리 백업입니다. 로컬 백업 틱마다 같은 행을 덮어씁니다.

use crate::error::SyncError;
use crate::models::Draft;
use sqlx::SqlitePool;

/// 문서의 Draft를 덮어씁니다 (없으면 생성).
pub async fn save_draft(
    pool: &SqlitePool,
    document_id: &str,
    title: &str,
    content: &str,
    timestamp: i64,
) -> Result<(), SyncError> {
    sqlx::query(
        r#"
        INSERT INTO drafts (document_id, title, content, timestamp)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(document_id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            timestamp = excluded.timestamp
        "#,
    )
    .bind(document_id)
    .bind(title)
    .bind(content)
    .bind(timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_draft(pool: &SqlitePool, document_id: &str) -> Result<Option<Draft>, SyncError> {
    let draft = sqlx::query_as::<_, Draft>(
        "SELECT document_id, title, content, timestamp FROM drafts WHERE document_id = ?",
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;

    Ok(draft)
}

/// # 반환값
/// 지운 Draft가 있었으면 true
pub async fn delete_draft(pool: &SqlitePool, document_id: &str) -> Result<bool, SyncError> {
    let result = sqlx::query("DELETE FROM drafts WHERE document_id = ?")
        .bind(document_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// `cutoff`(밀리초)보다 오래된 Draft를 모두 지우고, 지운 개수를 반환합니다.
pub async fn purge_drafts_before(pool: &SqlitePool, cutoff: i64) -> Result<u64, SyncError> {
    let result = sqlx::query("DELETE FROM drafts WHERE timestamp < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn draft_is_overwritten_in_place() {
        let pool = connect_in_memory().await.unwrap();
        save_draft(&pool, "d", "T1", "C1", 10).await.unwrap();
        save_draft(&pool, "d", "T2", "C2", 20).await.unwrap();

        let draft = get_draft(&pool, "d").await.unwrap().unwrap();
        assert_eq!(draft.title, "T2");
        assert_eq!(draft.content, "C2");
        assert_eq!(draft.timestamp, 20);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drafts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn purge_only_removes_older_drafts() {
        let pool = connect_in_memory().await.unwrap();
        save_draft(&pool, "old", "t", "c", 100).await.unwrap();
        save_draft(&pool, "new", "t", "c", 500).await.unwrap();

        assert_eq!(purge_drafts_before(&pool, 300).await.unwrap(), 1);
        assert!(get_draft(&pool, "old").await.unwrap().is_none());
        assert!(get_draft(&pool, "new").await.unwrap().is_some());

        assert!(delete_draft(&pool, "new").await.unwrap());
        assert!(!delete_draft(&pool, "new").await.unwrap());
    }
}
