//! # 로컬 미러(documents) 쿼리 모듈
//!
//! 이 파일에는 로컬 `documents` 테이블에 대한 쿼리 함수들이 정의되어 있습니다.
//!
//! 모든 함수는 `async`이며 `SqlitePool`을 받아 데이터베이스와 상호작용합니다.
//! 문서는 ID 단위로만 쓰이므로 문서끼리의 잠금은 필요 없습니다.

use crate::error::SyncError;
use crate::models::Document;
use sqlx::SqlitePool;

/// 문서를 ID 기준으로 업서트(upsert)합니다.
///
/// 같은 값으로 여러 번 호출해도 결과가 같습니다 (멱등).
/// 이 기기에서는 한 문서에 쓰는 주체가 하나뿐이므로 마지막 쓰기가 이깁니다.
pub async fn put_document(pool: &SqlitePool, doc: &Document) -> Result<(), SyncError> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, project_id, title, content, word_count,
                               last_modified, synced_at, needs_sync)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            project_id = excluded.project_id,
            title = excluded.title,
            content = excluded.content,
            word_count = excluded.word_count,
            last_modified = excluded.last_modified,
            synced_at = excluded.synced_at,
            needs_sync = excluded.needs_sync
        "#,
    )
    .bind(&doc.id)
    .bind(&doc.project_id)
    .bind(&doc.title)
    .bind(&doc.content)
    .bind(doc.word_count)
    .bind(doc.last_modified)
    .bind(doc.synced_at)
    .bind(doc.needs_sync)
    .execute(pool)
    .await?;

    Ok(())
}

/// ID로 단일 문서를 조회합니다.
///
/// # 반환값
/// - `Ok(Some(Document))`: 미러가 있는 경우
/// - `Ok(None)`: 이 기기에 아직 미러가 없는 경우
pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<Option<Document>, SyncError> {
    let doc = sqlx::query_as::<_, Document>(
        r#"
        SELECT id, project_id, title, content, word_count,
               last_modified, synced_at, needs_sync
        FROM documents
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(doc)
}

/// 프로젝트에 속한 모든 미러를 최근 수정 순으로 조회합니다.
pub async fn list_documents_by_project(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<Document>, SyncError> {
    let docs = sqlx::query_as::<_, Document>(
        r#"
        SELECT id, project_id, title, content, word_count,
               last_modified, synced_at, needs_sync
        FROM documents
        WHERE project_id = ?
        ORDER BY last_modified DESC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(docs)
}

/// `needs_sync = 1`인 문서를 오래 기다린 순서대로 조회합니다.
pub async fn list_documents_needing_sync(pool: &SqlitePool) -> Result<Vec<Document>, SyncError> {
    let docs = sqlx::query_as::<_, Document>(
        r#"
        SELECT id, project_id, title, content, word_count,
               last_modified, synced_at, needs_sync
        FROM documents
        WHERE needs_sync = 1
        ORDER BY last_modified ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(docs)
}

/// 로컬 백업 틱: 버퍼 내용을 미러에 쓰고 `needs_sync`를 켭니다.
///
/// 미러가 없으면 새로 만듭니다. `last_modified`는 문서별로 단조 증가하도록
/// 기존 값보다 최소 1ms 크게 기록합니다. 같은 밀리초 안에 두 번 백업되어도
/// `mark_synced`가 나중 편집을 놓치지 않게 하기 위함입니다.
///
/// # 반환값
/// 실제로 기록된 `last_modified`
pub async fn record_local_edit(
    pool: &SqlitePool,
    id: &str,
    project_id: &str,
    title: &str,
    content: &str,
    word_count: i64,
    now_ms: i64,
) -> Result<i64, SyncError> {
    let last_modified: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO documents (id, project_id, title, content, word_count,
                               last_modified, synced_at, needs_sync)
        VALUES (?, ?, ?, ?, ?, ?, NULL, 1)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            word_count = excluded.word_count,
            last_modified = MAX(excluded.last_modified, documents.last_modified + 1),
            needs_sync = 1
        RETURNING last_modified
        "#,
    )
    .bind(id)
    .bind(project_id)
    .bind(title)
    .bind(content)
    .bind(word_count)
    .bind(now_ms)
    .fetch_one(pool)
    .await?;

    Ok(last_modified)
}

/// push 성공 후 `needs_sync`를 끄고 `synced_at`을 기록합니다.
///
/// 올려 보낸 시점의 `last_modified`와 현재 값이 같을 때만 플래그를 끕니다.
/// push가 진행되는 동안 새 편집이 백업되었다면 그 편집은 아직 원격에 없으므로
/// `needs_sync`를 그대로 둡니다.
///
/// # 반환값
/// - `Ok(true)`: 플래그를 껐음
/// - `Ok(false)`: 그 사이 새 편집이 있어 플래그를 유지함
pub async fn mark_synced(
    pool: &SqlitePool,
    id: &str,
    pushed_last_modified: i64,
    synced_at: i64,
) -> Result<bool, SyncError> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET needs_sync = 0, synced_at = ?
        WHERE id = ? AND last_modified = ?
        "#,
    )
    .bind(synced_at)
    .bind(id)
    .bind(pushed_last_modified)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 원격 저장 실패 시 `needs_sync`를 다시 켭니다.
pub async fn mark_needs_sync(pool: &SqlitePool, id: &str) -> Result<bool, SyncError> {
    let result = sqlx::query("UPDATE documents SET needs_sync = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use pretty_assertions::assert_eq;

    fn sample(id: &str, project_id: &str, needs_sync: bool) -> Document {
        Document {
            id: id.to_string(),
            project_id: project_id.to_string(),
            title: "1장".to_string(),
            content: "첫 문장".to_string(),
            word_count: 2,
            last_modified: 1_000,
            synced_at: None,
            needs_sync,
        }
    }

    #[tokio::test]
    async fn put_is_an_idempotent_upsert() {
        let pool = connect_in_memory().await.unwrap();
        let mut doc = sample("doc-1", "p-1", false);

        put_document(&pool, &doc).await.unwrap();
        put_document(&pool, &doc).await.unwrap();
        assert_eq!(get_document(&pool, "doc-1").await.unwrap(), Some(doc.clone()));

        doc.title = "고친 제목".to_string();
        put_document(&pool, &doc).await.unwrap();
        assert_eq!(get_document(&pool, "doc-1").await.unwrap(), Some(doc));
        assert_eq!(list_documents_by_project(&pool, "p-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lists_filter_by_project_and_flag() {
        let pool = connect_in_memory().await.unwrap();
        put_document(&pool, &sample("a", "p-1", true)).await.unwrap();
        put_document(&pool, &sample("b", "p-1", false)).await.unwrap();
        put_document(&pool, &sample("c", "p-2", true)).await.unwrap();

        let in_p1 = list_documents_by_project(&pool, "p-1").await.unwrap();
        assert_eq!(in_p1.len(), 2);

        let mut pending: Vec<String> = list_documents_needing_sync(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        pending.sort();
        assert_eq!(pending, vec!["a".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn local_edits_are_strictly_increasing() {
        let pool = connect_in_memory().await.unwrap();
        let first = record_local_edit(&pool, "d", "p", "t", "a b", 2, 5_000)
            .await
            .unwrap();
        // 같은 밀리초에 다시 백업
        let second = record_local_edit(&pool, "d", "p", "t", "a b c", 3, 5_000)
            .await
            .unwrap();
        assert_eq!(first, 5_000);
        assert_eq!(second, 5_001);

        let doc = get_document(&pool, "d").await.unwrap().unwrap();
        assert!(doc.needs_sync);
        assert_eq!(doc.word_count, 3);
    }

    #[tokio::test]
    async fn mark_synced_keeps_flag_when_edited_meanwhile() {
        let pool = connect_in_memory().await.unwrap();
        let pushed = record_local_edit(&pool, "d", "p", "t", "old", 1, 1_000)
            .await
            .unwrap();
        record_local_edit(&pool, "d", "p", "t", "newer", 1, 2_000)
            .await
            .unwrap();

        assert!(!mark_synced(&pool, "d", pushed, 3_000).await.unwrap());
        assert!(get_document(&pool, "d").await.unwrap().unwrap().needs_sync);

        assert!(mark_synced(&pool, "d", 2_000, 3_000).await.unwrap());
        let doc = get_document(&pool, "d").await.unwrap().unwrap();
        assert!(!doc.needs_sync);
        assert_eq!(doc.synced_at, Some(3_000));
    }
}
