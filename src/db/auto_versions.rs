use crate::error::SyncError;
use sqlx::SqlitePool;

pub async fn get_last_auto_version(
    pool: &SqlitePool,
    document_id: &str,
) -> Result<Option<i64>, SyncError> {
    let at = sqlx::query_scalar(
        "SELECT last_auto_version_at FROM auto_versions WHERE document_id = ?",
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;

    Ok(at)
}

/// 마지막 auto 스냅샷 이후 `interval_ms`가 지났으면 시각을 `now_ms`로 갱신하고 true.
/// 기록이 없으면 새로 만들고 true. 아직 간격이 안 찼으면 아무것도 바꾸지 않고 false.
///
/// 확인과 갱신이 한 문장이므로, 저장 완료가 겹쳐도 한쪽만 true를 받습니다.
pub async fn claim_auto_version(
    pool: &SqlitePool,
    document_id: &str,
    now_ms: i64,
    interval_ms: i64,
) -> Result<bool, SyncError> {
    let result = sqlx::query(
        r#"
        INSERT INTO auto_versions (document_id, last_auto_version_at)
        VALUES (?, ?)
        ON CONFLICT(document_id) DO UPDATE SET
            last_auto_version_at = excluded.last_auto_version_at
        WHERE auto_versions.last_auto_version_at <= ?
        "#,
    )
    .bind(document_id)
    .bind(now_ms)
    .bind(now_ms.saturating_sub(interval_ms))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
