//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 로컬 SQLite와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! `store::LocalStore`가 이 모듈의 함수를 호출하여 DB 작업을 수행합니다.
//!
//! 각 하위 모듈:
//! - `documents`: 로컬 미러(documents 테이블) 쿼리
//! - `drafts`: 문서당 하나인 Draft 쿼리
//! - `auto_versions`: 문서별 마지막 auto 스냅샷 시각
//!
//! 스키마는 `migrations/local`에 있고, `connect()`가 연결 직후 적용합니다.

pub mod auto_versions;
pub mod documents;
pub mod drafts;

pub use auto_versions::*;
pub use documents::*;
pub use drafts::*;

use crate::error::SyncError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// 파일 기반 로컬 데이터베이스에 연결하고 마이그레이션을 실행합니다.
///
/// WAL 모드를 켜서 서로 다른 문서의 업서트가 동시에 들어와도
/// 읽기가 막히지 않게 합니다. 파일이 없으면 새로 만듭니다.
pub async fn connect(database_url: &str) -> Result<SqlitePool, SyncError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::debug!("Running local database migrations");
    sqlx::migrate!("./migrations/local").run(&pool).await?;

    Ok(pool)
}

/// 테스트와 임시 세션용 인메모리 데이터베이스
///
/// `sqlite::memory:`는 연결마다 별도의 DB가 되므로 연결을 1개로 고정하고,
/// 유휴 연결이 닫혀 데이터가 사라지지 않도록 타임아웃을 끕니다.
pub async fn connect_in_memory() -> Result<SqlitePool, SyncError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations/local").run(&pool).await?;

    Ok(pool)
}
