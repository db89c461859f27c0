//! # tecindo-sync 실행 파일 진입점
//!
//! 로컬에 밀려 있는 문서(`needs_sync = true`)를 원격 저장소로 한 번에 밀어 올리는
//! 작은 도구입니다. 에디터를 열지 않고도 오프라인 동안 쌓인 편집을 동기화할 수 있습니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. 설정 로딩
//! 4. 로컬 저장소와 SQLite 원격 저장소 연결 (마이그레이션 포함)
//! 5. `auto_sync()` 한 번 실행
//! 6. 오래된 Draft 정리
//! 7. 결과 리포트를 JSON으로 출력

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tecindo_sync::remote::SqliteRemote;
use tecindo_sync::{LocalStore, SyncConfig, SyncEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅 초기화 ──
    // RUST_LOG가 없으면 이 크레이트만 debug 레벨로 출력합니다.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tecindo_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = SyncConfig::from_env();
    tracing::info!(
        local = %config.local_database_url,
        remote = %config.remote_database_url,
        "Starting tecindo-sync flush"
    );

    // ── 4단계: 저장소 연결 ──
    // SQLite 파일이 들어갈 디렉토리가 없으면 먼저 만듭니다.
    // 두 연결 모두 내부에서 마이그레이션을 실행합니다.
    ensure_parent_dir(&config.local_database_url).await?;
    ensure_parent_dir(&config.remote_database_url).await?;
    let store = LocalStore::open(&config.local_database_url).await?;
    let remote = Arc::new(SqliteRemote::connect(&config.remote_database_url).await?);

    // ── 5단계: 밀린 문서 push ──
    let engine = SyncEngine::new(store.clone(), remote, config.remote_timeout);
    let report = engine.auto_sync().await;

    // ── 6단계: 오래된 Draft 정리 ──
    store.purge_drafts_older_than(config.draft_max_age).await?;

    // ── 7단계: 결과 출력 ──
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.success() {
        anyhow::bail!("{} document(s) failed to sync", report.errors.len());
    }
    Ok(())
}

/// "sqlite:data/local.db" 같은 URL에서 파일 경로를 꺼내 상위 디렉토리를 만듭니다.
/// 인메모리 DB처럼 상위 디렉토리가 없으면 아무것도 하지 않습니다.
async fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
            tracing::info!("Created database directory: {}", parent.display());
        }
    }
    Ok(())
}
