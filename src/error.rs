//! # 에러 처리 모듈
//!
//! 동기화 코어에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! 이 모듈의 핵심:
//! - `SyncError` 열거형(enum): 검증/네트워크/충돌/없음/저장소 에러를 하나의 타입으로 통합
//! - `is_retryable()`: 다음 디바운스 주기나 재연결 때 다시 시도할 만한 에러인지 판별
//!
//! 수동 작업(수동 저장, 수동 스냅샷)은 이 에러를 호출자에게 그대로 돌려주고,
//! 백그라운드 작업(자동 저장, auto 스냅샷, push)은 로그만 남깁니다.

use thiserror::Error;

/// `Result<T, SyncError>`의 축약형
pub type SyncResult<T> = Result<T, SyncError>;

/// 동기화 코어에서 발생할 수 있는 모든 에러 종류
#[derive(Debug, Error)]
pub enum SyncError {
    /// 알 수 없는 문서 ID에 대한 작업 등 잘못된 요청
    #[error("Validation error: {0}")]
    Validation(String),

    /// 원격 저장소에 닿을 수 없거나 시간 초과
    #[error("Network error: {0}")]
    Network(String),

    /// `pull`이 보고한, 해결되지 않은 로컬/원격 분기
    #[error("Conflict: local and remote copies of {document_id} have diverged")]
    Conflict { document_id: String },

    /// 원격 레코드가 없음 (예: 외부에서 삭제됨)
    #[error("Not found: {0}")]
    NotFound(String),

    /// 같은 문서에 대한 저장이 이미 진행 중
    #[error("Save already in progress for {0}")]
    SaveInProgress(String),

    /// 로컬 SQLite 오류
    /// #[from]: sqlx::Error → SyncError::Storage 자동 변환
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// 스키마 마이그레이션 실패
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl SyncError {
    /// 네트워크 문제처럼 시간이 지나면 풀릴 수 있는 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network(_) | SyncError::SaveInProgress(_))
    }

    /// 시간 초과를 네트워크 에러로 변환합니다.
    pub(crate) fn timed_out(operation: &str, document_id: &str) -> Self {
        SyncError::Network(format!("{operation} for {document_id} timed out"))
    }
}
