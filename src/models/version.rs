use serde::{Deserialize, Serialize};
use std::fmt;

/// 스냅샷을 만든 계기
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SnapshotType {
    /// 사용자가 직접 저장. 성공/실패를 사용자에게 알립니다.
    Manual,
    /// 원격 저장 성공 후 30분 간격으로 자동 생성
    Auto,
    /// AI 생성 직전
    PreAi,
    Backup,
}

impl SnapshotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotType::Manual => "manual",
            SnapshotType::Auto => "auto",
            SnapshotType::PreAi => "pre_ai",
            SnapshotType::Backup => "backup",
        }
    }
}

impl fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 불변 스냅샷. 한 번 쓰이면 수정되지 않고, 사용자가 명시적으로 지울 때만 사라집니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Snapshot {
    pub id: String,
    pub document_id: String,
    pub project_id: String,
    pub title: String,
    pub content: String,
    pub word_count: i64,
    pub snapshot_type: SnapshotType,
    /// 원격 저장소가 부여하는 생성 시각 (밀리초)
    pub created_at: i64,
}

/// 원격 버전 저장소 `insert` 요청 본문
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSnapshot {
    pub document_id: String,
    pub project_id: String,
    pub title: String,
    pub content: String,
    pub word_count: i64,
    pub snapshot_type: SnapshotType,
}

/// `restore`가 돌려주는 내용. 버퍼에 올리는 일은 호출자가 합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredContent {
    pub title: String,
    pub content: String,
}
