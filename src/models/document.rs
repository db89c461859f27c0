use serde::{Deserialize, Serialize};

/// 로컬 미러. 로컬 SQLite의 `documents` 테이블 한 행에 대응합니다.
///
/// `needs_sync`는 원격에 아직 확인되지 않은 편집이 있을 때만 true입니다.
/// 오프라인 편집, 로컬 백업, push 실패 때 켜지고 push 성공 때 꺼집니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub content: String,
    pub word_count: i64,
    /// 기기 시계 기준 마지막 수정 시각 (밀리초)
    pub last_modified: i64,
    /// 마지막 push 성공 시각 (밀리초). 한 번도 올라가지 않았으면 None
    pub synced_at: Option<i64>,
    pub needs_sync: bool,
}

impl Document {
    /// 원격 레코드로 깨끗한(needs_sync = false) 미러를 만듭니다.
    pub fn from_remote(remote: &RemoteDocument, synced_at: i64) -> Self {
        Self {
            id: remote.id.clone(),
            project_id: remote.project_id.clone(),
            title: remote.title.clone(),
            content: remote.content.clone(),
            word_count: remote.word_count,
            last_modified: remote.updated_at,
            synced_at: Some(synced_at),
            needs_sync: false,
        }
    }

    /// push 때 원격으로 보낼 내용
    pub fn to_update(&self, updated_at: i64) -> DocumentUpdate {
        DocumentUpdate {
            title: self.title.clone(),
            content: self.content.clone(),
            word_count: Some(self.word_count),
            updated_at,
        }
    }
}

/// 저장되지 않은 편집의 백업. 문서당 하나만 존재하며 덮어씁니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Draft {
    pub document_id: String,
    pub title: String,
    pub content: String,
    pub timestamp: i64,
}

/// 원격(권한 있는) 저장소의 문서
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RemoteDocument {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub content: String,
    pub word_count: i64,
    /// 원격 저장소가 쓰기마다 기록하는 시각 (밀리초)
    pub updated_at: i64,
}

/// 원격 `update(id, ...)` 요청 본문
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub title: String,
    pub content: String,
    /// None이면 원격의 단어 수를 그대로 둡니다.
    pub word_count: Option<i64>,
    pub updated_at: i64,
}

/// 원격 `insert(...)` 요청 본문. ID는 클라이언트가 UUIDv7으로 만듭니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub content: String,
    pub word_count: i64,
}
