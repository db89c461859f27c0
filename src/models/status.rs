use serde::Serialize;

/// 에디터에 보여주는 저장 상태
///
/// ```text
/// idle ─편집→ typing ─원격 저장 타이머→ saving ─┬→ saved ─2초→ idle
///                                              └→ error (다음 편집까지 유지)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Typing,
    Saving,
    Saved,
    Error(String),
}

impl SaveStatus {
    pub fn is_saving(&self) -> bool {
        matches!(self, SaveStatus::Saving)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SaveStatus::Error(_))
    }
}
