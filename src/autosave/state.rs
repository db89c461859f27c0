//! 세션 내부 상태. 모든 필드는 `std::sync::Mutex` 안에서만 다루며,
//! 잠금을 쥔 채로 `.await` 하지 않습니다.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// 에디터에 열려 있는 내용
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorBuffer {
    pub document_id: String,
    pub project_id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// 로컬 백업 (기본 1초)
    Backup,
    /// 원격 저장 (기본 3초)
    Commit,
    /// saved → idle (기본 2초)
    Idle,
}

#[derive(Debug)]
pub(crate) struct ActiveDocument {
    pub buffer: EditorBuffer,
    /// 문서 단위 토큰. 문서를 떠나면 취소되고, 모든 타이머 토큰은 이것의 자식입니다.
    pub owner: CancellationToken,
    pub backup_timer: Option<CancellationToken>,
    pub commit_timer: Option<CancellationToken>,
    pub idle_timer: Option<CancellationToken>,
    /// 마지막 로컬 백업 이후 편집이 있었는지
    pub dirty: bool,
    pub saving: bool,
    /// saving 중에 원격 저장 타이머가 울렸으면 true. 끝나고 한 번 더 저장합니다.
    pub pending_commit: bool,
    pub edit_seq: u64,
}

impl ActiveDocument {
    pub fn new(buffer: EditorBuffer) -> Self {
        Self {
            buffer,
            owner: CancellationToken::new(),
            backup_timer: None,
            commit_timer: None,
            idle_timer: None,
            dirty: false,
            saving: false,
            pending_commit: false,
            edit_seq: 0,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.buffer.document_id
    }

    pub fn cancel_timer(&mut self, kind: TimerKind) {
        let slot = match kind {
            TimerKind::Backup => &mut self.backup_timer,
            TimerKind::Commit => &mut self.commit_timer,
            TimerKind::Idle => &mut self.idle_timer,
        };
        if let Some(timer) = slot.take() {
            timer.cancel();
        }
    }

    pub fn cancel_all_timers(&mut self) {
        self.cancel_timer(TimerKind::Backup);
        self.cancel_timer(TimerKind::Commit);
        self.cancel_timer(TimerKind::Idle);
    }
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub active: Option<ActiveDocument>,
    pub last_saved_at: Option<i64>,
}

impl SessionState {
    /// 타이머나 저장 완료 콜백이 아직 이 문서의 주인인지 확인합니다.
    /// 문서 ID가 같고 문서 토큰이 취소되지 않았을 때만 Some.
    pub fn owned_mut(
        &mut self,
        document_id: &str,
        owner: &CancellationToken,
    ) -> Option<&mut ActiveDocument> {
        if owner.is_cancelled() {
            return None;
        }
        self.active
            .as_mut()
            .filter(|active| active.document_id() == document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(id: &str) -> EditorBuffer {
        EditorBuffer {
            document_id: id.to_string(),
            project_id: "p".to_string(),
            title: String::new(),
            content: String::new(),
        }
    }

    #[test]
    fn ownership_requires_matching_id_and_live_token() {
        let active = ActiveDocument::new(buffer("a"));
        let owner = active.owner.clone();
        let mut state = SessionState {
            active: Some(active),
            last_saved_at: None,
        };

        assert!(state.owned_mut("a", &owner).is_some());
        assert!(state.owned_mut("b", &owner).is_none());

        owner.cancel();
        assert!(state.owned_mut("a", &owner).is_none());
    }

    #[test]
    fn cancelling_the_owner_cancels_child_timers() {
        let mut active = ActiveDocument::new(buffer("a"));
        let timer = active.owner.child_token();
        active.commit_timer = Some(timer.clone());

        active.owner.cancel();
        assert!(timer.is_cancelled());

        active.cancel_all_timers();
        assert!(active.commit_timer.is_none());
    }
}
