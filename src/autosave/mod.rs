//! # 자동 저장 (Autosave)
//!
//! 편집 세션 하나를 담당하는 `EditorSession`과 그 내부 상태입니다.
//!
//! ## 타이머 두 개
//! 편집이 들어올 때마다 두 타이머를 다시 겁니다.
//! - 로컬 백업 (1초): 버퍼를 Draft와 로컬 미러에 씀
//! - 원격 저장 (3초): `SyncEngine::commit()`으로 원격에 씀. 오프라인이면 건너뜀
//!
//! 모든 타이머는 문서 단위 `CancellationToken`의 자식 토큰을 가지므로,
//! 다른 문서로 전환하면 이전 문서의 타이머가 한 번에 취소됩니다.
//! 그래도 이미 울린 타이머는 실행 시점에 문서 ID와 토큰을 다시 확인합니다.

mod session;
mod state;

pub use session::{EditorSession, OpenedDocument, SaveOutcome};
pub use state::EditorBuffer;
