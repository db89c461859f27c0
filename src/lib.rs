//! # tecindo-sync: 로컬 우선 문서 동기화 코어
//!
//! 리치 텍스트 에디터 세션이 사용하는 라이브러리입니다.
//! 편집 중인 내용을 오프라인에서도 잃지 않도록 기기 로컬 SQLite에 먼저 쓰고,
//! 디바운스된 자동 저장으로 원격 저장소와 동기화하며, 불변 버전 스냅샷을 남깁니다.
//!
//! 데이터 흐름:
//! ```text
//! 편집 → EditorSession ─→ LocalStore (항상)
//!                      └→ SyncEngine → 원격 문서 저장소 (온라인일 때)
//!                                   └→ VersionManager → 원격 버전 저장소 (30분 간격)
//! ConnectivityMonitor ─(오프라인→온라인)→ SyncEngine::auto_sync()
//! ```
//!
//! HTTP 서버나 와이어 포맷은 갖고 있지 않습니다. 원격 저장소는
//! `remote` 모듈의 trait으로 주입합니다.

pub mod autosave;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod store;
pub mod sync;
pub mod versions;

pub use autosave::{EditorBuffer, EditorSession, OpenedDocument, SaveOutcome};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::SyncConfig;
pub use connectivity::{spawn_auto_sync, ConnectivityEvent, ConnectivityMonitor};
pub use error::{SyncError, SyncResult};
pub use store::LocalStore;
pub use sync::{Conflict, PullOutcome, PushFailure, SyncEngine, SyncReport};
pub use versions::VersionManager;
