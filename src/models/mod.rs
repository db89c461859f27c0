//! # 데이터 모델 모듈
//!
//! 동기화 코어에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! - `document`: 로컬 미러(Document), Draft, 원격 문서와 요청 본문
//! - `version`: 스냅샷(Snapshot)과 스냅샷 종류
//! - `status`: 에디터 저장 상태(SaveStatus)
//!
//! `pub use X::*;`로 재공개하므로 `crate::models::Document`처럼 짧게 접근할 수 있습니다.

pub mod document;
pub mod status;
pub mod version;

pub use document::*;
pub use status::*;
pub use version::*;
