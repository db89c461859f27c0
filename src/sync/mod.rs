//! # 동기화 엔진 모듈
//!
//! - `engine`: 로컬 미러를 원격으로 push하고, 원격 문서를 pull하며 충돌을 감지
//! - `locks`: 문서별 원격 쓰기 잠금 (문서당 동시 원격 쓰기 최대 1개)

pub mod engine;
pub mod locks;

pub use engine::*;
pub use locks::DocumentLocks;
