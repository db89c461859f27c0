//! # 서비스 모듈
//!
//! 저장소나 네트워크와 무관한 순수 유틸리티 함수들입니다.
//! - `text`: 리치 텍스트 본문의 단어 수 계산

pub mod text;

pub use text::*;
