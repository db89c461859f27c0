//! # 동기화 설정(Configuration) 모듈
//!
//! 환경변수에서 동기화 코어의 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져오며, 모든 항목에 기본값이 있습니다.
//!
//! 설정 항목:
//! - `LOCAL_DATABASE_URL`: 기기 로컬 SQLite 경로
//! - `REMOTE_DATABASE_URL`: SQLite 기반 원격 저장소 경로 (실행 파일용)
//! - `LOCAL_BACKUP_DELAY_MS`: 마지막 입력 후 로컬 백업까지의 지연 (기본 1초)
//! - `REMOTE_COMMIT_DELAY_MS`: 마지막 입력 후 원격 저장까지의 지연 (기본 3초)
//! - `SAVED_DISPLAY_MS`: `saved` 상태를 보여주는 시간 (기본 2초)
//! - `AUTO_SNAPSHOT_INTERVAL_MINUTES`: auto 스냅샷 최소 간격 (기본 30분)
//! - `REMOTE_TIMEOUT_MS`: 원격 호출 1회당 제한 시간 (기본 10초)
//! - `DRAFT_MAX_AGE_DAYS`: 이보다 오래된 Draft는 정리 대상 (기본 7일)
//! - `SNAPSHOT_LIST_LIMIT`: 버전 목록 조회 최대 개수 (기본 100)

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 동기화 코어 전체 설정
///
/// 세션을 만들 때 한 번 읽어 `EditorSession`, `SyncEngine`, `VersionManager`에
/// 복제해서 넘깁니다. 전역 싱글톤이 아니므로 테스트마다 다른 값을 쓸 수 있습니다.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 로컬 SQLite 데이터베이스 URL (예: "sqlite:data/local.db")
    pub local_database_url: String,
    /// SQLite 원격 저장소 URL
    pub remote_database_url: String,
    pub local_backup_delay: Duration,
    pub remote_commit_delay: Duration,
    pub saved_display: Duration,
    pub auto_snapshot_interval: Duration,
    /// 원격 push/pull/스냅샷 호출 1회당 제한 시간
    pub remote_timeout: Duration,
    pub draft_max_age: Duration,
    pub snapshot_list_limit: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_database_url: "sqlite:data/local.db".to_string(),
            remote_database_url: "sqlite:data/remote.db".to_string(),
            local_backup_delay: Duration::from_millis(1_000),
            remote_commit_delay: Duration::from_millis(3_000),
            saved_display: Duration::from_millis(2_000),
            auto_snapshot_interval: Duration::from_secs(30 * 60),
            remote_timeout: Duration::from_secs(10),
            draft_max_age: Duration::from_secs(7 * 24 * 60 * 60),
            snapshot_list_limit: 100,
        }
    }
}

impl SyncConfig {
    /// 환경변수에서 설정값을 읽어 `SyncConfig`를 생성합니다.
    ///
    /// 필수 항목은 없습니다. 값이 없거나 숫자로 파싱되지 않으면 기본값을 사용합니다.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            local_database_url: env::var("LOCAL_DATABASE_URL")
                .unwrap_or(defaults.local_database_url),
            remote_database_url: env::var("REMOTE_DATABASE_URL")
                .unwrap_or(defaults.remote_database_url),
            local_backup_delay: env_millis("LOCAL_BACKUP_DELAY_MS")
                .unwrap_or(defaults.local_backup_delay),
            remote_commit_delay: env_millis("REMOTE_COMMIT_DELAY_MS")
                .unwrap_or(defaults.remote_commit_delay),
            saved_display: env_millis("SAVED_DISPLAY_MS").unwrap_or(defaults.saved_display),
            auto_snapshot_interval: env_scaled_secs("AUTO_SNAPSHOT_INTERVAL_MINUTES", 60)
                .unwrap_or(defaults.auto_snapshot_interval),
            remote_timeout: env_millis("REMOTE_TIMEOUT_MS").unwrap_or(defaults.remote_timeout),
            draft_max_age: env_scaled_secs("DRAFT_MAX_AGE_DAYS", 24 * 60 * 60)
                .unwrap_or(defaults.draft_max_age),
            snapshot_list_limit: env_parse("SNAPSHOT_LIST_LIMIT")
                .unwrap_or(defaults.snapshot_list_limit),
        }
    }
}

// 환경변수를 읽어 파싱합니다. 없거나 형식이 틀리면 None.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.trim().parse().ok()
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}

// 분/일 단위 값을 초로 바꿉니다. 너무 큰 값은 u64 최댓값에서 멈춥니다.
fn env_scaled_secs(key: &str, secs_per_unit: u64) -> Option<Duration> {
    env_parse::<u64>(key).map(|n| Duration::from_secs(n.saturating_mul(secs_per_unit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_editor_timings() {
        let config = SyncConfig::default();
        assert_eq!(config.local_backup_delay, Duration::from_secs(1));
        assert_eq!(config.remote_commit_delay, Duration::from_secs(3));
        assert_eq!(config.saved_display, Duration::from_secs(2));
        assert_eq!(config.auto_snapshot_interval, Duration::from_secs(1800));
        assert_eq!(config.remote_timeout, Duration::from_secs(10));
        assert_eq!(config.draft_max_age, Duration::from_secs(604_800));
        assert_eq!(config.snapshot_list_limit, 100);
    }

    #[test]
    fn env_overrides_and_bad_values_fall_back() {
        env::set_var("TECINDO_SYNC_TEST_MS", "250");
        env::set_var("TECINDO_SYNC_TEST_BAD", "soon");
        assert_eq!(
            env_millis("TECINDO_SYNC_TEST_MS"),
            Some(Duration::from_millis(250))
        );
        assert_eq!(env_millis("TECINDO_SYNC_TEST_BAD"), None);
        assert_eq!(env_parse::<u32>("TECINDO_SYNC_TEST_MISSING"), None);
    }

    #[test]
    fn huge_minute_and_day_values_saturate_instead_of_panicking() {
        env::set_var("TECINDO_SYNC_TEST_MINUTES", "45");
        env::set_var("TECINDO_SYNC_TEST_HUGE", u64::MAX.to_string());
        assert_eq!(
            env_scaled_secs("TECINDO_SYNC_TEST_MINUTES", 60),
            Some(Duration::from_secs(45 * 60))
        );
        assert_eq!(
            env_scaled_secs("TECINDO_SYNC_TEST_HUGE", 24 * 60 * 60),
            Some(Duration::from_secs(u64::MAX))
        );
    }
}
