//! # 버전 스냅샷 관리자 (Version Snapshot Manager)
//!
//! 문서의 불변 사본(스냅샷)을 원격 버전 저장소에 쌓습니다.
//! 항상 insert만 하며, 이전 스냅샷을 고치는 경로는 없습니다.
//!
//! ## 스냅샷 종류별 에러 처리
//! - `manual`: 사용자가 직접 누른 것이므로 성공/실패를 그대로 돌려줍니다.
//! - `auto`, `pre_ai`, `backup`: 백그라운드 작업이므로 실패해도 로그만 남깁니다
//!   (`create_snapshot_quietly`).
//!
//! ## auto 스냅샷 간격
//! 원격 저장이 성공할 때마다 `maybe_auto_snapshot()`이 불립니다.
//! 문서별 마지막 auto 시각(로컬 DB에 영속)에서 30분 이상 지났으면 하나 만듭니다.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::models::{Document, NewSnapshot, RestoredContent, Snapshot, SnapshotType};
use crate::remote::{call_with_timeout, SharedVersionStore};
use crate::store::LocalStore;
use std::time::Duration;

#[derive(Clone)]
pub struct VersionManager {
    remote: SharedVersionStore,
    store: LocalStore,
    timeout: Duration,
    list_limit: u32,
    auto_interval: Duration,
}

impl VersionManager {
    pub fn new(remote: SharedVersionStore, store: LocalStore, config: &SyncConfig) -> Self {
        Self {
            remote,
            store,
            timeout: config.remote_timeout,
            list_limit: config.snapshot_list_limit,
            auto_interval: config.auto_snapshot_interval,
        }
    }

    /// 스냅샷을 하나 만듭니다.
    ///
    /// 제목이나 본문이 비어 있으면 저장할 가치가 없으므로 `Validation` 에러를 돌려줍니다.
    pub async fn create_snapshot(
        &self,
        document_id: &str,
        project_id: &str,
        title: &str,
        content: &str,
        word_count: i64,
        snapshot_type: SnapshotType,
    ) -> SyncResult<Snapshot> {
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(SyncError::Validation(format!(
                "nothing to snapshot for {document_id}: title and content are required"
            )));
        }

        let request = NewSnapshot {
            document_id: document_id.to_string(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            word_count,
            snapshot_type,
        };

        let snapshot = call_with_timeout(
            self.timeout,
            "snapshot insert",
            document_id,
            self.remote.insert(&request),
        )
        .await?;

        tracing::info!(
            document_id,
            snapshot_id = %snapshot.id,
            snapshot_type = %snapshot_type,
            "Snapshot created"
        );
        Ok(snapshot)
    }

    /// 미러 전체를 스냅샷으로 남깁니다.
    pub async fn snapshot_document(
        &self,
        document: &Document,
        snapshot_type: SnapshotType,
    ) -> SyncResult<Snapshot> {
        self.create_snapshot(
            &document.id,
            &document.project_id,
            &document.title,
            &document.content,
            document.word_count,
            snapshot_type,
        )
        .await
    }

    /// 백그라운드용. 실패하면 로그만 남기고 None.
    pub async fn create_snapshot_quietly(
        &self,
        document: &Document,
        snapshot_type: SnapshotType,
    ) -> Option<Snapshot> {
        match self.snapshot_document(document, snapshot_type).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(
                    document_id = %document.id,
                    snapshot_type = %snapshot_type,
                    error = %e,
                    "Background snapshot failed"
                );
                None
            }
        }
    }

    /// 원격 저장 성공 직후 호출합니다. 간격이 찼으면 auto 스냅샷을 만듭니다.
    ///
    /// 간격 확인과 시각 갱신은 로컬 DB에서 한 번에 일어나므로, 저장 완료가
    /// 겹치더라도 auto 스냅샷은 한 번만 만들어집니다. 시각은 스냅샷 시도 전에
    /// 갱신되므로, 스냅샷이 실패해도 다음 시도는 30분 뒤입니다.
    pub async fn maybe_auto_snapshot(&self, document: &Document) -> Option<Snapshot> {
        match self
            .store
            .claim_auto_version(&document.id, self.auto_interval)
            .await
        {
            Ok(true) => self.create_snapshot_quietly(document, SnapshotType::Auto).await,
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(document_id = %document.id, error = %e, "Auto snapshot check failed");
                None
            }
        }
    }

    /// 최신순 스냅샷 목록. 다시 부르면 처음부터 다시 조회합니다.
    pub async fn list_snapshots(&self, document_id: &str) -> SyncResult<Vec<Snapshot>> {
        call_with_timeout(
            self.timeout,
            "snapshot list",
            document_id,
            self.remote.list(document_id, self.list_limit),
        )
        .await
    }

    /// 스냅샷의 제목/본문을 돌려줄 뿐, 아무것도 쓰지 않습니다.
    /// 복원 전 상태를 따로 스냅샷으로 남기지도 않습니다.
    pub fn restore(&self, snapshot: &Snapshot) -> RestoredContent {
        RestoredContent {
            title: snapshot.title.clone(),
            content: snapshot.content.clone(),
        }
    }

    /// 사용자가 요청한 영구 삭제
    pub async fn delete(&self, snapshot_id: &str) -> SyncResult<()> {
        call_with_timeout(
            self.timeout,
            "snapshot delete",
            snapshot_id,
            self.remote.delete(snapshot_id),
        )
        .await?;
        tracing::info!(snapshot_id, "Snapshot deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::remote::MemoryRemote;
    use std::sync::Arc;

    struct Fixture {
        manager: VersionManager,
        remote: Arc<MemoryRemote>,
        clock: Arc<ManualClock>,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let remote = Arc::new(MemoryRemote::with_clock(clock.clone()));
        let store = LocalStore::open_in_memory(clock.clone()).await.unwrap();
        let manager = VersionManager::new(remote.clone(), store, &SyncConfig::default());
        Fixture {
            manager,
            remote,
            clock,
        }
    }

    fn doc() -> Document {
        Document {
            id: "doc".into(),
            project_id: "p".into(),
            title: "1장".into(),
            content: "그날 밤".into(),
            word_count: 2,
            last_modified: 0,
            synced_at: None,
            needs_sync: false,
        }
    }

    #[tokio::test]
    async fn snapshots_are_inserted_and_listed_newest_first() {
        let f = fixture().await;
        let first = f.manager.snapshot_document(&doc(), SnapshotType::Manual).await.unwrap();
        f.clock.advance(Duration::from_secs(1));
        let second = f.manager.snapshot_document(&doc(), SnapshotType::PreAi).await.unwrap();

        let listed = f.manager.list_snapshots("doc").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
        // 다시 조회해도 같은 결과
        assert_eq!(f.manager.list_snapshots("doc").await.unwrap(), listed);
    }

    #[tokio::test]
    async fn empty_documents_are_not_snapshotted() {
        let f = fixture().await;
        let mut empty = doc();
        empty.content = "  ".into();
        let err = f
            .manager
            .snapshot_document(&empty, SnapshotType::Manual)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(f.remote.snapshots("doc").is_empty());
    }

    #[tokio::test]
    async fn manual_failures_surface_but_background_ones_do_not() {
        let f = fixture().await;
        f.remote.set_unreachable(true);

        let manual = f.manager.snapshot_document(&doc(), SnapshotType::Manual).await;
        assert!(matches!(manual, Err(SyncError::Network(_))));

        let quiet = f.manager.create_snapshot_quietly(&doc(), SnapshotType::PreAi).await;
        assert!(quiet.is_none());
    }

    #[tokio::test]
    async fn auto_snapshots_respect_the_thirty_minute_cadence() {
        let f = fixture().await;

        assert!(f.manager.maybe_auto_snapshot(&doc()).await.is_some());
        f.clock.advance(Duration::from_secs(29 * 60));
        assert!(f.manager.maybe_auto_snapshot(&doc()).await.is_none());
        f.clock.advance(Duration::from_secs(60));
        assert!(f.manager.maybe_auto_snapshot(&doc()).await.is_some());

        let autos = f
            .remote
            .snapshots("doc")
            .into_iter()
            .filter(|s| s.snapshot_type == SnapshotType::Auto)
            .count();
        assert_eq!(autos, 2);
    }

    #[tokio::test]
    async fn restore_is_a_pure_read() {
        let f = fixture().await;
        let snapshot = f.manager.snapshot_document(&doc(), SnapshotType::Manual).await.unwrap();

        let restored = f.manager.restore(&snapshot);
        assert_eq!(restored.title, "1장");
        assert_eq!(restored.content, "그날 밤");
        assert_eq!(f.remote.snapshots("doc").len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_snapshot() {
        let f = fixture().await;
        let keep = f.manager.snapshot_document(&doc(), SnapshotType::Manual).await.unwrap();
        let gone = f.manager.snapshot_document(&doc(), SnapshotType::Backup).await.unwrap();

        f.manager.delete(&gone.id).await.unwrap();
        let remaining = f.manager.list_snapshots("doc").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
        assert!(matches!(
            f.manager.delete(&gone.id).await,
            Err(SyncError::NotFound(_))
        ));
    }
}
