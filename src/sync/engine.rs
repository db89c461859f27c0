//! # 동기화 엔진 (Sync Engine)
//!
//! 로컬에서 수정된 문서를 원격 저장소로 올리고(push), 원격 문서를 로컬 미러로
//! 내려받습니다(pull).
//!
//! ## push
//! `needs_sync = true`인 문서를 하나씩 올립니다. 한 문서가 실패해도 에러를
//! 기록하고 다음 문서로 넘어갑니다. 문서들 사이의 원자성은 없습니다.
//!
//! ## pull과 충돌 감지
//! ```text
//! conflict = local.needs_sync && local.last_modified > remote.updated_at
//! ```
//! 충돌이면 로컬을 건드리지 않고 양쪽 내용을 모두 돌려줍니다. 병합은 하지 않습니다.
//! 충돌이 아니면 원격 내용으로 미러를 덮어씁니다.
//!
//! 이 판정은 기기 시계와 서버 시계가 대략 맞는다는 가정에 기댑니다.

use super::locks::DocumentLocks;
use crate::error::{SyncError, SyncResult};
use crate::models::{Document, NewDocument, RemoteDocument};
use crate::remote::{call_with_timeout, SharedDocumentStore};
use crate::services::word_count_i64;
use crate::store::LocalStore;
use serde::Serialize;
use std::time::Duration;

/// push 한 번의 결과. UI 알림용.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synced_count: usize,
    pub errors: Vec<PushFailure>,
}

impl SyncReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 올리지 못한 문서 하나. 목록 조회 자체가 실패하면 `document_id`가 None입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushFailure {
    pub document_id: Option<String>,
    pub title: Option<String>,
    pub message: String,
}

/// 로컬과 원격이 갈라진 상태. 어느 쪽을 택할지는 호출자가 정합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub local: Document,
    pub remote: RemoteDocument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// 로컬 미러가 없어서 원격으로 새로 만듦
    Materialized(Document),
    /// 로컬 미러를 원격 내용으로 덮어씀
    Updated(Document),
    /// 충돌. 로컬은 그대로임
    Conflict(Conflict),
}

impl PullOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, PullOutcome::Conflict(_))
    }

    /// 충돌을 `SyncError::Conflict`로 바꿔서 `?`로 다룰 수 있게 합니다.
    pub fn into_result(self) -> SyncResult<Document> {
        match self {
            PullOutcome::Materialized(doc) | PullOutcome::Updated(doc) => Ok(doc),
            PullOutcome::Conflict(conflict) => Err(SyncError::Conflict {
                document_id: conflict.local.id,
            }),
        }
    }
}

/// 로컬 저장소와 원격 문서 저장소 사이의 동기화를 담당합니다.
///
/// clone하면 같은 잠금 테이블을 공유하므로, 자동 저장 세션과 연결 복구 태스크가
/// 각자 clone을 가져도 문서당 원격 쓰기는 하나로 유지됩니다.
#[derive(Clone)]
pub struct SyncEngine {
    store: LocalStore,
    remote: SharedDocumentStore,
    locks: DocumentLocks,
    timeout: Duration,
}

impl SyncEngine {
    pub fn new(store: LocalStore, remote: SharedDocumentStore, timeout: Duration) -> Self {
        Self {
            store,
            remote,
            locks: DocumentLocks::new(),
            timeout,
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn locks(&self) -> &DocumentLocks {
        &self.locks
    }

    /// 문서 하나를 원격에 씁니다.
    ///
    /// 문서 잠금을 잡은 뒤 미러를 다시 읽어서 올리므로, 기다리는 동안 들어온
    /// 편집까지 함께 올라갑니다. 이미 다른 쪽에서 올려서 `needs_sync`가 꺼져
    /// 있으면 원격 호출 없이 `Ok(None)`을 반환합니다.
    ///
    /// # 반환값
    /// - `Ok(Some(doc))`: 올린 내용 (auto 스냅샷에 사용)
    /// - `Ok(None)`: 올릴 것이 없었음
    /// - `Err(_)`: 실패. `needs_sync`는 true로 남습니다.
    pub async fn commit(&self, document_id: &str) -> SyncResult<Option<Document>> {
        let _guard = self.locks.acquire(document_id).await;

        let doc = self.store.require(document_id).await?;
        if !doc.needs_sync {
            return Ok(None);
        }

        let update = doc.to_update(self.store.now_ms());
        let pushed = call_with_timeout(
            self.timeout,
            "update",
            document_id,
            self.remote.update(document_id, &update),
        )
        .await;

        if let Err(e) = pushed {
            if let Err(flag_err) = self.store.mark_needs_sync(document_id).await {
                tracing::error!(document_id, error = %flag_err, "Failed to keep needs_sync flag");
            }
            return Err(e);
        }

        let cleared = self.store.mark_synced(document_id, doc.last_modified).await?;
        if !cleared {
            tracing::debug!(document_id, "Newer local edit arrived during push; still needs sync");
        }
        tracing::debug!(document_id, "Pushed document");
        Ok(Some(doc))
    }

    /// `needs_sync`인 모든 문서를 올립니다. 실패한 문서는 건너뛰고 계속합니다.
    pub async fn push(&self) -> SyncReport {
        let mut report = SyncReport::default();

        let pending = match self.store.list_needing_sync().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list documents needing sync");
                report.errors.push(PushFailure {
                    document_id: None,
                    title: None,
                    message: e.to_string(),
                });
                return report;
            }
        };

        for doc in pending {
            match self.commit(&doc.id).await {
                Ok(Some(_)) => report.synced_count += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        document_id = %doc.id,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Push failed"
                    );
                    report.errors.push(PushFailure {
                        document_id: Some(doc.id),
                        title: Some(doc.title),
                        message: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// 원격 문서를 내려받아 로컬 미러에 반영합니다.
    ///
    /// 원격에 레코드가 없으면 `SyncError::NotFound`.
    pub async fn pull(&self, document_id: &str) -> SyncResult<PullOutcome> {
        let _guard = self.locks.acquire(document_id).await;

        let remote = call_with_timeout(
            self.timeout,
            "get",
            document_id,
            self.remote.get(document_id),
        )
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("remote document {document_id}")))?;

        let now = self.store.now_ms();
        match self.store.get(document_id).await? {
            None => {
                let doc = Document::from_remote(&remote, now);
                self.store.put(&doc).await?;
                tracing::debug!(document_id, "Materialized local mirror from remote");
                Ok(PullOutcome::Materialized(doc))
            }
            Some(local) if local.needs_sync && local.last_modified > remote.updated_at => {
                tracing::warn!(
                    document_id,
                    local_modified = local.last_modified,
                    remote_updated = remote.updated_at,
                    "Conflict detected; leaving local copy untouched"
                );
                Ok(PullOutcome::Conflict(Conflict { local, remote }))
            }
            Some(_) => {
                let doc = Document::from_remote(&remote, now);
                self.store.put(&doc).await?;
                Ok(PullOutcome::Updated(doc))
            }
        }
    }

    /// 오프라인→온라인 전환 때 호출합니다. push를 한 번 하고 결과를 돌려줍니다.
    /// 내부에서 재시도하지 않습니다.
    pub async fn auto_sync(&self) -> SyncReport {
        tracing::info!("Back online; pushing pending documents");
        let report = self.push().await;

        if report.synced_count > 0 {
            tracing::info!(synced = report.synced_count, "Documents synced");
        }
        if !report.errors.is_empty() {
            tracing::error!(failed = report.errors.len(), errors = ?report.errors, "Some documents failed to sync");
        }
        report
    }

    /// 새 문서를 원격에 만들고 로컬 미러도 만듭니다. 온라인일 때만 가능합니다.
    pub async fn create_document(
        &self,
        project_id: &str,
        title: &str,
        content: &str,
    ) -> SyncResult<Document> {
        let request = NewDocument {
            id: uuid::Uuid::now_v7().to_string(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            word_count: word_count_i64(content),
        };

        let created = call_with_timeout(
            self.timeout,
            "insert",
            &request.id,
            self.remote.insert(&request),
        )
        .await?;

        let doc = Document::from_remote(&created, self.store.now_ms());
        self.store.put(&doc).await?;
        tracing::info!(document_id = %doc.id, project_id, "Created document");
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::remote::MemoryRemote;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Fixture {
        engine: SyncEngine,
        store: LocalStore,
        remote: Arc<MemoryRemote>,
        clock: Arc<ManualClock>,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(10_000));
        let store = LocalStore::open_in_memory(clock.clone()).await.unwrap();
        let remote = Arc::new(MemoryRemote::with_clock(clock.clone()));
        let engine = SyncEngine::new(store.clone(), remote.clone(), Duration::from_millis(200));
        Fixture {
            engine,
            store,
            remote,
            clock,
        }
    }

    fn remote_doc(id: &str, content: &str, updated_at: i64) -> RemoteDocument {
        RemoteDocument {
            id: id.to_string(),
            project_id: "p".to_string(),
            title: "원격".to_string(),
            content: content.to_string(),
            word_count: 1,
            updated_at,
        }
    }

    fn local_doc(id: &str, content: &str, last_modified: i64, needs_sync: bool) -> Document {
        Document {
            id: id.to_string(),
            project_id: "p".to_string(),
            title: "로컬".to_string(),
            content: content.to_string(),
            word_count: 1,
            last_modified,
            synced_at: None,
            needs_sync,
        }
    }

    #[tokio::test]
    async fn push_clears_flag_and_second_push_is_a_no_op() {
        let f = fixture().await;
        f.remote.seed_document(remote_doc("x", "old", 0));
        f.store.put(&local_doc("x", "hello", 5_000, true)).await.unwrap();

        let first = f.engine.push().await;
        assert_eq!(first.synced_count, 1);
        assert!(first.success());
        assert_eq!(f.remote.document("x").unwrap().content, "hello");

        let doc = f.store.get("x").await.unwrap().unwrap();
        assert!(!doc.needs_sync);
        assert_eq!(doc.synced_at, Some(10_000));

        let calls = f.remote.update_calls();
        let second = f.engine.push().await;
        assert_eq!(second, SyncReport::default());
        assert_eq!(f.remote.update_calls(), calls);
    }

    #[tokio::test]
    async fn one_failing_document_does_not_block_the_batch() {
        let f = fixture().await;
        for id in ["a", "b", "c"] {
            f.remote.seed_document(remote_doc(id, "", 0));
            f.store.put(&local_doc(id, "new", 1_000, true)).await.unwrap();
        }
        f.remote.fail_updates_for("b", true);

        let report = f.engine.push().await;
        assert_eq!(report.synced_count, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].document_id.as_deref(), Some("b"));
        assert!(f.store.get("b").await.unwrap().unwrap().needs_sync);
        assert!(!f.store.get("c").await.unwrap().unwrap().needs_sync);
    }

    #[tokio::test]
    async fn push_to_a_deleted_remote_record_reports_not_found() {
        let f = fixture().await;
        f.store.put(&local_doc("gone", "text", 1_000, true)).await.unwrap();

        let report = f.engine.push().await;
        assert_eq!(report.synced_count, 0);
        assert!(report.errors[0].message.contains("Not found"));
        assert!(f.store.get("gone").await.unwrap().unwrap().needs_sync);
    }

    #[tokio::test]
    async fn stalled_remote_times_out_and_keeps_the_flag() {
        let f = fixture().await;
        f.remote.seed_document(remote_doc("slow", "", 0));
        f.store.put(&local_doc("slow", "text", 1_000, true)).await.unwrap();
        f.remote.set_latency(Some(Duration::from_secs(5)));

        let err = f.engine.commit("slow").await.unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
        assert!(f.store.get("slow").await.unwrap().unwrap().needs_sync);
    }

    #[tokio::test]
    async fn commit_of_unknown_document_is_a_validation_error() {
        let f = fixture().await;
        let err = f.engine.commit("nobody").await.unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[tokio::test]
    async fn pull_materializes_a_missing_mirror() {
        let f = fixture().await;
        f.remote.seed_document(remote_doc("r", "from server", 7_000));

        let outcome = f.engine.pull("r").await.unwrap();
        let PullOutcome::Materialized(doc) = outcome else {
            panic!("expected materialized mirror");
        };
        assert_eq!(doc.content, "from server");
        assert_eq!(doc.last_modified, 7_000);
        assert!(!doc.needs_sync);
        assert_eq!(f.store.get("r").await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn pull_reports_conflict_without_touching_local() {
        let f = fixture().await;
        f.remote.seed_document(remote_doc("c", "remote text", 1_000));
        let local = local_doc("c", "local text", 2_000, true);
        f.store.put(&local).await.unwrap();

        let outcome = f.engine.pull("c").await.unwrap();
        assert!(outcome.is_conflict());
        if let PullOutcome::Conflict(conflict) = &outcome {
            assert_eq!(conflict.local, local);
            assert_eq!(conflict.remote.content, "remote text");
        }
        assert_eq!(f.store.get("c").await.unwrap(), Some(local));
        assert!(matches!(
            outcome.into_result(),
            Err(SyncError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn clean_local_copy_is_always_overwritten() {
        let f = fixture().await;
        // 로컬이 더 "최신"이어도 needs_sync가 false면 원격이 이깁니다.
        f.remote.seed_document(remote_doc("n", "remote wins", 1_000));
        f.store.put(&local_doc("n", "stale", 9_000, false)).await.unwrap();

        let outcome = f.engine.pull("n").await.unwrap();
        assert!(matches!(outcome, PullOutcome::Updated(_)));
        assert_eq!(f.store.get("n").await.unwrap().unwrap().content, "remote wins");
    }

    #[tokio::test]
    async fn dirty_but_older_local_copy_is_overwritten() {
        let f = fixture().await;
        f.remote.seed_document(remote_doc("o", "newer remote", 5_000));
        f.store.put(&local_doc("o", "older local", 4_000, true)).await.unwrap();

        let outcome = f.engine.pull("o").await.unwrap();
        assert!(matches!(outcome, PullOutcome::Updated(_)));
        let doc = f.store.get("o").await.unwrap().unwrap();
        assert_eq!(doc.content, "newer remote");
        assert!(!doc.needs_sync);
    }

    #[tokio::test]
    async fn pull_of_missing_remote_is_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.engine.pull("ghost").await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_commits_for_one_document_never_overlap() {
        let f = fixture().await;
        f.remote.seed_document(remote_doc("busy", "", 0));
        f.remote.set_latency(Some(Duration::from_millis(30)));

        let mut handles = Vec::new();
        for i in 0..4 {
            f.store
                .record_edit("busy", "p", "t", &format!("v{i}"), 1)
                .await
                .unwrap();
            let engine = f.engine.clone();
            handles.push(tokio::spawn(async move { engine.commit("busy").await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(f.remote.max_concurrent_updates("busy"), 1);
        assert_eq!(f.remote.document("busy").unwrap().content, "v3");
    }

    #[tokio::test]
    async fn create_document_inserts_remotely_and_mirrors_locally() {
        let f = fixture().await;
        f.clock.advance(Duration::from_secs(1));
        let doc = f.engine.create_document("p", "제목 없음", "").await.unwrap();

        assert!(f.remote.document(&doc.id).is_some());
        assert_eq!(f.store.get(&doc.id).await.unwrap(), Some(doc.clone()));
        assert!(!doc.needs_sync);

        f.remote.set_unreachable(true);
        assert!(matches!(
            f.engine.create_document("p", "offline", "").await,
            Err(SyncError::Network(_))
        ));
    }
}
