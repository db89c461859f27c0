//! # 에디터 세션 (Editor Session)
//!
//! 저장 상태 머신:
//! ```text
//! idle ─편집→ typing ─원격 저장 타이머→ saving ─┬→ saved ─표시 시간→ idle
//!                                              └→ error (다음 편집까지 유지)
//! ```
//!
//! 세션은 전역 싱글톤이 아니라 명시적인 값입니다. 저장소, 동기화 엔진,
//! 버전 관리자, 연결 상태를 받아서 만들고, clone하면 같은 세션을 가리킵니다.
//!
//! ## 불변 조건
//! - 문서당 원격 저장은 최대 하나만 진행됩니다. 세션의 `saving` 플래그가 타이머
//!   중복을 막고, `SyncEngine`의 문서 잠금이 세션 밖(자동 동기화)과의 중복을 막습니다.
//! - 로컬 백업은 문서당 한 줄로 정렬됩니다 (`backup_lock`). 나중에 쓰는 쪽이
//!   항상 더 최신 버퍼를 읽습니다.
//! - 문서를 떠난 뒤 울린 타이머나 늦게 끝난 저장은 새 문서의 버퍼와 상태를 건드리지 않습니다.

use super::state::{ActiveDocument, EditorBuffer, SessionState, TimerKind};
use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::models::{Document, Draft, RestoredContent, SaveStatus, Snapshot, SnapshotType};
use crate::services::word_count_i64;
use crate::store::LocalStore;
use crate::sync::{Conflict, PullOutcome, SyncEngine};
use crate::versions::VersionManager;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// 저장 한 번의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// 원격까지 저장됨 (또는 이미 최신이라 올릴 것이 없었음)
    Committed,
    /// 오프라인이라 로컬에만 저장됨. `needs_sync`는 true로 남음
    SavedLocally,
}

/// `open_document()`의 결과
#[derive(Debug, Clone)]
pub struct OpenedDocument {
    /// 불러온 로컬 미러
    pub document: Document,
    /// 에디터에 실제로 올라간 내용 (Draft를 복구했으면 Draft 내용)
    pub buffer: EditorBuffer,
    pub recovered_draft: bool,
    /// 원격과 갈라져 있으면 양쪽 내용. 버퍼에는 로컬 쪽이 올라갑니다.
    pub conflict: Option<Conflict>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Timer,
    Manual,
}

struct Inner {
    store: LocalStore,
    engine: SyncEngine,
    versions: VersionManager,
    connectivity: ConnectivityMonitor,
    config: SyncConfig,
    state: Mutex<SessionState>,
    backup_lock: tokio::sync::Mutex<()>,
    status: watch::Sender<SaveStatus>,
}

#[derive(Clone)]
pub struct EditorSession {
    inner: Arc<Inner>,
}

fn no_open_document() -> SyncError {
    SyncError::Validation("no document is open".to_string())
}

impl EditorSession {
    pub fn new(
        engine: SyncEngine,
        versions: VersionManager,
        connectivity: ConnectivityMonitor,
        config: SyncConfig,
    ) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                store: engine.store().clone(),
                engine,
                versions,
                connectivity,
                config,
                state: Mutex::new(SessionState::default()),
                backup_lock: tokio::sync::Mutex::new(()),
                status,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── 조회 ──

    pub fn status(&self) -> SaveStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    /// 마지막으로 저장에 성공한 시각 (밀리초)
    pub fn last_saved_at(&self) -> Option<i64> {
        self.lock_state().last_saved_at
    }

    pub fn active_document_id(&self) -> Option<String> {
        self.lock_state()
            .active
            .as_ref()
            .map(|active| active.document_id().to_string())
    }

    /// 현재 버퍼. `error` 상태에서도 항상 꺼낼 수 있어서
    /// 사용자가 클립보드로 복사해 둘 수 있습니다.
    pub fn buffer(&self) -> Option<EditorBuffer> {
        self.lock_state()
            .active
            .as_ref()
            .map(|active| active.buffer.clone())
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.inner.connectivity
    }

    // ── 문서 열기/닫기 ──

    /// 문서를 열고 활성 문서로 만듭니다. 이전 문서는 먼저 닫습니다.
    ///
    /// 온라인이면 원격에서 pull한 뒤 엽니다. pull이 실패하면 로컬 미러로 엽니다.
    /// 미러보다 최신인 Draft가 있으면 Draft를 버퍼에 올리고, 저장되지 않은
    /// 편집으로 취급해서 타이머를 겁니다.
    pub async fn open_document(&self, document_id: &str) -> SyncResult<OpenedDocument> {
        self.close().await;

        let (document, conflict) = self.load(document_id).await?;
        let draft = self
            .inner
            .store
            .get_draft(document_id)
            .await?
            .filter(|draft| draft.timestamp > document.last_modified);

        if draft.is_some() {
            tracing::info!(document_id, "Recovered unsaved local draft");
        }
        Ok(self.activate(document, draft, conflict))
    }

    /// 새 문서를 원격에 만들고 엽니다. 오프라인이면 `Network` 에러.
    pub async fn create_document(&self, project_id: &str, title: &str) -> SyncResult<OpenedDocument> {
        if !self.inner.connectivity.is_online() {
            return Err(SyncError::Network(
                "offline: new documents need the remote store".to_string(),
            ));
        }

        let document = self.inner.engine.create_document(project_id, title, "").await?;
        self.close().await;
        Ok(self.activate(document, None, None))
    }

    /// 활성 문서를 닫습니다.
    ///
    /// 대기 중인 타이머는 모두 취소되고, 아직 백업되지 않은 편집은 떠나는 문서의
    /// Draft와 미러에만 씁니다. 진행 중인 원격 저장은 그대로 끝까지 갑니다.
    pub async fn close(&self) {
        let _ordered = self.inner.backup_lock.lock().await;

        let departing = self.lock_state().active.take();
        let Some(mut departing) = departing else {
            return;
        };
        departing.cancel_all_timers();
        departing.owner.cancel();

        if departing.dirty {
            if let Err(e) = self.write_backup(&departing.buffer).await {
                tracing::error!(
                    document_id = %departing.buffer.document_id,
                    error = %e,
                    "Failed to back up document while leaving it"
                );
            }
        }

        self.inner.status.send_replace(SaveStatus::Idle);
        tracing::debug!(document_id = %departing.buffer.document_id, "Closed document");
    }

    async fn load(&self, document_id: &str) -> SyncResult<(Document, Option<Conflict>)> {
        let mut pull_error = None;

        if self.inner.connectivity.is_online() {
            match self.inner.engine.pull(document_id).await {
                Ok(PullOutcome::Materialized(doc)) | Ok(PullOutcome::Updated(doc)) => {
                    return Ok((doc, None));
                }
                Ok(PullOutcome::Conflict(conflict)) => {
                    return Ok((conflict.local.clone(), Some(conflict)));
                }
                Err(e) => {
                    tracing::warn!(document_id, error = %e, "Pull failed; falling back to local mirror");
                    pull_error = Some(e);
                }
            }
        }

        match self.inner.store.get(document_id).await? {
            Some(doc) => Ok((doc, None)),
            None => Err(pull_error.unwrap_or_else(|| {
                SyncError::Validation(format!("unknown document {document_id}"))
            })),
        }
    }

    fn activate(
        &self,
        document: Document,
        draft: Option<Draft>,
        conflict: Option<Conflict>,
    ) -> OpenedDocument {
        let recovered_draft = draft.is_some();
        let (title, content) = match draft {
            Some(draft) => (draft.title, draft.content),
            None => (document.title.clone(), document.content.clone()),
        };
        let buffer = EditorBuffer {
            document_id: document.id.clone(),
            project_id: document.project_id.clone(),
            title,
            content,
        };

        let mut state = self.lock_state();
        if let Some(mut previous) = state.active.take() {
            previous.cancel_all_timers();
            previous.owner.cancel();
        }

        let mut active = ActiveDocument::new(buffer.clone());
        if recovered_draft {
            active.dirty = true;
            active.edit_seq = 1;
            self.restart_edit_timers(&mut active);
            self.inner.status.send_replace(SaveStatus::Typing);
        } else {
            self.inner.status.send_replace(SaveStatus::Idle);
        }
        state.active = Some(active);
        state.last_saved_at = document.synced_at;

        OpenedDocument {
            document,
            buffer,
            recovered_draft,
            conflict,
        }
    }

    // ── 편집 ──

    /// 버퍼를 바꾸고 두 타이머를 다시 겁니다. Tokio 런타임 안에서 호출해야 합니다.
    pub fn edit(&self, title: impl Into<String>, content: impl Into<String>) -> SyncResult<()> {
        let mut state = self.lock_state();
        let active = state.active.as_mut().ok_or_else(no_open_document)?;

        active.buffer.title = title.into();
        active.buffer.content = content.into();
        active.dirty = true;
        active.edit_seq += 1;
        self.restart_edit_timers(active);

        self.inner.status.send_replace(SaveStatus::Typing);
        Ok(())
    }

    fn restart_edit_timers(&self, active: &mut ActiveDocument) {
        active.cancel_all_timers();
        let document_id = active.document_id().to_string();
        active.backup_timer = Some(self.schedule(&active.owner, TimerKind::Backup, &document_id));
        active.commit_timer = Some(self.schedule(&active.owner, TimerKind::Commit, &document_id));
    }

    /// 지연 후 타이머를 실행하는 태스크를 띄우고, 그 타이머의 취소 토큰을 돌려줍니다.
    fn schedule(
        &self,
        owner: &CancellationToken,
        kind: TimerKind,
        document_id: &str,
    ) -> CancellationToken {
        let delay = match kind {
            TimerKind::Backup => self.inner.config.local_backup_delay,
            TimerKind::Commit => self.inner.config.remote_commit_delay,
            TimerKind::Idle => self.inner.config.saved_display,
        };

        let timer = owner.child_token();
        let cancelled = timer.clone();
        let owner = owner.clone();
        let document_id = document_id.to_string();
        let session = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => session.fire(kind, &document_id, &owner).await,
            }
        });

        timer
    }

    async fn fire(&self, kind: TimerKind, document_id: &str, owner: &CancellationToken) {
        match kind {
            TimerKind::Backup => self.on_backup_timer(document_id, owner).await,
            TimerKind::Commit => {
                // 결과는 상태와 로그에 이미 반영됨
                let _ = self.run_commit(document_id, owner, Trigger::Timer).await;
            }
            TimerKind::Idle => self.on_idle_timer(document_id, owner),
        }
    }

    async fn on_backup_timer(&self, document_id: &str, owner: &CancellationToken) {
        if let Err(e) = self.flush_backup(document_id, owner).await {
            tracing::error!(document_id, error = %e, "Local backup failed");
            self.set_status_if_owned(document_id, owner, SaveStatus::Error(e.to_string()));
        }
    }

    fn on_idle_timer(&self, document_id: &str, owner: &CancellationToken) {
        let mut state = self.lock_state();
        if let Some(active) = state.owned_mut(document_id, owner) {
            active.idle_timer = None;
            self.inner.status.send_if_modified(|status| {
                if *status == SaveStatus::Saved {
                    *status = SaveStatus::Idle;
                    true
                } else {
                    false
                }
            });
        }
    }

    fn set_status_if_owned(&self, document_id: &str, owner: &CancellationToken, status: SaveStatus) {
        let mut state = self.lock_state();
        if state.owned_mut(document_id, owner).is_some() {
            self.inner.status.send_replace(status);
        }
    }

    // ── 저장 ──

    /// 버퍼를 Draft와 로컬 미러에 씁니다.
    ///
    /// 마지막 백업 이후 편집이 없거나 이 문서가 더 이상 활성 상태가 아니면
    /// 아무것도 하지 않고 `Ok(false)`.
    async fn flush_backup(&self, document_id: &str, owner: &CancellationToken) -> SyncResult<bool> {
        let _ordered = self.inner.backup_lock.lock().await;

        let buffer = {
            let mut state = self.lock_state();
            match state.owned_mut(document_id, owner) {
                Some(active) if active.dirty => {
                    active.dirty = false;
                    active.buffer.clone()
                }
                _ => return Ok(false),
            }
        };

        if let Err(e) = self.write_backup(&buffer).await {
            if let Some(active) = self.lock_state().owned_mut(document_id, owner) {
                active.dirty = true;
            }
            return Err(e);
        }
        Ok(true)
    }

    async fn write_backup(&self, buffer: &EditorBuffer) -> SyncResult<()> {
        let store = &self.inner.store;
        store
            .save_draft(&buffer.document_id, &buffer.title, &buffer.content)
            .await?;
        store
            .record_edit(
                &buffer.document_id,
                &buffer.project_id,
                &buffer.title,
                &buffer.content,
                word_count_i64(&buffer.content),
            )
            .await?;
        Ok(())
    }

    /// 로컬 백업 후, 온라인이면 원격에 씁니다. 성공하면 auto 스냅샷 간격을 확인합니다.
    async fn persist(&self, document_id: &str, owner: &CancellationToken) -> SyncResult<SaveOutcome> {
        self.flush_backup(document_id, owner).await?;

        if !self.inner.connectivity.is_online() {
            tracing::debug!(document_id, "Offline; keeping local backup only");
            return Ok(SaveOutcome::SavedLocally);
        }

        if let Some(pushed) = self.inner.engine.commit(document_id).await? {
            self.inner.versions.maybe_auto_snapshot(&pushed).await;
        }
        Ok(SaveOutcome::Committed)
    }

    /// 원격 저장 한 사이클.
    ///
    /// 이미 saving이면 타이머는 뒤로 미루고(`Ok(None)`), 수동 저장은 `SaveInProgress`.
    /// 미뤄진 타이머가 있으면 끝난 직후 한 번 더 저장합니다.
    async fn run_commit(
        &self,
        document_id: &str,
        owner: &CancellationToken,
        trigger: Trigger,
    ) -> SyncResult<Option<SaveOutcome>> {
        let mut started_seq = {
            let mut state = self.lock_state();
            let Some(active) = state.owned_mut(document_id, owner) else {
                return match trigger {
                    Trigger::Timer => Ok(None),
                    Trigger::Manual => Err(no_open_document()),
                };
            };
            if active.saving {
                return match trigger {
                    Trigger::Timer => {
                        tracing::debug!(document_id, "Save in flight; deferring commit");
                        active.pending_commit = true;
                        Ok(None)
                    }
                    Trigger::Manual => Err(SyncError::SaveInProgress(document_id.to_string())),
                };
            }
            active.saving = true;
            self.inner.status.send_replace(SaveStatus::Saving);
            active.edit_seq
        };

        loop {
            let result = self.persist(document_id, owner).await;
            if let Err(e) = &result {
                tracing::warn!(document_id, error = %e, "Save failed");
            }

            match self.finish_commit(document_id, owner, started_seq, &result) {
                Some(next_seq) => started_seq = next_seq,
                None => return result.map(Some),
            }
        }
    }

    /// 저장이 끝난 뒤 상태를 정리합니다. 미뤄진 저장이 있으면 다음 사이클의
    /// 편집 번호를 돌려줍니다.
    fn finish_commit(
        &self,
        document_id: &str,
        owner: &CancellationToken,
        started_seq: u64,
        result: &SyncResult<SaveOutcome>,
    ) -> Option<u64> {
        let now = self.inner.store.now_ms();
        let mut state = self.lock_state();

        // 문서를 떠났으면 저장은 끝났어도 새 문서의 상태는 건드리지 않습니다.
        let active = state.owned_mut(document_id, owner)?;
        if active.pending_commit {
            active.pending_commit = false;
            self.inner.status.send_replace(SaveStatus::Saving);
            return Some(active.edit_seq);
        }
        active.saving = false;

        // 저장하는 동안 편집이 들어왔으면 typing을 유지합니다.
        let settled = active.edit_seq == started_seq;
        if result.is_ok() && settled {
            active.cancel_timer(TimerKind::Idle);
            active.idle_timer = Some(self.schedule(owner, TimerKind::Idle, document_id));
        }

        match result {
            Ok(_) => {
                state.last_saved_at = Some(now);
                if settled {
                    self.inner.status.send_replace(SaveStatus::Saved);
                }
            }
            Err(e) => {
                self.inner.status.send_replace(SaveStatus::Error(e.to_string()));
            }
        }
        None
    }

    /// 수동 저장. 대기 중인 타이머를 취소하고 바로 저장하며, 결과를 그대로 돌려줍니다.
    pub async fn save_now(&self) -> SyncResult<SaveOutcome> {
        let (document_id, owner) = {
            let mut state = self.lock_state();
            let active = state.active.as_mut().ok_or_else(no_open_document)?;
            if active.saving {
                return Err(SyncError::SaveInProgress(active.document_id().to_string()));
            }
            active.cancel_timer(TimerKind::Backup);
            active.cancel_timer(TimerKind::Commit);
            (active.document_id().to_string(), active.owner.clone())
        };

        match self.run_commit(&document_id, &owner, Trigger::Manual).await? {
            Some(outcome) => Ok(outcome),
            None => Err(SyncError::SaveInProgress(document_id)),
        }
    }

    // ── 스냅샷 ──

    /// 수동 스냅샷. 실패를 그대로 돌려줍니다.
    pub async fn snapshot_now(&self) -> SyncResult<Snapshot> {
        let buffer = self.buffer().ok_or_else(no_open_document)?;
        self.inner
            .versions
            .create_snapshot(
                &buffer.document_id,
                &buffer.project_id,
                &buffer.title,
                &buffer.content,
                word_count_i64(&buffer.content),
                SnapshotType::Manual,
            )
            .await
    }

    /// AI 생성 직전에 호출합니다. 실패해도 생성을 막지 않도록 로그만 남깁니다.
    pub async fn prepare_ai_generation(&self) -> Option<Snapshot> {
        let buffer = self.buffer()?;
        let created = self
            .inner
            .versions
            .create_snapshot(
                &buffer.document_id,
                &buffer.project_id,
                &buffer.title,
                &buffer.content,
                word_count_i64(&buffer.content),
                SnapshotType::PreAi,
            )
            .await;

        match created {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(document_id = %buffer.document_id, error = %e, "Pre-AI snapshot failed");
                None
            }
        }
    }

    /// 스냅샷 내용을 버퍼에 올립니다. 일반 편집과 똑같이 저장 사이클이 돕니다.
    pub fn apply_restore(&self, snapshot: &Snapshot) -> SyncResult<RestoredContent> {
        match self.active_document_id() {
            Some(id) if id == snapshot.document_id => {}
            Some(id) => {
                return Err(SyncError::Validation(format!(
                    "snapshot {} belongs to {}, not the open document {id}",
                    snapshot.id, snapshot.document_id
                )));
            }
            None => return Err(no_open_document()),
        }

        let restored = self.inner.versions.restore(snapshot);
        self.edit(restored.title.clone(), restored.content.clone())?;
        tracing::info!(document_id = %snapshot.document_id, snapshot_id = %snapshot.id, "Restored snapshot into buffer");
        Ok(restored)
    }
}
