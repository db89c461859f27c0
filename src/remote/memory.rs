//! 프로세스 안에서 동작하는 원격 저장소.
//!
//! 실제 네트워크 없이 동기화 흐름 전체를 돌려보기 위한 구현입니다.
//! 연결 끊김, 특정 문서의 쓰기 실패, 응답 지연을 주입할 수 있고,
//! 문서별 동시 `update` 수의 최댓값을 기록합니다.

use super::{RemoteDocumentStore, RemoteVersionStore};
use crate::clock::{SharedClock, SystemClock};
use crate::error::SyncError;
use crate::models::{DocumentUpdate, NewDocument, NewSnapshot, RemoteDocument, Snapshot};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    documents: HashMap<String, RemoteDocument>,
    // 삽입 순서를 보존해서 같은 밀리초에 만든 스냅샷도 순서가 흔들리지 않게 합니다.
    versions: Vec<Snapshot>,
    failing_documents: HashSet<String>,
    latency: Option<Duration>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
}

#[derive(Debug)]
pub struct MemoryRemote {
    state: Mutex<State>,
    clock: SharedClock,
    unreachable: AtomicBool,
    update_calls: AtomicUsize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 원격이 부여하는 시각(`updated_at`이 아닌 `created_at`)에 쓸 시계를 지정합니다.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
            unreachable: AtomicBool::new(false),
            update_calls: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // 테스트 중 다른 스레드가 패닉해도 데이터 자체는 여전히 유효합니다.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 모든 호출이 `Network` 에러를 반환하게 합니다.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// 특정 문서의 `update`만 실패하게 합니다.
    pub fn fail_updates_for(&self, document_id: &str, fail: bool) {
        let mut state = self.state();
        if fail {
            state.failing_documents.insert(document_id.to_string());
        } else {
            state.failing_documents.remove(document_id);
        }
    }

    /// 모든 호출 앞에 지연을 넣습니다.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// 문서를 원격에 바로 심습니다 (다른 기기가 쓴 것처럼).
    pub fn seed_document(&self, document: RemoteDocument) {
        self.state()
            .documents
            .insert(document.id.clone(), document);
    }

    pub fn remove_document(&self, id: &str) {
        self.state().documents.remove(id);
    }

    pub fn document(&self, id: &str) -> Option<RemoteDocument> {
        self.state().documents.get(id).cloned()
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// 이 문서에 대해 동시에 진행된 `update`의 최댓값
    pub fn max_concurrent_updates(&self, document_id: &str) -> usize {
        self.state()
            .max_in_flight
            .get(document_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn snapshots(&self, document_id: &str) -> Vec<Snapshot> {
        self.state()
            .versions
            .iter()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect()
    }

    async fn round_trip(&self) -> Result<(), SyncError> {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SyncError::Network("remote unreachable".to_string()));
        }
        Ok(())
    }

    fn begin_update<'a>(&'a self, id: &'a str) -> InFlightUpdate<'a> {
        let mut state = self.state();
        let current = {
            let count = state.in_flight.entry(id.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let max = state.max_in_flight.entry(id.to_string()).or_insert(0);
        *max = (*max).max(current);
        InFlightUpdate { remote: self, id }
    }

    #[cfg(test)]
    fn in_flight_updates(&self, document_id: &str) -> usize {
        self.state().in_flight.get(document_id).copied().unwrap_or(0)
    }

    fn apply_update(&self, id: &str, update: &DocumentUpdate) -> Result<(), SyncError> {
        let mut state = self.state();
        if state.failing_documents.contains(id) {
            return Err(SyncError::Network(format!("write to {id} rejected")));
        }
        let doc = state
            .documents
            .get_mut(id)
            .ok_or_else(|| SyncError::NotFound(format!("remote document {id}")))?;
        doc.title = update.title.clone();
        doc.content = update.content.clone();
        if let Some(word_count) = update.word_count {
            doc.word_count = word_count;
        }
        doc.updated_at = update.updated_at;
        Ok(())
    }
}

/// 진행 중인 `update` 하나. drop되면 문서의 in-flight 카운트를 줄입니다.
struct InFlightUpdate<'a> {
    remote: &'a MemoryRemote,
    id: &'a str,
}

impl Drop for InFlightUpdate<'_> {
    fn drop(&mut self) {
        if let Some(count) = self.remote.state().in_flight.get_mut(self.id) {
            *count = count.saturating_sub(1);
        }
    }
}

#[async_trait]
impl RemoteDocumentStore for MemoryRemote {
    async fn update(&self, id: &str, update: &DocumentUpdate) -> Result<(), SyncError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        // 제한 시간에 걸려 future가 버려져도 guard가 카운트를 되돌립니다.
        let _in_flight = self.begin_update(id);
        self.round_trip().await?;
        self.apply_update(id, update)
    }

    async fn get(&self, id: &str) -> Result<Option<RemoteDocument>, SyncError> {
        self.round_trip().await?;
        Ok(self.document(id))
    }

    async fn insert(&self, document: &NewDocument) -> Result<RemoteDocument, SyncError> {
        self.round_trip().await?;
        let created = RemoteDocument {
            id: document.id.clone(),
            project_id: document.project_id.clone(),
            title: document.title.clone(),
            content: document.content.clone(),
            word_count: document.word_count,
            updated_at: self.clock.now_ms(),
        };
        let mut state = self.state();
        if state.documents.contains_key(&created.id) {
            return Err(SyncError::Validation(format!(
                "remote document {} already exists",
                created.id
            )));
        }
        state.documents.insert(created.id.clone(), created.clone());
        Ok(created)
    }
}

#[async_trait]
impl RemoteVersionStore for MemoryRemote {
    async fn insert(&self, snapshot: &NewSnapshot) -> Result<Snapshot, SyncError> {
        self.round_trip().await?;
        let created = Snapshot {
            id: uuid::Uuid::now_v7().to_string(),
            document_id: snapshot.document_id.clone(),
            project_id: snapshot.project_id.clone(),
            title: snapshot.title.clone(),
            content: snapshot.content.clone(),
            word_count: snapshot.word_count,
            snapshot_type: snapshot.snapshot_type,
            created_at: self.clock.now_ms(),
        };
        self.state().versions.push(created.clone());
        Ok(created)
    }

    async fn list(&self, document_id: &str, limit: u32) -> Result<Vec<Snapshot>, SyncError> {
        self.round_trip().await?;
        let state = self.state();
        // 뒤에서부터 훑으면 같은 created_at 안에서도 나중에 들어온 것이 먼저 옵니다.
        let mut matching: Vec<Snapshot> = state
            .versions
            .iter()
            .rev()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        self.round_trip().await?;
        let mut state = self.state();
        let before = state.versions.len();
        state.versions.retain(|s| s.id != id);
        if state.versions.len() == before {
            return Err(SyncError::NotFound(format!("snapshot {id}")));
        }
        Ok(())
    }
}
