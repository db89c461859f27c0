//! # 연결 상태 모니터 (Connectivity Monitor)
//!
//! 온라인/오프라인 불리언 신호를 감싸고, 값이 실제로 바뀔 때만 이벤트를 보냅니다.
//! 이미 온라인인데 다시 온라인 신호가 오는 재연결 하트비트는 무시됩니다.
//!
//! `spawn_auto_sync()`는 오프라인→온라인 전환마다 `SyncEngine::auto_sync()`를
//! 정확히 한 번 실행하는 백그라운드 태스크를 띄웁니다.

use crate::sync::{SyncEngine, SyncReport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// 상태 전환 이벤트
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    WentOnline,
    WentOffline,
}

#[derive(Debug)]
struct Inner {
    online: AtomicBool,
    events: broadcast::Sender<ConnectivityEvent>,
}

/// clone하면 같은 신호를 공유합니다.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                online: AtomicBool::new(initially_online),
                events,
            }),
        }
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// 플랫폼에서 받은 연결 상태를 반영합니다.
    ///
    /// # 반환값
    /// 실제로 전환이 일어났으면 그 이벤트, 같은 값이면 None
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEvent> {
        let previous = self.inner.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return None;
        }

        let event = if online {
            ConnectivityEvent::WentOnline
        } else {
            ConnectivityEvent::WentOffline
        };
        tracing::info!(?event, "Connectivity changed");
        // 구독자가 없으면 Err이지만, 상태는 이미 바뀌었으므로 문제없습니다.
        let _ = self.inner.events.send(event);
        Some(event)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.inner.events.subscribe()
    }
}

/// 오프라인→온라인 전환마다 `auto_sync()`를 한 번 실행합니다.
///
/// 각 실행 결과는 반환된 채널로 전달되어 UI가 "N개 동기화됨" 같은 알림을
/// 띄울 수 있습니다. 채널을 버려도 태스크는 계속 동작합니다.
pub fn spawn_auto_sync(
    monitor: &ConnectivityMonitor,
    engine: SyncEngine,
) -> (JoinHandle<()>, mpsc::UnboundedReceiver<SyncReport>) {
    let mut events = monitor.subscribe();
    let (report_tx, report_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ConnectivityEvent::WentOnline) => {
                    let report = engine.auto_sync().await;
                    let _ = report_tx.send(report);
                }
                Ok(ConnectivityEvent::WentOffline) => {
                    tracing::debug!("Offline: remote commits paused, relying on local backups");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Connectivity events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    (handle, report_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_real_transitions_emit_events() {
        let monitor = ConnectivityMonitor::new(true);
        let mut events = monitor.subscribe();

        assert_eq!(monitor.set_online(true), None);
        assert_eq!(monitor.set_online(false), Some(ConnectivityEvent::WentOffline));
        assert_eq!(monitor.set_online(false), None);
        assert_eq!(monitor.set_online(true), Some(ConnectivityEvent::WentOnline));
        assert!(monitor.is_online());

        assert_eq!(events.try_recv().unwrap(), ConnectivityEvent::WentOffline);
        assert_eq!(events.try_recv().unwrap(), ConnectivityEvent::WentOnline);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn clones_share_the_signal() {
        let monitor = ConnectivityMonitor::new(false);
        let other = monitor.clone();
        other.set_online(true);
        assert!(monitor.is_online());
    }
}
