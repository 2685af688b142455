//! Per-machine status polling.
//!
//! Each displayed machine gets a recurring single-shot refresh: sleep the
//! interval, fetch `vms/{id}/status` once, hand the tagged payload to the
//! collection owner, repeat. The next timer is armed only after the previous
//! fetch has completed, so at most one fetch is in flight per machine. A
//! failed tick is dropped silently; the next tick tries again with no
//! backoff or retry escalation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::reconcile::ListResponse;
use crate::types::VirtualMachine;

/// Default refresh cadence, matching the portal UI.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Where a poll tick gets its payload from. Seam for tests and for callers
/// that are not backed by the live API.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(
        &self,
        server_id: &str,
    ) -> Result<ListResponse<VirtualMachine>, ApiError>;
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(
        &self,
        server_id: &str,
    ) -> Result<ListResponse<VirtualMachine>, ApiError> {
        self.vm_status(server_id).await
    }
}

/// A running poll loop for one machine.
///
/// Dropping the poller aborts the loop, so polling stops with its owner.
/// A fetch already in flight at that point may still complete inside the
/// aborted task, but its payload is discarded with the task and never
/// reaches the collection.
pub struct StatusPoller {
    handle: JoinHandle<()>,
}

impl StatusPoller {
    /// Starts polling `server_id` every `interval`, sending each non-empty
    /// payload to `update_tx`. The loop ends on its own if the receiving
    /// side goes away.
    pub fn spawn(
        source: Arc<dyn StatusSource>,
        server_id: String,
        interval: Duration,
        update_tx: mpsc::Sender<ListResponse<VirtualMachine>>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                sleep(interval).await;

                match source.fetch_status(&server_id).await {
                    Ok(ListResponse::None) => {}
                    Ok(response) => {
                        if update_tx.send(response).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        debug!("status poll for {} failed: {}", server_id, err);
                    }
                }
            }
        });
        Self { handle }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServerStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn vm(id: &str, status: ServerStatus) -> VirtualMachine {
        VirtualMachine {
            server_id: id.to_string(),
            server_status: status,
            server_name: String::new(),
            server_ip: String::new(),
            server_image: String::new(),
            user_id: String::new(),
            created: String::new(),
            group_members: Vec::new(),
            image_read_root_password: false,
            image_display_name: String::new(),
        }
    }

    struct FakeSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeSource {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl StatusSource for FakeSource {
        async fn fetch_status(
            &self,
            server_id: &str,
        ) -> Result<ListResponse<VirtualMachine>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApiError::Status {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(ListResponse::Upsert(vm(server_id, ServerStatus::Shutoff)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn each_tick_delivers_one_payload() {
        let source = Arc::new(FakeSource::new(false));
        let (tx, mut rx) = mpsc::channel(8);
        let _poller = StatusPoller::spawn(
            Arc::clone(&source) as Arc<dyn StatusSource>,
            "srv-1".into(),
            Duration::from_secs(10),
            tx,
        );

        for _ in 0..3 {
            let update = rx.recv().await.expect("poller stopped early");
            assert_eq!(
                update,
                ListResponse::Upsert(vm("srv-1", ServerStatus::Shutoff))
            );
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_ticks_are_dropped_and_polling_continues() {
        let source = Arc::new(FakeSource::new(true));
        let (tx, mut rx) = mpsc::channel(8);
        let _poller = StatusPoller::spawn(
            Arc::clone(&source) as Arc<dyn StatusSource>,
            "srv-1".into(),
            Duration::from_secs(10),
            tx,
        );

        // Let several ticks elapse; none may produce a payload.
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_poller_stops_the_loop() {
        let source = Arc::new(FakeSource::new(false));
        let (tx, mut rx) = mpsc::channel(8);
        let poller = StatusPoller::spawn(
            Arc::clone(&source) as Arc<dyn StatusSource>,
            "srv-1".into(),
            Duration::from_secs(10),
            tx,
        );

        let first = rx.recv().await;
        assert!(first.is_some());
        drop(poller);

        // The sender lived inside the aborted task, so the channel closes.
        assert!(rx.recv().await.is_none());
    }
}
