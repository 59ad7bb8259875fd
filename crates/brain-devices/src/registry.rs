use std::sync::Arc;
use std::time::Duration;

use brain_core::types::UserId;
use brain_protocol::Frame;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::device::{Device, DeviceHandle, SendOutcome};

/// Bound on how long a single device's `send` is allowed to run before it
/// is treated as blocked and scheduled for unregistration. Keeps one slow
/// sink from stalling a broadcast to the rest of a user's devices.
const SEND_TIMEOUT: Duration = Duration::from_millis(500);

/// Outcome of [`DeviceRegistry::broadcast`]: device ids that accepted the
/// frame and device ids that failed (and were unregistered).
#[derive(Debug, Default, Clone)]
pub struct BroadcastReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// Per-user set of active output sinks. Sharded by user then by device so a
/// broadcast to one user never locks another's device set.
///
/// Mutations (register/unregister) touch the per-user shard; `broadcast`
/// only takes a read-level snapshot of the device list before sending, so a
/// concurrent register/unregister never blocks an in-flight broadcast.
pub struct DeviceRegistry {
    by_user: DashMap<UserId, DashMap<String, Arc<dyn Device>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            by_user: DashMap::new(),
        }
    }

    /// Add `device` under `user_id`. Idempotent per `device_id` — a second
    /// registration with the same id replaces the first.
    pub fn register(&self, user_id: UserId, device: Arc<dyn Device>) -> DeviceHandle {
        let device_id = device.device_id().clone();
        let shard = self.by_user.entry(user_id.clone()).or_default();
        shard.insert(device_id.as_str().to_string(), device);
        debug!(user_id = %user_id, device_id = %device_id, "device registered");
        DeviceHandle { user_id, device_id }
    }

    /// Remove the device referenced by `handle`. Safe to call twice; a
    /// second call is a silent no-op.
    pub fn unregister(&self, handle: &DeviceHandle) {
        if let Some(shard) = self.by_user.get(&handle.user_id) {
            shard.remove(handle.device_id.as_str());
            debug!(user_id = %handle.user_id, device_id = %handle.device_id, "device unregistered");
        }
    }

    /// Broadcast `frame` to every device of `user_id` that accepts its kind.
    ///
    /// Sends run concurrently; each is bounded by [`SEND_TIMEOUT`]. A device
    /// that times out, errors, or reports `Closed` is unregistered — other
    /// devices are unaffected (per-sink error isolation).
    pub async fn broadcast(&self, user_id: &UserId, frame: &Frame) -> BroadcastReport {
        let Some(shard) = self.by_user.get(user_id) else {
            return BroadcastReport::default();
        };

        let kind = frame.accepts();
        let candidates: Vec<Arc<dyn Device>> = shard
            .iter()
            .filter(|entry| entry.value().accepts(kind))
            .map(|entry| entry.value().clone())
            .collect();
        drop(shard);

        let mut report = BroadcastReport::default();
        let mut stale = Vec::new();

        let sends = candidates.into_iter().map(|device| {
            let frame = frame.clone();
            async move {
                let outcome = tokio::time::timeout(SEND_TIMEOUT, device.send(&frame)).await;
                (device, outcome)
            }
        });
        let results = futures_util::future::join_all(sends).await;

        for (device, outcome) in results {
            match outcome {
                Ok(SendOutcome::Ok) => report.delivered.push(device.device_id().as_str().to_string()),
                Ok(SendOutcome::Closed) => {
                    warn!(device_id = %device.device_id(), "device send reported closed");
                    report.failed.push(device.device_id().as_str().to_string());
                    stale.push(device.device_id().clone());
                }
                Err(_) => {
                    warn!(device_id = %device.device_id(), "device send timed out");
                    report.failed.push(device.device_id().as_str().to_string());
                    stale.push(device.device_id().clone());
                }
            }
        }

        for device_id in stale {
            self.unregister(&DeviceHandle {
                user_id: user_id.clone(),
                device_id,
            });
        }

        report
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brain_core::types::{DeviceId, FrameKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingDevice {
        id: DeviceId,
        user: UserId,
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Device for RecordingDevice {
        fn device_id(&self) -> &DeviceId {
            &self.id
        }
        fn user_id(&self) -> &UserId {
            &self.user
        }
        fn accepts(&self, kind: FrameKind) -> bool {
            kind == FrameKind::Text
        }
        async fn send(&self, _frame: &Frame) -> SendOutcome {
            self.count.fetch_add(1, Ordering::SeqCst);
            SendOutcome::Ok
        }
    }

    struct BlockingDevice {
        id: DeviceId,
        user: UserId,
    }

    #[async_trait]
    impl Device for BlockingDevice {
        fn device_id(&self) -> &DeviceId {
            &self.id
        }
        fn user_id(&self) -> &UserId {
            &self.user
        }
        fn accepts(&self, kind: FrameKind) -> bool {
            kind == FrameKind::Text
        }
        async fn send(&self, _frame: &Frame) -> SendOutcome {
            tokio::time::sleep(Duration::from_secs(10)).await;
            SendOutcome::Ok
        }
    }

    #[tokio::test]
    async fn blocked_device_does_not_stall_others() {
        let registry = DeviceRegistry::new();
        let user = UserId::from("u1");
        let count = Arc::new(AtomicUsize::new(0));

        registry.register(
            user.clone(),
            Arc::new(RecordingDevice {
                id: DeviceId::new(),
                user: user.clone(),
                count: count.clone(),
            }),
        );
        let blocking_handle = registry.register(
            user.clone(),
            Arc::new(BlockingDevice {
                id: DeviceId::new(),
                user: user.clone(),
            }),
        );

        let frame = Frame::text_delta("s1", "hi");
        let report = registry.broadcast(&user, &frame).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(report.delivered.len(), 1);
        assert_eq!(report.failed, vec![blocking_handle.device_id.as_str().to_string()]);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = DeviceRegistry::new();
        let user = UserId::from("u1");
        let handle = registry.register(
            user.clone(),
            Arc::new(RecordingDevice {
                id: DeviceId::new(),
                user: user.clone(),
                count: Arc::new(AtomicUsize::new(0)),
            }),
        );
        registry.unregister(&handle);
        registry.unregister(&handle);
    }
}
