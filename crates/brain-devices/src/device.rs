use async_trait::async_trait;
use brain_core::types::{DeviceId, FrameKind, UserId};
use brain_protocol::Frame;

/// The result of a send attempt, matching the contract in the spec: a
/// device either accepted the frame or has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Ok,
    Closed,
}

/// An output sink owned by the [`crate::registry::DeviceRegistry`].
///
/// Implementors wrap whatever transport a connected client uses (a
/// WebSocket, an SSE stream, a push-notification channel); the registry
/// only ever calls `send` and `accepts`.
#[async_trait]
pub trait Device: Send + Sync {
    fn device_id(&self) -> &DeviceId;
    fn user_id(&self) -> &UserId;
    fn accepts(&self, kind: FrameKind) -> bool;
    async fn send(&self, frame: &Frame) -> SendOutcome;
}

/// Handle returned by [`crate::registry::DeviceRegistry::register`]; holding
/// it does not keep the device alive — it is only a lookup key for
/// `unregister`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub user_id: UserId,
    pub device_id: DeviceId,
}
