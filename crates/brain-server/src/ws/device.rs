use async_trait::async_trait;
use brain_core::types::{DeviceId, FrameKind, UserId};
use brain_devices::device::{Device, SendOutcome};
use brain_protocol::Frame;
use tokio::sync::mpsc;

/// [`Device`] implementation backing one live WebSocket connection. `send`
/// never touches the socket directly — it hands the frame to the
/// connection's own outbound channel, so a slow or wedged socket only ever
/// blocks this one queue, never the registry's broadcast loop.
pub struct WsDevice {
    device_id: DeviceId,
    user_id: UserId,
    outbound: mpsc::Sender<Frame>,
}

impl WsDevice {
    pub fn new(user_id: UserId, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            device_id: DeviceId::new(),
            user_id,
            outbound,
        }
    }
}

#[async_trait]
impl Device for WsDevice {
    fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn accepts(&self, _kind: FrameKind) -> bool {
        true
    }

    async fn send(&self, frame: &Frame) -> SendOutcome {
        match self.outbound.send(frame.clone()).await {
            Ok(()) => SendOutcome::Ok,
            Err(_) => SendOutcome::Closed,
        }
    }
}
