//! `brain-devices` — the Device Registry: per-user output sinks with
//! per-sink error isolation on broadcast.

pub mod device;
pub mod registry;

pub use device::{Device, DeviceHandle, SendOutcome};
pub use registry::{BroadcastReport, DeviceRegistry};
