pub mod get_time;
pub mod send_message;

pub use get_time::GetTimeTool;
pub use send_message::SendMessageTool;
