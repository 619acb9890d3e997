pub mod flag;
pub use flag::{Flag, Flags};

pub mod folder;
pub use folder::decode_display_name;

pub mod message;
pub use message::Message;
