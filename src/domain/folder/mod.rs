//! Folder module.
//!
//! Folders are always handled through their raw wire-encoded name.
//! This module only provides a way to render that name for humans.

pub mod codec;
pub use codec::decode_display_name;
