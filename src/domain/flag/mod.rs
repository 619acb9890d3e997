//! Flag module.
//!
//! This module contains the backend-independent representation of
//! message flags.

pub mod flag;
pub mod flags;

pub use self::flag::*;
pub use self::flags::*;
