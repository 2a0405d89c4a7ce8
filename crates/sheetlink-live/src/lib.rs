//! Live-session backend: drives the running spreadsheet host through a
//! bridge process.
//!
//! The bridge is a Windows executable that automates the host over COM,
//! spawned directly on Windows or under WINE elsewhere, and spoken to over
//! JSON-over-stdio. This crate owns the client half: process lifecycle,
//! the attach policy that finds the caller's document among the host's
//! open workbooks, and the codec between semantic styles/rules and the
//! host's raw integer codes.
//!
//! # Architecture
//!
//! ```text
//! sheetlink (selector)
//!     └── LiveWorkbook (this crate)
//!           └── SessionBridge — spawns: [wine] sheetlink-bridge.exe
//!                 └── COM automation of the running host
//! ```
//!
//! Attaching never opens or closes documents: the document must already be
//! open in a running host session, and shutdown restores the host settings
//! the bridge suppressed, leaving the user's session as it found it.

mod backend;
mod bridge;
pub mod codec;
mod error;

pub use backend::{LiveWorkbook, BACKEND_NAME};
pub use bridge::{linux_to_wine_path, BridgeConfig, SessionBridge};
pub use error::{BridgeError, Result};
