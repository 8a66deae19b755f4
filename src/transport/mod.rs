//! Control-channel transport layer.
//!
//! One persistent bidirectional WebSocket channel per export, opened
//! against the endpoint published on the browser's stderr.
//!
//! ```text
//! ┌──────────────────┐                          ┌──────────────────┐
//! │  Orchestrator    │                          │  Headless Chrome │
//! │                  │        WebSocket         │                  │
//! │  WsChannel       │◄────────────────────────►│  DevTools server │
//! │                  │   ws://127.0.0.1:PORT    │                  │
//! └──────────────────┘                          └──────────────────┘
//! ```
//!
//! The orchestrator is written against the [`MessageChannel`] trait;
//! [`WsChannel`] is the production implementation.

// ============================================================================
// Submodules
// ============================================================================

/// Channel trait and WebSocket implementation.
pub mod channel;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{MessageChannel, WsChannel};
