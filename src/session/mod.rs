//! Session orchestration.
//!
//! Runs the fixed export handshake over the control channel and hands the
//! decoded PDF bytes back to the facade.
//!
//! # Handshake
//!
//! | State | Sends | Awaits |
//! |-------|-------|--------|
//! | `CreatingTarget` | `Target.createTarget{url}` | result → `targetId` |
//! | `AttachingTarget` | `Target.attachToTarget{targetId}` | `Target.attachedToTarget` event |
//! | `AwaitingAttachResult` | (none) | attach result → `sessionId` |
//! | `Printing` | `Page.printToPDF` (session-tagged) | result → base64 payload |
//! | `Done` | (none) | (none) |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `state` | Write-once session record |
//! | `orchestrator` | State machine and content-based frame dispatch |

// ============================================================================
// Submodules
// ============================================================================

/// Write-once session state record.
pub mod state;

/// Handshake state machine.
pub mod orchestrator;

// ============================================================================
// Re-exports
// ============================================================================

pub use orchestrator::Orchestrator;
pub use state::SessionState;
