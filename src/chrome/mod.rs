//! Chrome process management.
//!
//! One [`ChromeProcess`] exists per export. The supervisor spawns the
//! binary with a fixed non-interactive flag set, watches its stderr for the
//! DevTools endpoint announcement, observes unexpected exits, and
//! guarantees termination on every path (explicit [`terminate`] or the
//! kill-on-drop guard).
//!
//! [`terminate`]: ChromeProcess::terminate
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `supervisor` | Spawn, endpoint discovery, exit observation, terminate |
//! | `version` | One-shot `--version` probe |

// ============================================================================
// Submodules
// ============================================================================

/// Process lifecycle and endpoint discovery.
pub mod supervisor;

/// Browser version probing.
pub mod version;

// ============================================================================
// Re-exports
// ============================================================================

pub use supervisor::{ChromeProcess, ControlEndpoint};
pub use version::probe_version;
