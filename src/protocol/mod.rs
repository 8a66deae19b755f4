//! DevTools wire message types.
//!
//! One JSON object per frame, both directions.
//!
//! # Wire Contract
//!
//! | Direction | Shape |
//! |-----------|-------|
//! | Outgoing command | `{id:int, method:string, params:object, sessionId?:string}` |
//! | Incoming result | `{id:int, result:object}` |
//! | Incoming error | `{id:int, error:{code:int, message:string}}` |
//! | Incoming event | `{method:string, params:object, sessionId?:string}` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Outgoing command envelope with per-session id assignment |
//! | `frame` | Incoming frame classification |

// ============================================================================
// Submodules
// ============================================================================

/// Outgoing command encoding.
pub mod codec;

/// Incoming frame classification.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::Codec;
pub use frame::Frame;
