//! Write-once session state.
//!
//! One record per export, owned by the orchestrator and populated
//! incrementally as the handshake advances. Overwriting an already-set
//! field means the browser answered the same step twice, which is a
//! protocol violation.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// SessionState
// ============================================================================

/// Mutable record threaded through the handshake.
#[derive(Debug, Default)]
pub struct SessionState {
    target_id: Option<String>,
    session_id: Option<String>,
    pdf_base64: Option<String>,
}

impl SessionState {
    /// Creates an empty session state.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the created target id.
    pub fn set_target_id(&mut self, target_id: String) -> Result<()> {
        Self::set_once(&mut self.target_id, target_id, "targetId")
    }

    /// Records the attached session id.
    pub fn set_session_id(&mut self, session_id: String) -> Result<()> {
        Self::set_once(&mut self.session_id, session_id, "sessionId")
    }

    /// Records the base64 print payload.
    pub fn set_pdf_base64(&mut self, payload: String) -> Result<()> {
        Self::set_once(&mut self.pdf_base64, payload, "result payload")
    }

    /// Returns the target id, if discovered.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref()
    }

    /// Returns the session id, if attached.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the base64 payload, if printed.
    #[inline]
    #[must_use]
    pub fn pdf_base64(&self) -> Option<&str> {
        self.pdf_base64.as_deref()
    }

    fn set_once(slot: &mut Option<String>, value: String, field: &str) -> Result<()> {
        if slot.is_some() {
            return Err(Error::protocol_violation(format!("{field} already set")));
        }
        *slot = Some(value);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
