//! Type-safe identifiers for protocol entities.
//!
//! Command ids correlate outgoing commands with their results. They are
//! strictly monotonic per session (never wall-clock derived), so rapid
//! sends cannot collide and results are attributable even when the browser
//! interleaves them with events.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// CommandId
// ============================================================================

/// Identifier of an outgoing command, unique per channel lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Creates a command id from a raw value.
    ///
    /// Mostly useful when reconstructing ids from decoded frames.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CommandIdGenerator
// ============================================================================

/// Monotonic id source, one per session.
///
/// Ids start at 1 and increase by one per command. Generators are never
/// shared across sessions; concurrent exports each own their own instance.
#[derive(Debug)]
pub struct CommandIdGenerator {
    next: AtomicU64,
}

impl CommandIdGenerator {
    /// Creates a generator whose first id is 1.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next id.
    #[inline]
    pub fn next(&self) -> CommandId {
        CommandId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CommandIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_from_one() {
        let ids = CommandIdGenerator::new();
        assert_eq!(ids.next(), CommandId::new(1));
        assert_eq!(ids.next(), CommandId::new(2));
        assert_eq!(ids.next(), CommandId::new(3));
    }

    #[test]
    fn test_generators_are_independent() {
        let a = CommandIdGenerator::new();
        let b = CommandIdGenerator::new();
        a.next();
        a.next();
        assert_eq!(b.next(), CommandId::new(1));
    }

    #[test]
    fn test_serialize_as_integer() {
        let json = serde_json::to_string(&CommandId::new(42)).expect("serialize");
        assert_eq!(json, "42");
    }

    #[test]
    fn test_display() {
        assert_eq!(CommandId::new(7).to_string(), "7");
    }
}
