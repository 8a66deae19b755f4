//! Chrome PDF Export - render web pages to PDF via headless Chrome.
//!
//! This library drives an externally-installed headless Chrome through its
//! DevTools remote-debugging protocol to print a page as PDF.
//!
//! # Architecture
//!
//! One export is one session:
//!
//! 1. Spawn Chrome with a fixed non-interactive flag set
//! 2. Watch its stderr for the `DevTools listening on ws://...` line
//! 3. Open a WebSocket control channel to that endpoint
//! 4. Run the fixed handshake (create target → attach → print)
//! 5. Decode the base64 payload, tear down channel and process
//!
//! Cleanup is unconditional: every success, failure and cancellation path
//! closes the channel and terminates the process.
//!
//! # Quick Start
//!
//! ```no_run
//! use chrome_pdf_export::{PdfExporter, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let exporter = PdfExporter::builder()
//!         .binary("/usr/bin/chromium")
//!         .build()?
//!         .from_url("https://example.com");
//!
//!     let path = exporter.export("example.pdf").await?;
//!     println!("PDF written to {}", path.display());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`chrome`] | Process supervision and version probing |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`exporter`] | High-level export facade |
//! | [`identifiers`] | Command id newtype and per-session counter |
//! | [`protocol`] | DevTools wire message types |
//! | [`session`] | Handshake state machine |
//! | [`storage`] | Named-blob storage collaborator |
//! | [`transport`] | WebSocket control channel |

// ============================================================================
// Modules
// ============================================================================

/// Chrome process management: spawn, endpoint discovery, terminate,
/// version probing.
pub mod chrome;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// High-level export facade.
///
/// Use [`PdfExporter::builder()`] to create a configured exporter.
pub mod exporter;

/// Type-safe protocol identifiers.
pub mod identifiers;

/// DevTools wire message types.
pub mod protocol;

/// Session orchestration: the export handshake state machine.
pub mod session;

/// Named-blob storage consumed by the facade.
pub mod storage;

/// WebSocket control-channel transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Facade types
pub use exporter::{PdfExporter, PdfExporterBuilder};

// Error types
pub use error::{Error, Result};

// Process types
pub use chrome::{ChromeProcess, ControlEndpoint, probe_version};

// Protocol types
pub use identifiers::CommandId;
pub use protocol::{Codec, Frame};

// Session types
pub use session::{Orchestrator, SessionState};

// Storage types
pub use storage::{Storage, TempStorage};

// Transport types
pub use transport::{MessageChannel, WsChannel};
