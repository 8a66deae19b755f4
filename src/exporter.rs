//! Export facade.
//!
//! Binds the supervisor, channel and orchestrator together: pick a source
//! (URL, or HTML delivered as a file or inline `data:` URL), run one export
//! session, write the result into storage, return its path.
//!
//! # Example
//!
//! ```no_run
//! use chrome_pdf_export::{PdfExporter, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let path = PdfExporter::builder()
//!         .binary("/usr/bin/chromium")
//!         .build()?
//!         .from_html("<h1>Report</h1>", true)?
//!         .export("report.pdf")
//!         .await?;
//!
//!     println!("PDF written to {}", path.display());
//!     Ok(())
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::chrome::supervisor::ChromeProcess;
use crate::chrome::version;
use crate::error::{Error, Result};
use crate::session::Orchestrator;
use crate::storage::{Storage, TempStorage};
use crate::transport::{MessageChannel, WsChannel};

// ============================================================================
// Constants
// ============================================================================

/// Default deadline applied to every suspension point of a session.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Process-wide counter for unique blob names.
static NEXT_BLOB: AtomicU64 = AtomicU64::new(0);

/// Produces a blob name that cannot collide within this host process.
fn unique_blob_name(suffix: &str) -> String {
    let n = NEXT_BLOB.fetch_add(1, Ordering::Relaxed);
    format!("pdf-export-{}-{n}-{suffix}", std::process::id())
}

// ============================================================================
// PdfExporterBuilder
// ============================================================================

/// Builder for configuring a [`PdfExporter`].
///
/// Use [`PdfExporter::builder()`] to create a new builder.
pub struct PdfExporterBuilder {
    binary: Option<PathBuf>,
    storage: Option<Arc<dyn Storage>>,
    deadline: Duration,
}

impl Default for PdfExporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExporterBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: None,
            storage: None,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Sets the path to the Chrome binary executable.
    #[inline]
    #[must_use]
    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Sets the storage collaborator.
    ///
    /// Defaults to a fresh [`TempStorage`] when not set.
    #[inline]
    #[must_use]
    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Sets the deadline applied to every suspension point.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Builds the exporter with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no binary was set
    /// - [`Error::Spawn`] if the binary path does not exist
    pub fn build(self) -> Result<PdfExporter> {
        let binary = self.binary.ok_or_else(|| {
            Error::config("Chrome binary path is required. Use .binary() to set it.")
        })?;

        if !binary.exists() {
            return Err(Error::spawn(format!(
                "{}: no such binary",
                binary.display()
            )));
        }

        let storage = match self.storage {
            Some(storage) => storage,
            None => Arc::new(TempStorage::new()?),
        };

        Ok(PdfExporter {
            binary,
            storage,
            deadline: self.deadline,
            url: None,
        })
    }
}

// ============================================================================
// PdfExporter
// ============================================================================

/// Renders a web page to a PDF document through headless Chrome.
///
/// Each [`export`](PdfExporter::export) call is a one-shot, single-target
/// session: it owns its own process, channel, id counter and session state,
/// so exporters can run concurrently without sharing anything.
pub struct PdfExporter {
    binary: PathBuf,
    storage: Arc<dyn Storage>,
    deadline: Duration,
    url: Option<String>,
}

impl fmt::Debug for PdfExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfExporter")
            .field("binary", &self.binary)
            .field("deadline", &self.deadline)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl PdfExporter {
    /// Creates a configuration builder for the exporter.
    #[inline]
    #[must_use]
    pub fn builder() -> PdfExporterBuilder {
        PdfExporterBuilder::new()
    }

    /// Returns the path to the Chrome binary.
    #[inline]
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Returns the navigation target, if one has been selected.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Uses the given URL as the navigation target.
    #[inline]
    #[must_use]
    pub fn from_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses the given HTML string as input.
    ///
    /// With `as_file` set, the HTML is written to a storage blob and
    /// delivered as a `file://` URL; otherwise it is inlined as a
    /// `data:` URL. The choice only affects how large inputs reach the
    /// browser, not the handshake.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the blob cannot be written.
    pub fn from_html(mut self, html: &str, as_file: bool) -> Result<Self> {
        if as_file {
            let blob = unique_blob_name("source.html");
            self.storage.create(&blob, html.as_bytes())?;
            let path = self.storage.resolve_path(&blob, true)?;
            self.url = Some(format!("file://{}", path.display()));
        } else {
            self.url = Some(format!("data:text/html,{}", urlencoding::encode(html)));
        }

        Ok(self)
    }

    /// Exports the selected source to a PDF blob and returns its path.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no source was selected
    /// - any fatal session error, propagated unchanged
    ///
    /// On failure nothing is written; there is no truncated output to
    /// clean up.
    pub async fn export(&self, filename: &str) -> Result<PathBuf> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| Error::config("no source selected; call from_url or from_html first"))?;

        let bytes = self.render(url).await?;

        let blob = unique_blob_name(filename);
        self.storage.create(&blob, &bytes)?;
        let path = self.storage.resolve_path(&blob, true)?;

        info!(path = %path.display(), bytes = bytes.len(), "PDF exported");
        Ok(path)
    }

    /// Returns the major version number of the configured binary.
    ///
    /// `Ok(None)` means the probe ran cleanly but printed no recognizable
    /// version string.
    ///
    /// # Errors
    ///
    /// See [`probe_version`](crate::chrome::probe_version).
    pub async fn probe_version(&self) -> Result<Option<u32>> {
        version::probe_version(&self.binary).await
    }

    /// Runs one full session with unconditional cleanup.
    async fn render(&self, url: &str) -> Result<Vec<u8>> {
        let mut process = ChromeProcess::start(&self.binary)?;

        let outcome = self.drive(&mut process, url).await;

        // Cleanup happens on every path; cancellation mid-drive is covered
        // by the process drop guard and the socket drop.
        process.terminate().await;
        outcome
    }

    /// Discovery, connect and handshake against a live process.
    async fn drive(&self, process: &mut ChromeProcess, url: &str) -> Result<Vec<u8>> {
        let endpoint = process.discover_endpoint(self.deadline).await?;
        let mut channel = WsChannel::connect(endpoint.as_str(), self.deadline).await?;

        let orchestrator = Orchestrator::new(self.deadline);
        let outcome = tokio::select! {
            result = orchestrator.run(&mut channel, url) => result,
            error = process.crashed() => Err(error),
        };

        if let Err(e) = channel.close().await {
            debug!(error = %e, "Channel close failed during cleanup");
        }

        outcome
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_blob_names_do_not_collide() {
        let a = unique_blob_name("out.pdf");
        let b = unique_blob_name("out.pdf");
        assert_ne!(a, b);
        assert!(a.ends_with("out.pdf"));
    }

    #[test]
    fn test_builder_requires_binary() {
        let err = PdfExporter::builder().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_builder_rejects_missing_binary() {
        let err = PdfExporter::builder()
            .binary("/nonexistent/chrome")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[cfg(unix)]
    mod facade {
        use super::super::*;

        fn exporter() -> PdfExporter {
            // Any existing executable satisfies builder validation.
            PdfExporter::builder()
                .binary("/bin/sh")
                .build()
                .expect("build")
        }

        #[test]
        fn test_from_url_sets_target_verbatim() {
            let exporter = exporter().from_url("https://example.com/report");
            assert_eq!(exporter.url(), Some("https://example.com/report"));
        }

        #[test]
        fn test_inline_html_becomes_data_url() {
            let exporter = exporter()
                .from_html("<h1>Hi & bye</h1>", false)
                .expect("from_html");

            let url = exporter.url().expect("url set");
            assert!(url.starts_with("data:text/html,"));
            assert!(url.contains("%3Ch1%3E"));
            assert!(url.contains("%26"));
            assert!(!url.contains('<'));
        }

        #[test]
        fn test_persisted_html_becomes_file_url() {
            let html = "<html><body>stored</body></html>";
            let exporter = exporter().from_html(html, true).expect("from_html");

            let url = exporter.url().expect("url set").to_owned();
            let path = url.strip_prefix("file://").expect("file url");
            assert!(path.starts_with('/'));
            assert_eq!(std::fs::read_to_string(path).expect("read"), html);
        }

        #[tokio::test]
        async fn test_export_without_source_is_config_error() {
            let err = exporter().export("out.pdf").await.unwrap_err();
            assert!(matches!(err, Error::Config { .. }));
        }

        #[tokio::test]
        async fn test_export_with_crashing_browser_fails_before_connect() {
            use std::os::unix::fs::PermissionsExt;

            let dir = tempfile::tempdir().expect("tempdir");
            let binary = dir.path().join("fake-chrome");
            std::fs::write(&binary, "#!/bin/sh\nexit 1\n").expect("write");
            let mut perms = std::fs::metadata(&binary).expect("meta").permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&binary, perms).expect("chmod");

            let err = PdfExporter::builder()
                .binary(&binary)
                .timeout(Duration::from_secs(5))
                .build()
                .expect("build")
                .from_url("https://example.com")
                .export("out.pdf")
                .await
                .unwrap_err();

            assert!(matches!(err, Error::ProcessCrashed { code: Some(1) }));
        }
    }
}
