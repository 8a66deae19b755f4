//! Chrome process supervision.
//!
//! Spawns the browser with its fixed flag set, scans stderr line by line
//! for the DevTools endpoint announcement, observes process exit, and
//! exposes idempotent forced termination.
//!
//! # Launch Contract
//!
//! The binary is always invoked as:
//!
//! ```text
//! chrome --headless --disable-gpu --no-sandbox --remote-debugging-port=0
//! ```
//!
//! Port 0 asks the OS for a free port; the actual endpoint is read back
//! from the first stderr line matching
//! `DevTools listening on ws://127.0.0.1:<port>/devtools/browser/<id>`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};
use tokio::time;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Fixed launch flags. Altering this set is a compatibility break.
const CHROME_ARGS: [&str; 4] = [
    "--headless",
    "--disable-gpu",
    "--no-sandbox",
    "--remote-debugging-port=0",
];

/// How long to wait for an exit status once the stderr stream has ended,
/// to distinguish a crash from a closed stream on a live process.
const EXIT_GRACE: Duration = Duration::from_millis(250);

/// Endpoint announcement pattern.
static ENDPOINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^DevTools listening on (ws://127\.0\.0\.1:\d+/devtools/browser/[\w-]+)$")
        .expect("endpoint pattern is valid")
});

// ============================================================================
// ControlEndpoint
// ============================================================================

/// The browser's remote-debugging address.
///
/// Derived exactly once per process lifetime from the first matching
/// diagnostic line; immutable after discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEndpoint(String);

impl ControlEndpoint {
    /// Returns the endpoint as a `ws://` URL string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Line Matching
// ============================================================================

/// Extracts the endpoint URL from one diagnostic line, if it matches.
fn match_endpoint(line: &str) -> Option<&str> {
    ENDPOINT_PATTERN
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

// ============================================================================
// ChromeProcess
// ============================================================================

/// A supervised headless-Chrome process.
///
/// Owned exclusively by one export session. The process is terminated
/// exactly once: either explicitly via [`ChromeProcess::terminate`], or by
/// the drop guard if the session is cancelled or panics mid-handshake.
pub struct ChromeProcess {
    child: Child,
    pid: Option<u32>,
    stderr: Option<Lines<BufReader<ChildStderr>>>,
    endpoint: Option<ControlEndpoint>,
    terminated: bool,
}

impl fmt::Debug for ChromeProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromeProcess")
            .field("pid", &self.pid)
            .field("endpoint", &self.endpoint)
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl ChromeProcess {
    /// Launches the browser binary with the fixed flag set.
    ///
    /// stdin and stdout are discarded; stderr is piped for endpoint
    /// discovery.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the binary is missing or not executable.
    pub fn start(binary: impl AsRef<Path>) -> Result<Self> {
        let binary = binary.as_ref();

        let mut child = Command::new(binary)
            .args(CHROME_ARGS)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::spawn(format!("{}: {e}", binary.display())))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::spawn("stderr pipe unavailable"))?;

        let pid = child.id();
        info!(pid, binary = %binary.display(), "Chrome process spawned");

        Ok(Self {
            child,
            pid,
            stderr: Some(BufReader::new(stderr).lines()),
            endpoint: None,
            terminated: false,
        })
    }

    /// Waits for the DevTools endpoint announcement on stderr.
    ///
    /// Lines are observed incrementally; the first match wins and later
    /// matches are ignored. After discovery a background task keeps
    /// draining stderr so the pipe cannot fill up and block the browser.
    ///
    /// # Errors
    ///
    /// - [`Error::ProcessCrashed`] if the process exits before any match
    /// - [`Error::EndpointNotFound`] if the stream ends without a match
    ///   while the process keeps running
    /// - [`Error::Timeout`] if no match arrives within `deadline`
    pub async fn discover_endpoint(&mut self, deadline: Duration) -> Result<ControlEndpoint> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }

        let lines = self
            .stderr
            .take()
            .ok_or_else(|| Error::protocol_violation("diagnostic stream already consumed"))?;

        match time::timeout(deadline, Self::scan(lines)).await {
            Ok(Ok(Some((endpoint, rest)))) => {
                info!(endpoint = %endpoint, "DevTools endpoint discovered");
                tokio::spawn(Self::drain(rest));
                self.endpoint = Some(endpoint.clone());
                Ok(endpoint)
            }
            Ok(Ok(None)) => Err(self.classify_silent_end().await),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Error::timeout(
                "endpoint discovery",
                deadline.as_millis() as u64,
            )),
        }
    }

    /// Reads diagnostic lines until the endpoint appears or the stream ends.
    async fn scan(
        mut lines: Lines<BufReader<ChildStderr>>,
    ) -> std::io::Result<Option<(ControlEndpoint, Lines<BufReader<ChildStderr>>)>> {
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if let Some(url) = match_endpoint(line) {
                return Ok(Some((ControlEndpoint(url.to_owned()), lines)));
            }
            trace!(%line, "Chrome stderr");
        }

        Ok(None)
    }

    /// Discards remaining diagnostic output after discovery.
    async fn drain(mut lines: Lines<BufReader<ChildStderr>>) {
        while let Ok(Some(_)) = lines.next_line().await {}
    }

    /// Distinguishes a crash from a closed stream on a live process.
    async fn classify_silent_end(&mut self) -> Error {
        match time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                warn!(pid = self.pid, code = status.code(), "Chrome exited before endpoint discovery");
                Error::process_crashed(status.code())
            }
            Ok(Err(e)) => e.into(),
            Err(_) => Error::EndpointNotFound,
        }
    }

    /// Resolves only if the process exits without having been terminated.
    ///
    /// Intended for `select!` against in-flight protocol work: a non-zero
    /// exit mid-handshake surfaces as [`Error::ProcessCrashed`]. A clean
    /// exit never resolves; the channel side will observe the closure.
    pub async fn crashed(&mut self) -> Error {
        match self.child.wait().await {
            Ok(status) if !status.success() => {
                warn!(pid = self.pid, code = status.code(), "Chrome crashed mid-session");
                Error::process_crashed(status.code())
            }
            Ok(_) => std::future::pending::<Error>().await,
            Err(e) => e.into(),
        }
    }

    /// Forcefully terminates the process and reaps it.
    ///
    /// Idempotent: the second call, and a call after natural exit, are
    /// no-ops. Never fails; kill errors are logged and swallowed since the
    /// process is gone either way.
    pub async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        if let Err(e) = self.child.start_kill() {
            debug!(pid = self.pid, error = %e, "Kill signal not delivered (already exited?)");
        }
        if let Err(e) = self.child.wait().await {
            debug!(pid = self.pid, error = %e, "Failed to reap Chrome process");
        }

        info!(pid = self.pid, "Chrome process terminated");
    }
}

impl Drop for ChromeProcess {
    fn drop(&mut self) {
        if !self.terminated
            && let Err(e) = self.child.start_kill()
        {
            debug!(pid = self.pid, error = %e, "Failed to send kill signal in Drop");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_endpoint_exact_url() {
        let line = "DevTools listening on ws://127.0.0.1:9222/devtools/browser/abc-123";
        assert_eq!(
            match_endpoint(line),
            Some("ws://127.0.0.1:9222/devtools/browser/abc-123")
        );
    }

    #[test]
    fn test_match_endpoint_rejects_noise() {
        assert_eq!(match_endpoint(""), None);
        assert_eq!(match_endpoint("[1107/203645.898955:ERROR:gpu_init.cc]"), None);
        assert_eq!(
            match_endpoint("DevTools listening on http://127.0.0.1:9222/json"),
            None
        );
        // Non-loopback hosts are not accepted.
        assert_eq!(
            match_endpoint("DevTools listening on ws://10.0.0.1:9222/devtools/browser/abc"),
            None
        );
    }

    #[test]
    fn test_match_endpoint_rejects_trailing_garbage() {
        assert_eq!(
            match_endpoint("DevTools listening on ws://127.0.0.1:9222/devtools/browser/abc !"),
            None
        );
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;

        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;

        /// Writes an executable shell script standing in for the browser.
        ///
        /// The script receives the fixed Chrome flags and ignores them.
        fn fake_chrome(body: &str) -> (tempfile::TempDir, PathBuf) {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("fake-chrome");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");

            let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).expect("chmod");

            (dir, path)
        }

        #[tokio::test]
        async fn test_endpoint_discovered_once_later_lines_ignored() {
            let (_dir, binary) = fake_chrome(
                "echo 'DevTools listening on ws://127.0.0.1:9222/devtools/browser/abc-123' >&2\n\
                 echo 'DevTools listening on ws://127.0.0.1:9999/devtools/browser/other' >&2\n\
                 sleep 5",
            );

            let mut process = ChromeProcess::start(&binary).expect("start");
            let endpoint = process
                .discover_endpoint(Duration::from_secs(5))
                .await
                .expect("discover");
            assert_eq!(
                endpoint.as_str(),
                "ws://127.0.0.1:9222/devtools/browser/abc-123"
            );

            // Repeat discovery returns the published endpoint unchanged.
            let again = process
                .discover_endpoint(Duration::from_secs(5))
                .await
                .expect("rediscover");
            assert_eq!(again, endpoint);

            process.terminate().await;
        }

        #[tokio::test]
        async fn test_exit_before_discovery_is_process_crashed() {
            let (_dir, binary) = fake_chrome("exit 1");

            let mut process = ChromeProcess::start(&binary).expect("start");
            let err = process
                .discover_endpoint(Duration::from_secs(5))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::ProcessCrashed { code: Some(1) }));
        }

        #[tokio::test]
        async fn test_stream_end_without_match_is_endpoint_not_found() {
            let (_dir, binary) = fake_chrome("exec 2>&-\nsleep 5");

            let mut process = ChromeProcess::start(&binary).expect("start");
            let err = process
                .discover_endpoint(Duration::from_secs(5))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::EndpointNotFound));

            process.terminate().await;
        }

        #[tokio::test]
        async fn test_silent_process_times_out() {
            let (_dir, binary) = fake_chrome("sleep 5");

            let mut process = ChromeProcess::start(&binary).expect("start");
            let err = process
                .discover_endpoint(Duration::from_millis(200))
                .await
                .unwrap_err();
            assert!(err.is_timeout());

            process.terminate().await;
        }

        #[tokio::test]
        async fn test_terminate_is_idempotent() {
            let (_dir, binary) = fake_chrome("sleep 5");

            let mut process = ChromeProcess::start(&binary).expect("start");
            process.terminate().await;
            process.terminate().await;
        }

        #[tokio::test]
        async fn test_terminate_after_natural_exit_is_safe() {
            let (_dir, binary) = fake_chrome("exit 0");

            let mut process = ChromeProcess::start(&binary).expect("start");
            // Give the script time to exit on its own.
            time::sleep(Duration::from_millis(100)).await;
            process.terminate().await;
            process.terminate().await;
        }

        #[tokio::test]
        async fn test_missing_binary_is_spawn_error() {
            let err = ChromeProcess::start("/nonexistent/chrome").unwrap_err();
            assert!(matches!(err, Error::Spawn { .. }));
        }

        #[tokio::test]
        async fn test_crashed_resolves_on_nonzero_exit() {
            let (_dir, binary) = fake_chrome("sleep 0.1\nexit 3");

            let mut process = ChromeProcess::start(&binary).expect("start");
            let err = process.crashed().await;
            assert!(matches!(err, Error::ProcessCrashed { code: Some(3) }));
        }
    }
}
