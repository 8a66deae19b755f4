//! Browser version probing.
//!
//! One-shot synchronous invocation of `<binary> --version`, run to
//! completion with stdout/stderr captured. Used by callers to gate on a
//! minimum Chrome major version before attempting an export.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// First `major.minor[.patch...]` token surrounded by whitespace, e.g. the
/// version in `Google Chrome 119.0.6045.105`.
static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s(\d+)\.[\d.]+\s").expect("version pattern is valid"));

// ============================================================================
// Probe
// ============================================================================

/// Runs `<binary> --version` and returns the major version number.
///
/// Returns `Ok(None)` when the binary exits cleanly but its output carries
/// no recognizable version string.
///
/// # Errors
///
/// - [`Error::Spawn`] if the binary cannot be executed
/// - [`Error::VersionProbe`] with the captured stderr on non-zero exit
pub async fn probe_version(binary: impl AsRef<Path>) -> Result<Option<u32>> {
    let binary = binary.as_ref();

    let output = Command::new(binary)
        .arg("--version")
        .output()
        .await
        .map_err(|e| Error::spawn(format!("{}: {e}", binary.display())))?;

    if !output.status.success() {
        return Err(Error::version_probe(
            String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let major = parse_major_version(&stdout);
    debug!(binary = %binary.display(), ?major, "Version probe completed");

    Ok(major)
}

/// Extracts the major version from probe output.
fn parse_major_version(text: &str) -> Option<u32> {
    VERSION_PATTERN
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chrome_output() {
        assert_eq!(parse_major_version("Google Chrome 119.0.6045.105 \n"), Some(119));
        assert_eq!(parse_major_version("Chromium 92.0.4515.107 snap\n"), Some(92));
    }

    #[test]
    fn test_parse_requires_dotted_version() {
        assert_eq!(parse_major_version("Google Chrome\n"), None);
        assert_eq!(parse_major_version("version 119 beta\n"), None);
        assert_eq!(parse_major_version(""), None);
    }

    #[cfg(unix)]
    mod probe {
        use super::super::*;

        #[tokio::test]
        async fn test_probe_parses_version_from_stdout() {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("fake-chrome");
            std::fs::write(&path, "#!/bin/sh\necho 'Google Chrome 119.0.6045.105 '\n")
                .expect("write");
            let mut perms = std::fs::metadata(&path).expect("meta").permissions();
            use std::os::unix::fs::PermissionsExt;
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).expect("chmod");

            let major = probe_version(&path).await.expect("probe");
            assert_eq!(major, Some(119));
        }

        #[tokio::test]
        async fn test_probe_without_version_string_is_unknown() {
            let major = probe_version("/bin/true").await.expect("probe");
            assert_eq!(major, None);
        }

        #[tokio::test]
        async fn test_probe_nonzero_exit_is_error() {
            let err = probe_version("/bin/false").await.unwrap_err();
            assert!(matches!(err, Error::VersionProbe { .. }));
        }

        #[tokio::test]
        async fn test_probe_missing_binary_is_spawn_error() {
            let err = probe_version("/nonexistent/chrome").await.unwrap_err();
            assert!(matches!(err, Error::Spawn { .. }));
        }
    }
}
