//! Locating the Firecrawl CLI and checking its version.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use semver::Version;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::MIN_VERSION;
use crate::{Error, Result};

#[cfg(windows)]
const EXECUTABLE: &str = "firecrawl.cmd";
#[cfg(not(windows))]
const EXECUTABLE: &str = "firecrawl";

/// Handle to a Firecrawl CLI installation that meets [`MIN_VERSION`].
#[derive(Debug, Clone)]
pub struct FirecrawlCli {
    path: String,
    version: Version,
}

impl FirecrawlCli {
    /// Find `firecrawl` on `PATH` and ask it for its version.
    ///
    /// # Errors
    ///
    /// [`Error::FirecrawlNotInstalled`] when no executable is found or it
    /// does not answer `--version`; [`Error::Config`] when it is older than
    /// [`MIN_VERSION`].
    #[instrument(level = "debug")]
    pub async fn detect() -> Result<Self> {
        let path = std::env::var_os("PATH")
            .and_then(|dirs| locate(&dirs))
            .ok_or(Error::FirecrawlNotInstalled)?;
        let path = path.to_string_lossy().into_owned();
        let version = query_version(&path).await?;
        debug!(%path, %version, "Found firecrawl");
        Self::with_version(path, version)
    }

    /// Use an executable at a known path, rejecting versions below
    /// [`MIN_VERSION`].
    pub fn with_version(path: String, version: Version) -> Result<Self> {
        if version < MIN_VERSION {
            return Err(Error::Config(format!(
                "firecrawl {version} at {path} is too old; {MIN_VERSION} or newer is needed"
            )));
        }
        Ok(Self { path, version })
    }

    /// Path to the executable.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Detected version.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }
}

/// First `firecrawl` executable in the `PATH`-style list `dirs`.
fn locate(dirs: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(dirs)
        .map(|dir| dir.join(EXECUTABLE))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

async fn query_version(path: &str) -> Result<Version> {
    let output = Command::new(path).arg("--version").output().await?;
    if !output.status.success() {
        return Err(Error::FirecrawlNotInstalled);
    }
    parse_version(&String::from_utf8_lossy(&output.stdout))
}

/// Version number in `firecrawl --version` output.
///
/// Accepts `1.2.3`, `firecrawl 1.2.3` and `Firecrawl CLI v1.2.3`.
pub(crate) fn parse_version(output: &str) -> Result<Version> {
    static SEMVER: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let semver = SEMVER.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+").expect("semver pattern"));

    let found = semver
        .find(output)
        .ok_or_else(|| Error::Parse(format!("no version in firecrawl output: {:?}", output.trim())))?;
    Version::parse(found.as_str())
        .map_err(|e| Error::Parse(format!("bad firecrawl version '{}': {e}", found.as_str())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing_formats() {
        for output in ["1.2.3", "firecrawl 1.2.3", "Firecrawl CLI v1.2.3\n"] {
            let version = parse_version(output).unwrap();
            assert_eq!(version, Version::new(1, 2, 3), "failed on {output:?}");
        }
    }

    #[test]
    fn test_version_parsing_rejects_garbage() {
        assert!(matches!(parse_version("no version"), Err(Error::Parse(_))));
        assert!(parse_version("").is_err());
    }

    #[test]
    fn test_minimum_version_enforced() {
        let too_old = FirecrawlCli::with_version("/bin/firecrawl".into(), Version::new(1, 0, 9));
        assert!(matches!(too_old, Err(Error::Config(ref m)) if m.contains("too old")));

        let ok = FirecrawlCli::with_version("/bin/firecrawl".into(), MIN_VERSION).unwrap();
        assert_eq!(ok.path(), "/bin/firecrawl");
        assert_eq!(ok.version(), &Version::new(1, 1, 0));
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_skips_non_executables() {
        use std::os::unix::fs::PermissionsExt;

        let plain = tempfile::tempdir().unwrap();
        std::fs::write(plain.path().join(EXECUTABLE), "").unwrap();
        let bin = tempfile::tempdir().unwrap();
        let exe = bin.path().join(EXECUTABLE);
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dirs = std::env::join_paths([plain.path(), bin.path()]).unwrap();
        assert_eq!(locate(&dirs), Some(exe));

        let dirs = std::env::join_paths([plain.path()]).unwrap();
        assert_eq!(locate(&dirs), None);
    }
}
