use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

use crate::apps::MozApp;

/// Per-application base directories for the current platform.
///
/// Resolved once at startup; the fields are public so tests can point the
/// engine at a synthetic directory layout instead of the real home directory.
#[derive(Debug, Clone)]
pub struct BasePaths {
    /// Directory containing Firefox's `profiles.ini` and profile folders
    pub firefox: PathBuf,
    /// Directory containing Thunderbird's `profiles.ini` and profile folders
    pub thunderbird: PathBuf,
    /// User home directory (default location for backup archives)
    pub home: PathBuf,
    /// Lock file guarding the single-flight operation invariant
    pub lock_file: PathBuf,
}

impl BasePaths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        let home = base_dirs.home_dir().to_path_buf();

        #[cfg(target_os = "windows")]
        let (firefox, thunderbird) = {
            let appdata = std::env::var_os("APPDATA")
                .map(PathBuf::from)
                .context("APPDATA environment variable is not set")?;
            (
                appdata.join("Mozilla").join("Firefox"),
                appdata.join("Thunderbird"),
            )
        };

        #[cfg(target_os = "macos")]
        let (firefox, thunderbird) = (
            home.join("Library/Application Support/Firefox"),
            home.join("Library/Thunderbird"),
        );

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let (firefox, thunderbird) = (home.join(".mozilla/firefox"), home.join(".thunderbird"));

        let lock_file = std::env::temp_dir().join("mozmover.lock");

        Ok(Self {
            firefox,
            thunderbird,
            home,
            lock_file,
        })
    }

    /// Base directory for an application.
    pub fn base(&self, app: MozApp) -> &Path {
        match app {
            MozApp::Firefox => &self.firefox,
            MozApp::Thunderbird => &self.thunderbird,
        }
    }

    /// Path to an application's profile registry.
    pub fn registry(&self, app: MozApp) -> PathBuf {
        self.base(app).join("profiles.ini")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_path() {
        let paths = BasePaths::new().unwrap();
        assert!(paths.registry(MozApp::Firefox).ends_with("profiles.ini"));
        assert!(
            paths
                .registry(MozApp::Thunderbird)
                .starts_with(&paths.thunderbird)
        );
    }

    #[test]
    fn test_bases_are_distinct() {
        let paths = BasePaths::new().unwrap();
        assert_ne!(paths.base(MozApp::Firefox), paths.base(MozApp::Thunderbird));
    }
}
