//! Profile discovery.
//!
//! Maps parsed registry sections to concrete, existing profile directories
//! and works out which one is the default. The default rule mirrors what the
//! applications do themselves:
//!
//! - if any `Install*` section exists, its `Default` value names the default
//!   profile folder and overrides per-profile `Default=1` flags; when several
//!   `Install*` sections are present the last one parsed wins, and a last
//!   section without a `Default` key clears the override;
//! - otherwise a profile with `Default=1` is the default.

use std::path::{Path, PathBuf};

use crate::apps::MozApp;
use crate::error::{EngineError, EngineResult};
use crate::paths::BasePaths;
use crate::registry::parse_registry;

/// A discovered, validated profile directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub app: MozApp,
    /// Absolute path to an existing directory.
    pub path: PathBuf,
    /// At most one profile per application carries this flag.
    pub is_default: bool,
}

impl ResolvedProfile {
    /// Final path component, i.e. the profile folder name.
    pub fn folder_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("?")
    }
}

/// Discover the profiles of a single application.
///
/// A missing registry yields an empty list: the application was simply never
/// installed or never run, which is a valid state rather than an error.
/// Registry entries whose directory does not exist are skipped silently.
pub fn find_profiles(base: &Path, app: MozApp) -> EngineResult<Vec<ResolvedProfile>> {
    let sections = match parse_registry(&base.join("profiles.ini")) {
        Ok(sections) => sections,
        Err(EngineError::RegistryMissing(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    // Later Install sections override earlier ones wholesale: only the last
    // section's Default lookup counts, even when it yields nothing.
    let install_default = sections
        .iter()
        .rfind(|s| s.name.starts_with("Install"))
        .and_then(|s| s.get("Default"))
        .map(str::to_string);

    let mut profiles = Vec::new();
    for section in sections.iter().filter(|s| s.name.starts_with("Profile")) {
        let Some(rel) = section.get("Path") else {
            continue;
        };

        let path = if Path::new(rel).is_absolute() {
            PathBuf::from(rel)
        } else {
            base.join(rel)
        };
        if !path.is_dir() {
            log::debug!("skipping {} profile entry {:?}: not a directory", app, path);
            continue;
        }

        let folder = path.file_name().and_then(|n| n.to_str());
        let is_default = match &install_default {
            Some(name) => folder == Some(name.as_str()),
            None => section.get("Default") == Some("1"),
        };

        profiles.push(ResolvedProfile {
            app,
            path,
            is_default,
        });
    }

    Ok(profiles)
}

/// Discover profiles across all supported applications, default profiles
/// first, then by application tag; ties keep registry order (stable sort).
pub fn discover_all(paths: &BasePaths) -> EngineResult<Vec<ResolvedProfile>> {
    let mut all = Vec::new();
    for app in MozApp::all() {
        all.extend(find_profiles(paths.base(app), app)?);
    }
    all.sort_by_key(|p| (!p.is_default, p.app));
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_registry(base: &Path, content: &str) {
        fs::create_dir_all(base).unwrap();
        fs::write(base.join("profiles.ini"), content).unwrap();
    }

    fn make_profile_dir(base: &Path, name: &str) {
        fs::create_dir_all(base.join(name)).unwrap();
    }

    #[test]
    fn test_missing_registry_yields_empty() {
        let temp = TempDir::new().unwrap();
        let profiles = find_profiles(temp.path(), MozApp::Firefox).unwrap();
        assert!(profiles.is_empty());
    }

    #[test]
    fn test_profile_without_path_skipped() {
        let temp = TempDir::new().unwrap();
        write_registry(temp.path(), "[Profile0]\nName=broken\n");
        assert!(find_profiles(temp.path(), MozApp::Firefox).unwrap().is_empty());
    }

    #[test]
    fn test_nonexistent_directory_skipped() {
        let temp = TempDir::new().unwrap();
        write_registry(temp.path(), "[Profile0]\nPath=gone.default\n");
        assert!(find_profiles(temp.path(), MozApp::Firefox).unwrap().is_empty());
    }

    #[test]
    fn test_default_flag_without_install_section() {
        let temp = TempDir::new().unwrap();
        make_profile_dir(temp.path(), "aa.default");
        make_profile_dir(temp.path(), "bb.other");
        write_registry(
            temp.path(),
            "[Profile0]\nPath=aa.default\nDefault=1\n[Profile1]\nPath=bb.other\n",
        );

        let profiles = find_profiles(temp.path(), MozApp::Firefox).unwrap();
        assert_eq!(profiles.len(), 2);
        assert!(profiles[0].is_default);
        assert!(!profiles[1].is_default);
    }

    #[test]
    fn test_install_default_overrides_profile_flag() {
        let temp = TempDir::new().unwrap();
        make_profile_dir(temp.path(), "aa.default");
        make_profile_dir(temp.path(), "bb.release");
        write_registry(
            temp.path(),
            "[Install0]\nDefault=bb.release\n\
             [Profile0]\nPath=aa.default\nDefault=1\n\
             [Profile1]\nPath=bb.release\n",
        );

        let profiles = find_profiles(temp.path(), MozApp::Firefox).unwrap();
        let default: Vec<_> = profiles.iter().filter(|p| p.is_default).collect();
        assert_eq!(default.len(), 1);
        assert_eq!(default[0].folder_name(), "bb.release");
    }

    #[test]
    fn test_last_install_section_wins() {
        let temp = TempDir::new().unwrap();
        make_profile_dir(temp.path(), "aa");
        make_profile_dir(temp.path(), "bb");
        write_registry(
            temp.path(),
            "[InstallAAA]\nDefault=aa\n[InstallBBB]\nDefault=bb\n\
             [Profile0]\nPath=aa\n[Profile1]\nPath=bb\n",
        );

        let profiles = find_profiles(temp.path(), MozApp::Firefox).unwrap();
        assert!(!profiles[0].is_default);
        assert!(profiles[1].is_default);

        // And the other ordering.
        write_registry(
            temp.path(),
            "[InstallBBB]\nDefault=bb\n[InstallAAA]\nDefault=aa\n\
             [Profile0]\nPath=aa\n[Profile1]\nPath=bb\n",
        );
        let profiles = find_profiles(temp.path(), MozApp::Firefox).unwrap();
        assert!(profiles[0].is_default);
        assert!(!profiles[1].is_default);
    }

    #[test]
    fn test_trailing_install_without_default_clears_override() {
        let temp = TempDir::new().unwrap();
        make_profile_dir(temp.path(), "aa");
        make_profile_dir(temp.path(), "bb");
        // The last Install section has no Default key, so no override is in
        // effect and the per-profile flag decides.
        write_registry(
            temp.path(),
            "[InstallAAA]\nDefault=aa\n[InstallBBB]\nLocked=1\n\
             [Profile0]\nPath=aa\n[Profile1]\nPath=bb\nDefault=1\n",
        );

        let profiles = find_profiles(temp.path(), MozApp::Firefox).unwrap();
        assert_eq!(profiles.len(), 2);
        assert!(!profiles[0].is_default);
        assert_eq!(profiles[1].folder_name(), "bb");
        assert!(profiles[1].is_default);
    }

    #[test]
    fn test_absolute_path_used_as_is() {
        let temp = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let abs = elsewhere.path().join("roaming.profile");
        fs::create_dir_all(&abs).unwrap();
        write_registry(
            temp.path(),
            &format!("[Profile0]\nPath={}\n", abs.display()),
        );

        let profiles = find_profiles(temp.path(), MozApp::Firefox).unwrap();
        assert_eq!(profiles[0].path, abs);
    }

    #[test]
    fn test_discover_all_sorts_defaults_first() {
        let temp = TempDir::new().unwrap();
        let ff = temp.path().join("ff");
        let tb = temp.path().join("tb");
        make_profile_dir(&ff, "ff.plain");
        make_profile_dir(&tb, "tb.default");
        write_registry(&ff, "[Profile0]\nPath=ff.plain\n");
        write_registry(&tb, "[Profile0]\nPath=tb.default\nDefault=1\n");

        let paths = BasePaths {
            firefox: ff,
            thunderbird: tb,
            home: temp.path().to_path_buf(),
            lock_file: temp.path().join("lock"),
        };

        let all = discover_all(&paths).unwrap();
        assert_eq!(all.len(), 2);
        // Thunderbird's default sorts ahead of Firefox's non-default.
        assert_eq!(all[0].app, MozApp::Thunderbird);
        assert!(all[0].is_default);
        assert_eq!(all[1].app, MozApp::Firefox);
    }
}
