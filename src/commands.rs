//! CLI command orchestration.
//!
//! Each handler corresponds to a subcommand in `main.rs`. Handlers run
//! discovery, enforce the close-the-application precondition, start engine
//! jobs, and translate the event stream into terminal output. They never
//! mutate profile files themselves.

use anyhow::{Context, Result, bail};
use comfy_table::Color;
use inquire::{Confirm, MultiSelect};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::apps::MozApp;
use crate::discover::{ResolvedProfile, discover_all};
use crate::engine::{Engine, Job, OperationHandle};
use crate::events::Event;
use crate::guard::AppCloser;
use crate::paths::BasePaths;
use crate::ui::Ui;

/// List discovered profiles, default profiles first.
pub fn list(paths: &BasePaths, ui: &Ui) -> Result<()> {
    let profiles = discover_all(paths)?;

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Neither Firefox nor Thunderbird has a profiles.ini on this machine.");
        return Ok(());
    }

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("App"),
        ui.header_cell("Profile"),
        ui.header_cell("Path"),
        ui.header_cell("Size"),
    ]);

    for profile in &profiles {
        let marker = if profile.is_default {
            ui.colored_cell("★ DEFAULT", Color::Green)
        } else {
            ui.cell("")
        };
        let size = crate::fs_utils::dir_size(&profile.path)
            .map(format_bytes)
            .unwrap_or_else(|_| "?".to_string());

        table.add_row(vec![
            marker,
            ui.cell(profile.app.display_name()),
            ui.cell(profile.folder_name()),
            ui.cell(profile.path.display().to_string()),
            ui.cell(size),
        ]);
    }

    ui.section("Detected profiles");
    ui.println(table.to_string());
    ui.newline();
    ui.info("The default profile is the one the application is likely using.");
    Ok(())
}

/// Back up selected profiles into a single zip archive.
#[allow(clippy::too_many_arguments)]
pub fn backup(
    paths: &BasePaths,
    engine: &Engine,
    ui: &Ui,
    closer: &dyn AppCloser,
    selected_names: &[String],
    app_filter: Option<MozApp>,
    all: bool,
    output: Option<PathBuf>,
    timeout_secs: u64,
) -> Result<()> {
    let mut candidates = discover_all(paths)?;
    if let Some(app) = app_filter {
        candidates.retain(|p| p.app == app);
    }
    if candidates.is_empty() {
        bail!("No profiles found to back up.");
    }

    let selected = if all {
        candidates
    } else if !selected_names.is_empty() {
        select_by_name(candidates, selected_names)?
    } else {
        select_interactive(candidates)?
    };

    // Hard precondition: the owning applications must be gone before any of
    // their files are read, or half-written databases end up in the archive.
    let timeout = Duration::from_secs(timeout_secs);
    let mut apps: Vec<MozApp> = selected.iter().map(|p| p.app).collect();
    apps.sort();
    apps.dedup();
    for app in apps {
        closer
            .close(app.process_name(), timeout)
            .with_context(|| format!("Could not close {}.", app.display_name()))?;
    }

    let archive = output.unwrap_or_else(|| default_archive_path(paths));
    let sources: Vec<PathBuf> = selected.iter().map(|p| p.path.clone()).collect();

    let handle = engine
        .try_start(Job::Backup {
            sources,
            archive: archive.clone(),
        })
        .context("Cannot start backup")?;

    run_with_progress(handle, ui, "Backup in progress …")?;
    ui.info(format!("Archive written to {}", archive.display()));
    Ok(())
}

/// Restore an archive into an application's profile area.
#[allow(clippy::too_many_arguments)]
pub fn restore(
    paths: &BasePaths,
    engine: &Engine,
    ui: &Ui,
    closer: &dyn AppCloser,
    archive: &Path,
    app: MozApp,
    folder_name: Option<String>,
    assume_yes: bool,
    timeout_secs: u64,
) -> Result<()> {
    if !archive.is_file() {
        bail!("Archive not found: {}", archive.display());
    }

    // Restore next to the existing profiles when there are any, otherwise
    // into the application's base directory.
    let existing = discover_all(paths)?;
    let target_parent = existing
        .iter()
        .find(|p| p.app == app)
        .and_then(|p| p.path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| paths.base(app).to_path_buf());

    let name = match folder_name {
        Some(name) => name,
        None => archive
            .file_stem()
            .and_then(|s| s.to_str())
            .context("Archive has no usable file name")?
            .to_string(),
    };
    let dest = target_parent.join(&name);

    if !assume_yes {
        let prompt = format!(
            "Restore '{}' to {}?",
            archive.display(),
            dest.display()
        );
        let confirmed = Confirm::new(&prompt)
            .with_default(false)
            .with_help_message("An existing directory at the destination will be removed")
            .prompt()
            .context("Confirmation cancelled")?;
        if !confirmed {
            ui.warn("Restore cancelled.");
            return Ok(());
        }
    }

    closer
        .close(app.process_name(), Duration::from_secs(timeout_secs))
        .with_context(|| format!("Could not close {}.", app.display_name()))?;

    let handle = engine
        .try_start(Job::Restore {
            archive: archive.to_path_buf(),
            dest: dest.clone(),
        })
        .context("Cannot start restore")?;

    run_with_progress(handle, ui, "Restore in progress …")?;
    ui.info(format!("Profile restored to {}", dest.display()));
    Ok(())
}

/// Run diagnostics.
pub fn doctor(paths: &BasePaths, ui: &Ui) -> Result<()> {
    crate::doctor::run_doctor(paths, ui);
    Ok(())
}

/// Drive an operation handle to completion, rendering events as they arrive.
fn run_with_progress(handle: OperationHandle, ui: &Ui, title: &str) -> Result<()> {
    let bar = ui.percent_bar(title.to_string());
    let mut outcome: Result<()> = Ok(());

    for event in handle.events().iter() {
        match event {
            Event::Progress(percent) => bar.set_position(u64::from(percent)),
            Event::Log(message) => {
                if ui.progress_enabled {
                    bar.set_message(message);
                } else {
                    ui.info(message);
                }
            }
            Event::Completed => {
                ui.bar_finish_ok(&bar, "Operation finished successfully.");
            }
            Event::Failed(message) => {
                ui.bar_finish_err(&bar, &message);
                outcome = Err(anyhow::anyhow!(message));
            }
        }
    }

    handle.wait();
    outcome
}

fn default_archive_path(paths: &BasePaths) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    paths.home.join(format!("MozMover_{}.zip", date))
}

fn select_by_name(
    candidates: Vec<ResolvedProfile>,
    names: &[String],
) -> Result<Vec<ResolvedProfile>> {
    let mut selected = Vec::new();
    for name in names {
        match candidates.iter().find(|p| p.folder_name() == name) {
            Some(profile) => selected.push(profile.clone()),
            None => bail!(
                "No profile named '{}'.\nHint: Use 'mozmover list' to see detected profiles.",
                name
            ),
        }
    }
    Ok(selected)
}

fn select_interactive(candidates: Vec<ResolvedProfile>) -> Result<Vec<ResolvedProfile>> {
    let options: Vec<String> = candidates
        .iter()
        .map(|p| {
            let flag = if p.is_default { " ★ DEFAULT" } else { "" };
            format!(
                "{}{} – {}",
                p.app.display_name().to_uppercase(),
                flag,
                p.folder_name()
            )
        })
        .collect();

    // Pre-select the default profiles; they are what the user most likely
    // wants to carry over.
    let defaults: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_default)
        .map(|(i, _)| i)
        .collect();

    let chosen = MultiSelect::new("Select profiles to back up:", options.clone())
        .with_default(&defaults)
        .with_help_message("Space to select, Enter to confirm")
        .prompt()
        .context("Profile selection cancelled")?;

    let selected: Vec<ResolvedProfile> = chosen
        .into_iter()
        .filter_map(|choice| {
            options
                .iter()
                .position(|o| *o == choice)
                .map(|i| candidates[i].clone())
        })
        .collect();

    if selected.is_empty() {
        bail!("Select at least one profile.");
    }
    Ok(selected)
}

/// Format bytes as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, EngineResult};
    use crate::test_utils::setup_test_paths;
    use crate::ui::ColorMode;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    /// Records close requests instead of signalling real processes.
    #[derive(Default)]
    struct RecordingCloser {
        closed: RefCell<Vec<String>>,
    }

    impl AppCloser for RecordingCloser {
        fn close(&self, name: &str, _timeout: Duration) -> EngineResult<()> {
            self.closed.borrow_mut().push(name.to_string());
            Ok(())
        }
    }

    struct StubbornCloser;

    impl AppCloser for StubbornCloser {
        fn close(&self, name: &str, _timeout: Duration) -> EngineResult<()> {
            Err(EngineError::ProcessStillRunning(name.to_string()))
        }
    }

    fn seed_profile(paths: &BasePaths, app: MozApp, folder: &str, default: bool) {
        let base = paths.base(app).to_path_buf();
        fs::create_dir_all(base.join(folder)).unwrap();
        fs::write(base.join(folder).join("prefs.js"), "user_pref").unwrap();
        let default_line = if default { "Default=1\n" } else { "" };
        let ini = format!("[Profile0]\nPath={}\n{}", folder, default_line);
        fs::write(base.join("profiles.ini"), ini).unwrap();
    }

    #[test]
    fn test_list_empty() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        assert!(list(&paths, &test_ui()).is_ok());
    }

    #[test]
    fn test_list_with_profiles() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        seed_profile(&paths, MozApp::Firefox, "aaaa.default", true);
        assert!(list(&paths, &test_ui()).is_ok());
    }

    #[test]
    fn test_backup_all_round_trips() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let engine = Engine::new(paths.lock_file.clone());
        seed_profile(&paths, MozApp::Firefox, "aaaa.default", true);
        let out = temp.path().join("backup.zip");
        let closer = RecordingCloser::default();

        backup(
            &paths,
            &engine,
            &test_ui(),
            &closer,
            &[],
            None,
            true,
            Some(out.clone()),
            1,
        )
        .unwrap();
        assert!(out.exists());
        // Only Firefox profiles were selected, so only Firefox gets closed.
        assert_eq!(*closer.closed.borrow(), vec!["firefox".to_string()]);

        restore(
            &paths,
            &engine,
            &test_ui(),
            &closer,
            &out,
            MozApp::Firefox,
            Some("bbbb.restored".to_string()),
            true,
            1,
        )
        .unwrap();
        // The writer stored one top-level folder; it lands under the chosen name.
        assert!(
            paths
                .base(MozApp::Firefox)
                .join("bbbb.restored")
                .join("prefs.js")
                .exists()
        );
    }

    #[test]
    fn test_backup_unknown_profile_name() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let engine = Engine::new(paths.lock_file.clone());
        seed_profile(&paths, MozApp::Firefox, "aaaa.default", true);

        let err = backup(
            &paths,
            &engine,
            &test_ui(),
            &RecordingCloser::default(),
            &["nope".to_string()],
            None,
            false,
            None,
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_backup_aborts_when_application_stays_running() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let engine = Engine::new(paths.lock_file.clone());
        seed_profile(&paths, MozApp::Firefox, "aaaa.default", true);
        let out = temp.path().join("backup.zip");

        let err = backup(
            &paths,
            &engine,
            &test_ui(),
            &StubbornCloser,
            &[],
            None,
            true,
            Some(out.clone()),
            1,
        )
        .unwrap_err();

        assert!(err.to_string().contains("Could not close Firefox"));
        // Precondition failures must not leave any file behind.
        assert!(!out.exists());
    }

    #[test]
    fn test_restore_missing_archive() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let engine = Engine::new(paths.lock_file.clone());

        let err = restore(
            &paths,
            &engine,
            &test_ui(),
            &RecordingCloser::default(),
            &temp.path().join("nope.zip"),
            MozApp::Firefox,
            None,
            true,
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Archive not found"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
