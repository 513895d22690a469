//! Diagnostics for the `mozmover doctor` command.
//!
//! Checks the discovery inputs end to end: base directories, registry files,
//! the profiles they point at, default resolution, and whether the owning
//! applications are currently running (which would block backup/restore).

use crate::apps::MozApp;
use crate::discover::find_profiles;
use crate::error::EngineError;
use crate::guard::any_running;
use crate::paths::BasePaths;
use crate::registry::parse_registry;
use crate::ui::Ui;

pub fn run_doctor(paths: &BasePaths, ui: &Ui) {
    ui.section("mozmover doctor");
    ui.newline();

    check_step(ui, "Base directories", || {
        for app in MozApp::all() {
            let base = paths.base(app);
            if base.is_dir() {
                ui.println(format!(
                    "  {} {} base: {}",
                    ui.icon_ok(),
                    app.display_name(),
                    base.display()
                ));
            } else {
                // Not installed is a valid state, not a failure.
                ui.println(format!(
                    "  {} {} base missing: {} (not installed?)",
                    ui.icon_warn(),
                    app.display_name(),
                    base.display()
                ));
            }
        }
        true
    });

    check_step(ui, "Profile registries", || {
        let mut ok = true;
        for app in MozApp::all() {
            let registry = paths.registry(app);
            match parse_registry(&registry) {
                Ok(sections) => {
                    let profiles = sections
                        .iter()
                        .filter(|s| s.name.starts_with("Profile"))
                        .count();
                    ui.println(format!(
                        "  {} {}: {} section(s), {} profile entr{}",
                        ui.icon_ok(),
                        registry.display(),
                        sections.len(),
                        profiles,
                        if profiles == 1 { "y" } else { "ies" }
                    ));
                }
                Err(EngineError::RegistryMissing(_)) => {
                    ui.println(format!(
                        "  {} {} has no profiles.ini",
                        ui.icon_info(),
                        app.display_name()
                    ));
                }
                Err(e) => {
                    ui.println(format!("  {} {}: {}", ui.icon_err(), registry.display(), e));
                    ok = false;
                }
            }
        }
        ok
    });

    check_step(ui, "Profiles", || {
        let mut ok = true;
        for app in MozApp::all() {
            let profiles = match find_profiles(paths.base(app), app) {
                Ok(p) => p,
                Err(e) => {
                    ui.println(format!(
                        "  {} {} discovery failed: {}",
                        ui.icon_err(),
                        app.display_name(),
                        e
                    ));
                    ok = false;
                    continue;
                }
            };

            if profiles.is_empty() {
                ui.println(format!(
                    "  {} {}: no profiles",
                    ui.icon_info(),
                    app.display_name()
                ));
                continue;
            }

            let defaults = profiles.iter().filter(|p| p.is_default).count();
            for profile in &profiles {
                let flag = if profile.is_default { " (default)" } else { "" };
                ui.println(format!(
                    "    {} {}{}",
                    ui.icon_ok(),
                    profile.folder_name(),
                    flag
                ));
            }
            if defaults > 1 {
                ui.println(format!(
                    "  {} {} reports {} default profiles; registry is inconsistent",
                    ui.icon_err(),
                    app.display_name(),
                    defaults
                ));
                ok = false;
            } else if defaults == 0 {
                ui.println(format!(
                    "  {} {} has no default profile marked",
                    ui.icon_warn(),
                    app.display_name()
                ));
            }
        }
        ok
    });

    check_step(ui, "Running applications", || {
        for app in MozApp::all() {
            if any_running(app.process_name()) {
                ui.println(format!(
                    "  {} {} appears to be running; it will be closed before backup/restore",
                    ui.icon_warn(),
                    app.display_name()
                ));
            } else {
                ui.println(format!(
                    "  {} {} is not running",
                    ui.icon_ok(),
                    app.display_name()
                ));
            }
        }
        true
    });
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F)
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    if !check_fn() {
        ui.println(ui.colored("  Issues detected!", anstyle::AnsiColor::Red));
    }
    ui.newline();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_paths;
    use crate::ui::ColorMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_doctor_runs_on_empty_layout() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        run_doctor(&paths, &Ui::new(ColorMode::Never, false));
    }

    #[test]
    fn test_doctor_runs_with_profiles() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let base = paths.firefox.clone();
        fs::create_dir_all(base.join("aa.default")).unwrap();
        fs::write(
            base.join("profiles.ini"),
            "[Profile0]\nPath=aa.default\nDefault=1\n",
        )
        .unwrap();
        run_doctor(&paths, &Ui::new(ColorMode::Never, false));
    }
}
