//! First-run scaffolding of the `.brainworm/` tree.
//!
//! `session_start` calls this on every invocation; everything here is
//! idempotent, so N runs leave the tree bit-identical to one run apart from
//! swept stale files. Wrapper scripts are version-stamped and rewritten
//! only when the stamp changes.

use std::path::Path;

use fs_err as fs;

use crate::config::Config;
use crate::error::{io_ctx, BrainwormError, Result};
use crate::events::timing;
use crate::flags::Flags;
use crate::paths::ProjectPaths;
use crate::state::{DaicMode, StateStore};

const WRAPPER_VERSION: &str = "1";

/// What a scaffold pass actually did, for the session_start event payload.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ScaffoldReport {
    pub created_config: bool,
    pub created_state: bool,
    pub wrote_wrappers: bool,
    pub swept_flags: usize,
    pub swept_checkpoints: usize,
}

impl ScaffoldReport {
    pub fn did_anything(&self) -> bool {
        *self != ScaffoldReport::default()
    }
}

pub fn ensure_project(paths: &ProjectPaths) -> Result<ScaffoldReport> {
    let mut report = ScaffoldReport::default();

    for dir in [
        paths.brainworm_dir(),
        paths.state_dir(),
        paths.flags_dir(),
        paths.events_dir(),
        paths.tasks_dir(),
        paths.logs_dir(),
        paths.memory_dir(),
        paths.bin_dir(),
    ] {
        fs::create_dir_all(&dir)
            .map_err(io_ctx(format!("creating directory {}", dir.display())))?;
    }

    // Self-ignoring directory: session state and the event database must
    // never show up as uncommitted changes in the user's repository.
    let gitignore = paths.brainworm_dir().join(".gitignore");
    if !gitignore.exists() {
        fs::write(&gitignore, "*\n")
            .map_err(io_ctx(format!("writing {}", gitignore.display())))?;
    }

    let config_path = paths.config_file();
    if !config_path.exists() {
        Config::default().save(&config_path)?;
        report.created_config = true;
    }

    // A fresh project starts in the configured mode; an existing state
    // document is never reseeded.
    let config = Config::load(&config_path)?;
    let initial_mode: DaicMode = config.daic.default_mode.parse().map_err(|err| {
        BrainwormError::ConfigMalformed {
            path: config_path.clone(),
            details: format!("daic.default_mode: {err}"),
        }
    })?;

    let store = StateStore::new(paths.unified_state_file());
    report.created_state = store.initialize(initial_mode)?;

    report.wrote_wrappers = write_wrappers(paths)?;

    report.swept_flags = Flags::new(paths.flags_dir()).sweep_stale();
    report.swept_checkpoints = timing::sweep_stale(&paths.state_dir());

    Ok(report)
}

/// Writes the `daic` and `tasks` wrapper scripts. Returns true when a script
/// was created or its version stamp changed.
fn write_wrappers(paths: &ProjectPaths) -> Result<bool> {
    let mut wrote = false;
    for name in ["daic", "tasks"] {
        let script_path = paths.bin_dir().join(name);
        let script = wrapper_script(name);

        let current = fs::read_to_string(&script_path).unwrap_or_default();
        if current == script {
            continue;
        }

        fs::write(&script_path, &script)
            .map_err(io_ctx(format!("writing wrapper {}", script_path.display())))?;
        make_executable(&script_path)?;
        wrote = true;
    }
    Ok(wrote)
}

fn wrapper_script(name: &str) -> String {
    format!(
        "#!/bin/sh\n\
         # brainworm wrapper v{WRAPPER_VERSION} (generated; do not edit)\n\
         exec brainworm-{name} \"$@\"\n"
    )
}

fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .map_err(io_ctx(format!("reading permissions of {}", path.display())))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)
            .map_err(io_ctx(format!("marking {} executable", path.display())))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scaffold_creates_the_full_layout() {
        let temp = tempdir().unwrap();
        let paths = ProjectPaths::at_root(temp.path());

        let report = ensure_project(&paths).unwrap();
        assert!(report.created_config);
        assert!(report.created_state);
        assert!(report.wrote_wrappers);

        for dir in [
            paths.state_dir(),
            paths.flags_dir(),
            paths.events_dir(),
            paths.tasks_dir(),
            paths.logs_dir(),
            paths.memory_dir(),
        ] {
            assert!(dir.is_dir(), "{} missing", dir.display());
        }
        assert!(paths.config_file().exists());
        assert!(paths.unified_state_file().exists());
        assert!(paths.bin_dir().join("daic").exists());
        assert!(paths.bin_dir().join("tasks").exists());
        assert_eq!(
            fs::read_to_string(paths.brainworm_dir().join(".gitignore")).unwrap(),
            "*\n"
        );
    }

    #[test]
    fn second_run_changes_nothing() {
        let temp = tempdir().unwrap();
        let paths = ProjectPaths::at_root(temp.path());

        ensure_project(&paths).unwrap();
        let config_before = fs::read_to_string(paths.config_file()).unwrap();
        let state_before = fs::read_to_string(paths.unified_state_file()).unwrap();
        let wrapper_before = fs::read_to_string(paths.bin_dir().join("daic")).unwrap();

        let report = ensure_project(&paths).unwrap();
        assert!(!report.did_anything());

        assert_eq!(fs::read_to_string(paths.config_file()).unwrap(), config_before);
        assert_eq!(
            fs::read_to_string(paths.unified_state_file()).unwrap(),
            state_before
        );
        assert_eq!(
            fs::read_to_string(paths.bin_dir().join("daic")).unwrap(),
            wrapper_before
        );
    }

    #[test]
    fn configured_default_mode_seeds_the_state_document() {
        let temp = tempdir().unwrap();
        let paths = ProjectPaths::at_root(temp.path());
        fs::create_dir_all(paths.brainworm_dir()).unwrap();
        fs::write(
            paths.config_file(),
            "[daic]\ndefault_mode = \"implementation\"\n",
        )
        .unwrap();

        ensure_project(&paths).unwrap();

        let store = StateStore::new(paths.unified_state_file());
        assert_eq!(
            store.get_state().unwrap().daic_mode,
            DaicMode::Implementation
        );
    }

    #[test]
    fn default_mode_does_not_reseed_existing_state() {
        let temp = tempdir().unwrap();
        let paths = ProjectPaths::at_root(temp.path());
        ensure_project(&paths).unwrap();

        // Changing the config after first run must not flip live state.
        fs::write(
            paths.config_file(),
            "[daic]\ndefault_mode = \"implementation\"\n",
        )
        .unwrap();
        ensure_project(&paths).unwrap();

        let store = StateStore::new(paths.unified_state_file());
        assert_eq!(store.get_state().unwrap().daic_mode, DaicMode::Discussion);
    }

    #[test]
    fn invalid_default_mode_is_a_config_error() {
        let temp = tempdir().unwrap();
        let paths = ProjectPaths::at_root(temp.path());
        fs::create_dir_all(paths.brainworm_dir()).unwrap();
        fs::write(paths.config_file(), "[daic]\ndefault_mode = \"yolo\"\n").unwrap();

        assert!(matches!(
            ensure_project(&paths),
            Err(BrainwormError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn scaffold_does_not_clobber_user_config() {
        let temp = tempdir().unwrap();
        let paths = ProjectPaths::at_root(temp.path());
        fs::create_dir_all(paths.brainworm_dir()).unwrap();
        fs::write(paths.config_file(), "[daic]\nenabled = false\n").unwrap();

        let report = ensure_project(&paths).unwrap();
        assert!(!report.created_config);
        let content = fs::read_to_string(paths.config_file()).unwrap();
        assert!(content.contains("enabled = false"));
    }

    #[test]
    fn wrapper_scripts_are_executable() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let temp = tempdir().unwrap();
            let paths = ProjectPaths::at_root(temp.path());
            ensure_project(&paths).unwrap();

            let mode = fs::metadata(paths.bin_dir().join("tasks"))
                .unwrap()
                .permissions()
                .mode();
            assert_ne!(mode & 0o111, 0);
        }
    }
}
