//! Shared plumbing for the `daic` and `tasks` binaries.
//!
//! Both commands are thin invokers over brainworm-core: resolve the
//! project, construct the stores, call one operation, print, exit. The
//! exit-code scheme is the error's category: 0 success, 2 invalid
//! arguments, 3 not found, 4 precondition failed, 1 anything else.

use brainworm_core::config::Config;
use brainworm_core::correlation::CorrelationManager;
use brainworm_core::lock::INTERACTIVE_TIMEOUT;
use brainworm_core::state::StateStore;
use brainworm_core::{BrainwormError, ProjectPaths, Result};

/// Everything a CLI command needs, constructed once per invocation.
pub struct CliContext {
    pub paths: ProjectPaths,
    pub config: Config,
    pub state: StateStore,
    pub correlation: CorrelationManager,
}

impl CliContext {
    /// Resolves the project from the current directory. CLI commands require
    /// an existing `.brainworm/` tree; they never scaffold one implicitly.
    pub fn resolve() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|source| BrainwormError::Io {
            context: "determining current directory".to_string(),
            source,
        })?;
        let paths = ProjectPaths::locate(&cwd);

        if !paths.brainworm_dir().is_dir() {
            return Err(BrainwormError::ProjectRootNotFound(cwd));
        }

        let config = Config::load(&paths.config_file())?;
        Ok(Self {
            // A human at a terminal would rather wait out contention than
            // see a spurious timeout.
            state: StateStore::with_lock_timeout(
                paths.unified_state_file(),
                INTERACTIVE_TIMEOUT,
            ),
            correlation: CorrelationManager::new(paths.correlation_file()),
            paths,
            config,
        })
    }
}

/// Prints the error and terminates with its category exit code.
pub fn exit_with(err: BrainwormError) -> ! {
    eprintln!("error: {err}");
    std::process::exit(err.exit_code());
}

/// Parses `--services=a,b,c` style lists.
pub fn parse_services(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
