use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const PROJECT_FILE: &str = ".tailrun.toml";

/// Global + per-project configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Milliseconds between drain steps.
    pub poll_interval_ms: u64,
    /// Mirror child output to the console while it runs.
    pub live: bool,
    /// Hand the command to the platform shell.
    pub shell: bool,
    /// Print the trace report when the command fails.
    pub trace_on_failure: bool,
    /// Show timing footer after each command.
    pub show_footer: bool,
    /// Kill the child after this many seconds.
    pub timeout_secs: Option<u64>,
    /// Where the stdout/stderr sinks live (system temp dir if unset).
    pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            live: false,
            shell: false,
            trace_on_failure: true,
            show_footer: true,
            timeout_secs: None,
            temp_dir: None,
        }
    }
}

impl Config {
    /// Load config with priority: .tailrun.toml (project) > ~/.config/tailrun/config.toml (global) > defaults.
    pub fn load() -> Self {
        Self::load_from(global_config_path().as_deref(), Path::new(PROJECT_FILE))
    }

    pub fn load_from(global: Option<&Path>, project: &Path) -> Self {
        let mut config = Self::default();

        // 1. Global config
        if let Some(path) = global
            && let Some(global) = load_file(path)
        {
            config = merge(config, global);
        }

        // 2. Project config (overrides global)
        if let Some(project) = load_file(project) {
            config = merge(config, project);
        }

        config
    }

    /// Generate a default config file content.
    pub fn default_toml() -> &'static str {
        r#"# tailrun configuration
# Place in ~/.config/tailrun/config.toml (global) or .tailrun.toml (per-project)

# Milliseconds between output drains while the command runs
poll_interval_ms = 250

# Mirror output to the console as it arrives
live = false

# Run the command through the shell (sh -c / cmd /C)
shell = false

# Print a trace report when the command exits non-zero
trace_on_failure = true

# Show timing footer after each command
show_footer = true

# Kill the command after this many seconds (unset = wait forever)
# timeout_secs = 600

# Directory for the temporary capture files (unset = system temp dir)
# temp_dir = "/tmp"
"#
    }
}

/// Partial config for TOML deserialization (all fields optional).
#[derive(Debug, Deserialize)]
struct PartialConfig {
    poll_interval_ms: Option<u64>,
    live: Option<bool>,
    shell: Option<bool>,
    trace_on_failure: Option<bool>,
    show_footer: Option<bool>,
    timeout_secs: Option<u64>,
    temp_dir: Option<PathBuf>,
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tailrun").join("config.toml"))
}

fn load_file(path: &Path) -> Option<PartialConfig> {
    match read_file(path) {
        Ok(partial) => partial,
        Err(e) => {
            tracing::warn!("skipping config: {e}");
            None
        }
    }
}

/// `Ok(None)` when the file simply does not exist.
fn read_file(path: &Path) -> Result<Option<PartialConfig>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn merge(base: Config, partial: PartialConfig) -> Config {
    Config {
        poll_interval_ms: partial.poll_interval_ms.unwrap_or(base.poll_interval_ms),
        live: partial.live.unwrap_or(base.live),
        shell: partial.shell.unwrap_or(base.shell),
        trace_on_failure: partial.trace_on_failure.unwrap_or(base.trace_on_failure),
        show_footer: partial.show_footer.unwrap_or(base.show_footer),
        timeout_secs: partial.timeout_secs.or(base.timeout_secs),
        temp_dir: partial.temp_dir.or(base.temp_dir),
    }
}

/// Write the default template to `.tailrun.toml` or the global location.
pub fn create_config(global: bool) -> Result<PathBuf, ConfigError> {
    let path = if global {
        global_config_path().ok_or(ConfigError::NoConfigDir)?
    } else {
        PathBuf::from(PROJECT_FILE)
    };
    write_template(&path)?;
    Ok(path)
}

fn write_template(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }
    std::fs::write(path, Config::default_toml()).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_partial() -> PartialConfig {
        PartialConfig {
            poll_interval_ms: None,
            live: None,
            shell: None,
            trace_on_failure: None,
            show_footer: None,
            timeout_secs: None,
            temp_dir: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ms, 250);
        assert!(!config.live);
        assert!(!config.shell);
        assert!(config.trace_on_failure);
        assert!(config.timeout_secs.is_none());
    }

    #[test]
    fn test_merge_partial() {
        let base = Config::default();
        let partial = PartialConfig {
            poll_interval_ms: Some(50),
            live: Some(true),
            timeout_secs: Some(30),
            ..empty_partial()
        };
        let merged = merge(base, partial);
        assert_eq!(merged.poll_interval_ms, 50);
        assert!(merged.live);
        assert_eq!(merged.timeout_secs, Some(30));
        assert!(merged.show_footer); // kept default
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
poll_interval_ms = 100
shell = true
temp_dir = "/var/tmp"
"#;
        let partial: PartialConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(partial.poll_interval_ms, Some(100));
        assert_eq!(partial.shell, Some(true));
        assert_eq!(partial.temp_dir, Some(PathBuf::from("/var/tmp")));
        assert!(partial.live.is_none());
    }

    #[test]
    fn test_default_toml_is_valid() {
        let partial: PartialConfig = toml::from_str(Config::default_toml()).unwrap();
        let merged = merge(Config::default(), partial);
        assert_eq!(merged, Config::default());
    }

    #[test]
    fn test_project_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("project.toml");
        std::fs::write(&global, "poll_interval_ms = 10\nlive = true\n").unwrap();
        std::fs::write(&project, "poll_interval_ms = 20\n").unwrap();

        let config = Config::load_from(Some(global.as_path()), &project);
        assert_eq!(config.poll_interval_ms, 20);
        assert!(config.live);
    }

    #[test]
    fn test_missing_and_invalid_files_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "poll_interval_ms = \"soon\"").unwrap();

        let missing = dir.path().join("nope.toml");
        let config = Config::load_from(Some(missing.as_path()), &bad);
        assert_eq!(config, Config::default());
        assert!(matches!(read_file(&bad), Err(ConfigError::Parse { .. })));
        assert!(matches!(read_file(&missing), Ok(None)));
    }

    #[test]
    fn test_write_template_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_template(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), Config::default_toml());
        assert!(matches!(
            write_template(&path),
            Err(ConfigError::AlreadyExists(_))
        ));
    }
}
