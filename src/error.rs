use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures inside the runner. These never escape `Runner::run`; they are
/// folded into the returned `RunResult` as an exit code plus stderr text.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to allocate {stream} sink: {source}")]
    Sink {
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for child: {0}")]
    Wait(#[source] io::Error),
}

impl RunError {
    /// Exit code reported for a command that never produced one.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EmptyCommand => 127,
            Self::Spawn { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => 127,
                io::ErrorKind::PermissionDenied => 126,
                _ => 1,
            },
            Self::Sink { .. } => 1,
            Self::Wait(_) => -1,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("config already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
