//! Temp-file sinks: the child writes through one handle, the runner
//! tail-reads through another with its own offset.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::Stdio;

use tempfile::{Builder, NamedTempFile};

/// One redirection target for a child stream.
pub struct Sink {
    file: NamedTempFile,
    reader: File,
}

impl Sink {
    /// Create a sink in `dir`, or in the system temp dir when `None`.
    pub fn create(label: &str, dir: Option<&Path>) -> io::Result<Self> {
        let prefix = format!("tailrun-{label}-");
        let mut builder = Builder::new();
        builder.prefix(&prefix);
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        // `reopen` yields a fresh file description, so reads do not move
        // the offset the child writes at.
        let reader = file.reopen()?;
        Ok(Self { file, reader })
    }

    /// Handle for the child's stdout or stderr.
    pub fn stdio(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.file.as_file().try_clone()?))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read every byte written since the previous drain.
    pub fn drain(&mut self) -> io::Result<Vec<u8>> {
        let mut chunk = Vec::new();
        self.reader.read_to_end(&mut chunk)?;
        Ok(chunk)
    }

    /// Remove the backing file. Failures are logged and dropped.
    pub fn close(self) {
        let Self { file, reader } = self;
        drop(reader);
        if let Err(e) = file.close() {
            tracing::debug!(error = %e, "failed to remove sink");
        }
    }
}
