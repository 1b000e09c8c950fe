use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use eyre::{bail, eyre, WrapErr};

use crate::AnyResult;

/// Append-only destination for transcript blocks and lifecycle notices.
///
/// Every entry goes to the log file and, unless disabled, to stdout. Each destination
/// is written under its own lock so concurrent entries never interleave.
#[derive(Debug)]
pub struct TranscriptSink {
    path: PathBuf,
    console: bool,
    file: Mutex<Option<File>>,
}

impl TranscriptSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            console: true,
            file: Mutex::new(None),
        }
    }

    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empties the log file, creating it (and its directory) if needed.
    pub fn clear(&self) -> AnyResult<()> {
        ensure_parent_dir(&self.path)?;
        File::create(&self.path)
            .wrap_err_with(|| format!("could not truncate {}", self.path.display()))?;
        Ok(())
    }

    /// Opens the log file for appending. Calling it again is a no-op.
    pub fn init(&self) -> AnyResult<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| eyre!("transcript file lock poisoned"))?;
        if file.is_some() {
            return Ok(());
        }

        ensure_parent_dir(&self.path)?;
        let opened = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .wrap_err_with(|| format!("could not open {} for appending", self.path.display()))?;
        *file = Some(opened);
        Ok(())
    }

    /// Writes `entry` followed by a newline, then flushes.
    pub fn append(&self, entry: &str) -> AnyResult<()> {
        {
            let mut file = self
                .file
                .lock()
                .map_err(|_| eyre!("transcript file lock poisoned"))?;
            let Some(file) = file.as_mut() else {
                bail!("transcript sink used before init");
            };
            write_entry(file, entry)
                .wrap_err_with(|| format!("could not append to {}", self.path.display()))?;
        }

        if self.console {
            // StdoutLock serializes the console side
            write_entry(&mut io::stdout().lock(), entry).wrap_err("could not write to stdout")?;
        }
        Ok(())
    }
}

impl TranscriptSink {
    /// [TranscriptSink::append] on the blocking pool, so a slow file or console only parks the caller.
    pub async fn append_blocking(self: &Arc<Self>, entry: String) -> AnyResult<()> {
        let sink = Arc::clone(self);
        tokio::task::spawn_blocking(move || sink.append(&entry))
            .await
            .wrap_err("transcript writer task failed")?
    }
}

fn write_entry(out: &mut impl Write, entry: &str) -> io::Result<()> {
    out.write_all(entry.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

fn ensure_parent_dir(path: &Path) -> AnyResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("could not create log directory {}", dir.display())),
        _ => Ok(()),
    }
}
