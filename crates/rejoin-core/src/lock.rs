//! Advisory lock that gives one editor exclusive use of a working directory.
//!
//! The lock file sits next to the working directory (`<workdir>.lock`), so
//! wiping and re-extracting the directory on load never touches it. The
//! holder writes its process id into the file; a contender that times out
//! reports that id.

use crate::error::ErrorCode;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error(
        "working directory {} is in use{} (waited {waited:?})",
        .workdir.display(),
        .holder.map_or_else(String::new, |pid| format!(" by process {pid}"))
    )]
    Busy {
        workdir: PathBuf,
        holder: Option<u32>,
        waited: Duration,
    },
    #[error("cannot open lock file: {0}")]
    Io(#[from] io::Error),
}

impl LockError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Busy { .. } => ErrorCode::LockContention,
            Self::Io(_) => ErrorCode::PersistenceFailed,
        }
    }
}

/// Held for as long as an editor owns the working directory; unlocks on drop.
#[derive(Debug)]
pub struct WorkspaceLock {
    file: File,
    path: PathBuf,
}

impl WorkspaceLock {
    /// Take the lock for `workdir`, polling until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`LockError::Busy`] if another process keeps the lock past `timeout`,
    /// [`LockError::Io`] if the lock file cannot be created.
    pub fn acquire(workdir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = lock_path_for(workdir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        let start = Instant::now();
        while file.try_lock_exclusive().is_err() {
            if start.elapsed() >= timeout {
                return Err(LockError::Busy {
                    workdir: workdir.to_path_buf(),
                    holder: read_holder(&mut file),
                    waited: start.elapsed(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;
        tracing::debug!(lock = %path.display(), "acquired workspace lock");
        Ok(Self { file, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
    }
}

fn read_holder(file: &mut File) -> Option<u32> {
    let mut text = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut text).ok()?;
    text.trim().parse().ok()
}

/// `/tmp/rejoin/work` → `/tmp/rejoin/work.lock`
#[must_use]
pub fn lock_path_for(workdir: &Path) -> PathBuf {
    let mut name = workdir
        .file_name()
        .map_or_else(|| "workdir".into(), std::ffi::OsStr::to_os_string);
    name.push(".lock");
    workdir.with_file_name(name)
}
