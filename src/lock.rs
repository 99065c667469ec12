//! Run-scoped locking for the persist dir.
//!
//! Advisory flock() on a lock file inside the persist dir, so two
//! categorize runs pointed at the same store never interleave writes.
//! The lock releases on drop (or process exit).

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

const LOCK_FILE_NAME: &str = "newscat.lock";

/// A held exclusive lock on a persist dir. Released on drop.
pub struct RunLock {
    #[allow(dead_code)]
    file: File,
}

impl RunLock {
    /// Acquire the lock or fail immediately if another run holds it.
    pub fn try_acquire(persist_dir: &Path) -> io::Result<Self> {
        let file = Self::open_lock_file(persist_dir)?;
        try_lock_exclusive(&file)?;
        Ok(RunLock { file })
    }

    fn open_lock_file(persist_dir: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(persist_dir.join(LOCK_FILE_NAME))
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result != 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock
            || err.raw_os_error() == Some(libc::EWOULDBLOCK)
            || err.raw_os_error() == Some(libc::EAGAIN)
        {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "persist dir is locked by another categorize run",
            ));
        }
        return Err(err);
    }
    Ok(())
}

// Non-unix platforms get no advisory locking; saves are still atomic
#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
impl Drop for RunLock {
    fn drop(&mut self) {
        unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
    }
}
