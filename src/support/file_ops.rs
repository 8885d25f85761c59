//-
// Copyright (c) 2026, the Confstore developers
//
// This file is part of Confstore.
//
// Confstore is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Confstore is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Confstore. If not, see <http://www.gnu.org/licenses/>.

//! Miscellaneous functions for working with backing files.

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::fcntl::{flock, FlockArg};

/// Write `data` into the file at `path`, atomically.
///
/// The data is staged in a temporary file in the same directory, synced, and
/// renamed over `path`, so a reader never observes a partial write.
///
/// If `overwrite` is true, this will replace anything already at `path`. If
/// false, the call will fail if `path` already exists.
pub fn spit(
    path: impl AsRef<Path>,
    overwrite: bool,
    mode: u32,
    data: &[u8],
) -> io::Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tf = tempfile::NamedTempFile::new_in(dir)?;
    tf.as_file_mut().write_all(data)?;
    chmod(tf.path(), mode)?;
    tf.as_file_mut().sync_all()?;
    if overwrite {
        tf.persist(path)?;
    } else {
        tf.persist_noclobber(path)?;
    }
    Ok(())
}

pub fn chmod(path: impl AsRef<Path>, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// An advisory exclusive lock on a `<file>.lock` sibling of a backing file.
///
/// Held for the duration of a load or persist so that co-operating processes
/// do not interleave whole-file rewrites. Released on drop.
pub struct FileLock {
    file: fs::File,
}

impl FileLock {
    /// Takes the lock for the backing file at `backing`, creating the lock
    /// file if needed and blocking until the lock is available.
    pub fn exclusive(backing: impl AsRef<Path>) -> io::Result<Self> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(lock_path(backing.as_ref()))?;
        flock(file.as_raw_fd(), FlockArg::LockExclusive)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = flock(self.file.as_raw_fd(), FlockArg::Unlock);
    }
}

fn lock_path(backing: &Path) -> PathBuf {
    let mut name = backing
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    backing.with_file_name(name)
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn spit_overwrites_only_when_asked() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("file");

        spit(&path, false, 0o666, b"first").unwrap();
        assert_eq!("first", fs::read_to_string(&path).unwrap());

        assert_eq!(
            io::ErrorKind::AlreadyExists,
            spit(&path, false, 0o666, b"second").unwrap_err().kind()
        );
        assert_eq!("first", fs::read_to_string(&path).unwrap());

        spit(&path, true, 0o666, b"second").unwrap();
        assert_eq!("second", fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let tmpdir = TempDir::new().unwrap();
        let backing = tmpdir.path().join("config.json");

        let lock = FileLock::exclusive(&backing).unwrap();
        assert!(tmpdir.path().join("config.json.lock").is_file());
        drop(lock);

        // Reacquirable immediately once dropped.
        let _lock = FileLock::exclusive(&backing).unwrap();
    }
}
