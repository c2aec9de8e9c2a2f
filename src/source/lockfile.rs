use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Git-style `<file>.lock`: written in full, then renamed over the target.
pub struct Lockfile {
    file_path: PathBuf,
    lock_path: PathBuf,
    lock: Option<File>,
}

impl Lockfile {
    pub fn new(file_path: PathBuf) -> Self {
        let mut lock_name = file_path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        lock_name.push(".lock");
        Lockfile {
            lock_path: file_path.with_file_name(lock_name),
            file_path,
            lock: None,
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Returns `false` when somebody else holds the lock.
    pub fn hold_for_update(&mut self) -> Result<bool> {
        if self.lock.is_some() {
            return Ok(true);
        }
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
        {
            Ok(lock) => {
                self.lock = Some(lock);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn write(&mut self, content: &[u8]) -> Result<()> {
        self.held()?.write_all(content)?;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.held()?.sync_all()?;
        self.lock = None;
        fs::rename(&self.lock_path, &self.file_path)?;
        Ok(())
    }

    fn held(&mut self) -> Result<&mut File> {
        let lock_path = &self.lock_path;
        self.lock.as_mut().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("not holding lock on file: {}", lock_path.display()),
            ))
        })
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        if self.lock.take().is_some() {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("v1.0");
        fs::write(&target, b"old").unwrap();

        let mut lock = Lockfile::new(target.clone());
        assert_eq!(lock.lock_path(), dir.path().join("v1.0.lock"));
        assert!(lock.hold_for_update().unwrap());
        lock.write(b"new").unwrap();
        lock.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!dir.path().join("v1.0.lock").exists());
    }

    #[test]
    fn second_holder_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("master");

        let mut first = Lockfile::new(target.clone());
        let mut second = Lockfile::new(target.clone());
        assert!(first.hold_for_update().unwrap());
        assert!(!second.hold_for_update().unwrap());
        assert!(second.write(b"x").is_err());

        drop(first);
        assert!(!dir.path().join("master.lock").exists());
        assert!(second.hold_for_update().unwrap());
        drop(second);
        assert!(!dir.path().join("master.lock").exists());
        assert!(!target.exists());
    }
}
