use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

// A lock file next to the baseline guards against overlapping scheduled runs.
// A crashed run leaves its lock behind, so old locks are taken over.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "baseline.csv".into());
    name.push(".lock");
    target.with_file_name(name)
}

impl RunLock {
    /// `Ok(None)` when another live run holds the lock.
    pub fn try_acquire(target: &Path, stale_after: Duration) -> anyhow::Result<Option<Self>> {
        let path = lock_path_for(target);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create lock dir {}", parent.display()))?;
        }

        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    stamp_lock(file, &path)?;
                    return Ok(Some(Self { path }));
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    // Not atomic: two runs that both judge the lock stale can race, and the
                    // later remove_file may delete the lock the earlier one just created.
                    // Tolerated for a one-shot job; the scheduler must not overlap runs by
                    // more than the stale interval.
                    match lock_age(&path) {
                        Some(age) if age >= stale_after => {
                            tracing::warn!(
                                lock = %path.display(),
                                age_secs = age.as_secs(),
                                "taking over stale run lock"
                            );
                            match fs::remove_file(&path) {
                                Ok(()) => continue,
                                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                                Err(e) => {
                                    return Err(e).with_context(|| {
                                        format!("failed to remove stale lock {}", path.display())
                                    })
                                }
                            }
                        }
                        _ => return Ok(None),
                    }
                }
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("failed to create lock {}", path.display()))
                }
            }
        }

        Ok(None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes the holder stamp; on failure the half-created lock is removed so it
/// does not block later runs.
fn stamp_lock<W: Write>(mut file: W, path: &Path) -> anyhow::Result<()> {
    let res = writeln!(
        file,
        "pid={} acquired_at={}",
        std::process::id(),
        chrono::Utc::now().to_rfc3339()
    )
    .and_then(|()| file.flush());
    drop(file);

    if let Err(err) = res {
        let _ = fs::remove_file(path);
        return Err(err).with_context(|| format!("failed to write lock {}", path.display()));
    }
    Ok(())
}

fn lock_age(path: &Path) -> Option<Duration> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.elapsed().ok())
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %err, "failed to release run lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("baseline.csv");

        let first = RunLock::try_acquire(&target, DEFAULT_STALE_AFTER).unwrap();
        assert!(first.is_some());
        assert!(RunLock::try_acquire(&target, DEFAULT_STALE_AFTER).unwrap().is_none());

        drop(first);
        assert!(!lock_path_for(&target).exists());
        assert!(RunLock::try_acquire(&target, DEFAULT_STALE_AFTER).unwrap().is_some());
    }

    #[test]
    fn stale_lock_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("baseline.csv");
        fs::write(lock_path_for(&target), "pid=1").unwrap();

        let lock = RunLock::try_acquire(&target, Duration::ZERO).unwrap();
        assert!(lock.is_some());
    }

    #[test]
    fn fresh_lock_is_not_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("baseline.csv");
        fs::write(lock_path_for(&target), "pid=1").unwrap();

        assert!(RunLock::try_acquire(&target, DEFAULT_STALE_AFTER).unwrap().is_none());
        assert!(lock_path_for(&target).exists());
    }

    struct BrokenDisk;

    impl Write for BrokenDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_stamp_removes_the_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_path_for(&dir.path().join("baseline.csv"));
        fs::write(&lock, "").unwrap();

        assert!(stamp_lock(BrokenDisk, &lock).is_err());
        assert!(!lock.exists());

        let target = dir.path().join("baseline.csv");
        assert!(RunLock::try_acquire(&target, DEFAULT_STALE_AFTER).unwrap().is_some());
    }

    #[test]
    fn lock_sits_next_to_target() {
        assert_eq!(
            lock_path_for(Path::new("state/baseline.csv")),
            PathBuf::from("state/baseline.csv.lock")
        );
    }
}
