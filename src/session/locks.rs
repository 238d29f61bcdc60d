//! Stale profile lock reclamation.
//!
//! A browser profile that was not shut down cleanly leaves singleton markers
//! behind, and the engine refuses to reopen the profile while they exist.

use log::{info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Marker files relative to a tenant's session directory.
const LOCK_MARKERS: [&[&str]; 4] = [
    &["SingletonLock"],
    &["Default", "SingletonLock"],
    &["SingletonCookie"],
    &["SingletonSocket"],
];

/// Outcome of one reclamation pass
#[derive(Debug, Default)]
pub struct ReclaimReport {
    pub cleared: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Removes stale profile markers from per-tenant session directories.
#[derive(Debug, Clone)]
pub struct LockReclaimer {
    auth_root: PathBuf,
}

impl LockReclaimer {
    pub fn new(auth_root: impl Into<PathBuf>) -> Self {
        Self {
            auth_root: auth_root.into(),
        }
    }

    /// Root directory holding every tenant's credential storage
    pub fn auth_root(&self) -> &Path {
        &self.auth_root
    }

    /// Credential directory owned by `tenant_id`
    pub fn session_dir(&self, tenant_id: &str) -> PathBuf {
        self.auth_root.join(format!("session-{}", tenant_id))
    }

    /// Deletes every marker present in the tenant's session directory.
    ///
    /// Each deletion is independent; a failure is logged and recorded in the
    /// report, and the remaining markers are still processed.
    pub fn reclaim(&self, tenant_id: &str) -> ReclaimReport {
        let session_dir = self.session_dir(tenant_id);
        let mut report = ReclaimReport::default();

        for segments in LOCK_MARKERS {
            let marker = segments.iter().fold(session_dir.clone(), |path, s| path.join(s));

            // SingletonLock is usually a dangling symlink, so `exists()` would miss it.
            if std::fs::symlink_metadata(&marker).is_err() {
                continue;
            }

            match std::fs::remove_file(&marker) {
                Ok(()) => {
                    info!("[{}] Cleared stale lock: {}", tenant_id, marker.display());
                    report.cleared.push(marker);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(
                        "[{}] Could not clear lock {}: {}",
                        tenant_id,
                        marker.display(),
                        e
                    );
                    report.failed.push((marker, e.to_string()));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_session_dir_is_derived_from_tenant() {
        let reclaimer = LockReclaimer::new("/data/.wwebjs_auth");
        assert_eq!(
            reclaimer.session_dir("school_001"),
            PathBuf::from("/data/.wwebjs_auth/session-school_001")
        );
    }

    #[test]
    fn test_reclaim_removes_all_markers() {
        let temp = TempDir::new().unwrap();
        let reclaimer = LockReclaimer::new(temp.path());
        let dir = reclaimer.session_dir("school_001");

        touch(&dir.join("SingletonLock"));
        touch(&dir.join("Default").join("SingletonLock"));
        touch(&dir.join("SingletonCookie"));
        touch(&dir.join("SingletonSocket"));
        touch(&dir.join("Default").join("Cookies"));

        let report = reclaimer.reclaim("school_001");
        assert_eq!(report.cleared.len(), 4);
        assert!(report.failed.is_empty());
        assert!(!dir.join("SingletonLock").exists());
        assert!(!dir.join("Default").join("SingletonLock").exists());
        // Non-marker profile data is left alone
        assert!(dir.join("Default").join("Cookies").exists());
    }

    #[test]
    fn test_reclaim_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let reclaimer = LockReclaimer::new(temp.path());
        touch(&reclaimer.session_dir("school_001").join("SingletonCookie"));

        assert_eq!(reclaimer.reclaim("school_001").cleared.len(), 1);
        let second = reclaimer.reclaim("school_001");
        assert!(second.cleared.is_empty());
        assert!(second.failed.is_empty());
    }

    #[test]
    fn test_reclaim_missing_directory_is_noop() {
        let temp = TempDir::new().unwrap();
        let reclaimer = LockReclaimer::new(temp.path().join("missing"));
        let report = reclaimer.reclaim("ghost_school");
        assert!(report.cleared.is_empty());
        assert!(report.failed.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_reclaim_removes_dangling_symlink() {
        let temp = TempDir::new().unwrap();
        let reclaimer = LockReclaimer::new(temp.path());
        let dir = reclaimer.session_dir("school_001");
        std::fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink("host-12345", dir.join("SingletonLock")).unwrap();

        let report = reclaimer.reclaim("school_001");
        assert_eq!(report.cleared, vec![dir.join("SingletonLock")]);
        assert!(std::fs::symlink_metadata(dir.join("SingletonLock")).is_err());
    }

    #[test]
    fn test_reclaim_continues_after_failure() {
        let temp = TempDir::new().unwrap();
        let reclaimer = LockReclaimer::new(temp.path());
        let dir = reclaimer.session_dir("school_001");

        // A directory where a marker file is expected cannot be removed with remove_file.
        std::fs::create_dir_all(dir.join("SingletonLock").join("nested")).unwrap();
        touch(&dir.join("SingletonSocket"));

        let report = reclaimer.reclaim("school_001");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.cleared, vec![dir.join("SingletonSocket")]);
    }
}
