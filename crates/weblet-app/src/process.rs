//! Running webapp instance tracking
//!
//! Each standalone webapp writes its PID into the runtime directory.
//! The manager reads those files to tell what is running, to focus or
//! terminate instances, and to nudge them after an edit. Stale files
//! left behind by a crash are detected with a signal-0 probe and
//! cleaned up on sight.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use weblet_core::{Paths, WebletError, WebletResult};

pub struct ProcessTracker {
    paths: Paths,
}

impl ProcessTracker {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// The live PID of a webapp instance, if one is running. Stale PID
    /// files are removed as a side effect.
    pub fn running_pid(&self, webapp_id: &str) -> WebletResult<Option<i32>> {
        let Some(pid_file) = self.paths.pid_file(webapp_id) else {
            return Ok(None);
        };

        let contents = match fs::read_to_string(&pid_file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WebletError::process(format!(
                    "Failed to read PID file: {}",
                    e
                )))
            }
        };

        let pid: i32 = match contents.trim().parse() {
            Ok(pid) if pid > 0 => pid,
            _ => {
                log::warn!("Discarding malformed PID file {:?}", pid_file);
                remove_pid_file(&pid_file);
                return Ok(None);
            }
        };

        if process_alive(pid) {
            Ok(Some(pid))
        } else {
            log::info!("Cleaning stale PID file for webapp {}", webapp_id);
            remove_pid_file(&pid_file);
            Ok(None)
        }
    }

    pub fn is_running(&self, webapp_id: &str) -> bool {
        matches!(self.running_pid(webapp_id), Ok(Some(_)))
    }

    /// Record this process as the running instance for a webapp.
    pub fn write_own_pid(&self, webapp_id: &str) -> WebletResult<()> {
        let Some(pid_file) = self.paths.pid_file(webapp_id) else {
            log::warn!("No runtime directory, instance tracking disabled");
            return Ok(());
        };

        if let Some(parent) = pid_file.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                WebletError::process(format!("Failed to create sessions directory: {}", e))
            })?;
        }
        fs::write(&pid_file, std::process::id().to_string())
            .map_err(|e| WebletError::process(format!("Failed to write PID file: {}", e)))?;
        Ok(())
    }

    pub fn remove_pid(&self, webapp_id: &str) {
        if let Some(pid_file) = self.paths.pid_file(webapp_id) {
            remove_pid_file(&pid_file);
        }
    }

    /// Ask a running instance to shut down. Returns false when nothing
    /// was running.
    pub fn terminate(&self, webapp_id: &str) -> WebletResult<bool> {
        self.signal(webapp_id, libc::SIGTERM, "terminate")
    }

    /// Tell a running instance to re-read its name and icon. Returns
    /// false when nothing was running.
    pub fn refresh_branding(&self, webapp_id: &str) -> WebletResult<bool> {
        self.signal(webapp_id, libc::SIGUSR1, "refresh")
    }

    fn signal(&self, webapp_id: &str, signal: i32, action: &str) -> WebletResult<bool> {
        let Some(pid) = self.running_pid(webapp_id)? else {
            return Ok(false);
        };

        log::info!("Sending {} to webapp {} (pid {})", action, webapp_id, pid);
        let result = unsafe { libc::kill(pid, signal) };
        if result == 0 {
            if signal == libc::SIGTERM {
                // The instance is going away; do not leave the PID
                // file for the next liveness probe to trip over.
                if let Some(pid_file) = self.paths.pid_file(webapp_id) {
                    remove_pid_file(&pid_file);
                }
            }
            return Ok(true);
        }

        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            // Died between the probe and the signal.
            if let Some(pid_file) = self.paths.pid_file(webapp_id) {
                remove_pid_file(&pid_file);
            }
            return Ok(false);
        }
        Err(WebletError::process(format!(
            "Failed to signal pid {}: {}",
            pid, err
        )))
    }

    /// Launch a detached standalone instance through the given binary.
    pub fn spawn(&self, webapp_id: &str, exec_path: &PathBuf) -> WebletResult<u32> {
        log::info!("Spawning webapp {}", webapp_id);
        let child = Command::new(exec_path)
            .arg("--webapp")
            .arg(webapp_id)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| WebletError::process(format!("Failed to spawn webapp: {}", e)))?;
        Ok(child.id())
    }
}

/// Signal-0 probe. EPERM still means the process exists.
fn process_alive(pid: i32) -> bool {
    let result = unsafe { libc::kill(pid, 0) };
    if result == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

fn remove_pid_file(pid_file: &std::path::Path) {
    if let Err(e) = fs::remove_file(pid_file) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove PID file {:?}: {}", pid_file, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(root: &std::path::Path) -> ProcessTracker {
        ProcessTracker::new(Paths::with_root(root))
    }

    #[test]
    fn test_no_pid_file_means_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(dir.path());
        assert_eq!(tracker.running_pid("app-a").unwrap(), None);
        assert!(!tracker.is_running("app-a"));
    }

    #[test]
    fn test_own_pid_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(dir.path());

        tracker.write_own_pid("app-a").unwrap();
        assert_eq!(
            tracker.running_pid("app-a").unwrap(),
            Some(std::process::id() as i32)
        );

        tracker.remove_pid("app-a");
        assert_eq!(tracker.running_pid("app-a").unwrap(), None);
    }

    #[test]
    fn test_stale_pid_file_is_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());
        let tracker = ProcessTracker::new(paths.clone());

        let pid_file = paths.pid_file("app-a").unwrap();
        fs::create_dir_all(pid_file.parent().unwrap()).unwrap();
        // PID 1 is never one of ours... but it is alive, so use an
        // implausibly high PID instead.
        fs::write(&pid_file, "999999999").unwrap();

        assert_eq!(tracker.running_pid("app-a").unwrap(), None);
        assert!(!pid_file.exists());
    }

    #[test]
    fn test_malformed_pid_file_is_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());
        let tracker = ProcessTracker::new(paths.clone());

        let pid_file = paths.pid_file("app-a").unwrap();
        fs::create_dir_all(pid_file.parent().unwrap()).unwrap();
        fs::write(&pid_file, "not a pid").unwrap();

        assert_eq!(tracker.running_pid("app-a").unwrap(), None);
        assert!(!pid_file.exists());
    }

    #[test]
    fn test_terminate_nothing_running() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(dir.path());
        assert!(!tracker.terminate("app-a").unwrap());
        assert!(!tracker.refresh_branding("app-a").unwrap());
    }
}
