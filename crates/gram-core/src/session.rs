//! Per-process session paths.
//!
//! ```text
//! <data_dir>/                 ~/.gram by default
//!   config.json               appearance, hot-reloaded
//!   settings.toml             optional tunables and bindings
//!   cache/<name>.json         cache blobs
//!   <start_ns>/               this session, removed on shutdown
//!     output.log
//!     find_all.log
//! ```

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::key::resolve;
use crate::{CoreError, CoreResult};

const DATA_DIR_NAME: &str = ".gram";
const CONFIG_FILE: &str = "config.json";
const SETTINGS_FILE: &str = "settings.toml";
const LOG_FILE: &str = "output.log";
const FIND_ALL_FILE: &str = "find_all.log";
const README_FILE: &str = "README.md";

#[derive(Debug, Clone)]
pub struct Session {
    data_dir: PathBuf,
    session_dir: PathBuf,
    workdir: PathBuf,
}

impl Session {
    /// Creates the data and session directories. `data_dir` defaults to
    /// `~/.gram`; the working directory defaults to the home directory.
    pub fn new(data_dir: Option<PathBuf>) -> CoreResult<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = data_dir.unwrap_or_else(|| home.join(DATA_DIR_NAME));
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let session_dir = data_dir.join(started.to_string());
        std::fs::create_dir_all(&session_dir).map_err(|e| CoreError::file(&session_dir, e))?;

        Ok(Self {
            data_dir,
            session_dir,
            workdir: home,
        })
    }

    /// Sets the directory relative paths resolve against.
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.session_dir.join(LOG_FILE)
    }

    pub fn find_all_path(&self) -> PathBuf {
        self.session_dir.join(FIND_ALL_FILE)
    }

    /// True for files inside this session's directory.
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.session_dir)
    }

    /// The file to show at startup and whether it opens read-only: the
    /// requested path if it exists, else a README next to the executable,
    /// else the first free `new_file*.txt` in the working directory.
    /// Relative requests resolve against the working directory, like
    /// palette paths.
    pub fn startup_file(&self, requested: Option<&Path>) -> (PathBuf, bool) {
        let requested = requested.map(|p| resolve(&self.workdir, &p.to_string_lossy()));
        if let Some(path) = requested.filter(|p| p.exists()) {
            return (path, false);
        }

        let readme = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(README_FILE)));
        if let Some(readme) = readme.filter(|p| p.is_file()) {
            return (readme, true);
        }

        (self.new_file_path(), false)
    }

    /// `new_file.txt`, or `new_file<i>.txt` for the first free `i`.
    pub fn new_file_path(&self) -> PathBuf {
        let mut candidate = self.workdir.join("new_file.txt");
        for i in 0..1000 {
            if !candidate.exists() {
                break;
            }
            candidate = self.workdir.join(format!("new_file{}.txt", i));
        }
        candidate
    }

    /// Removes the session directory.
    pub fn cleanup(&self) -> CoreResult<()> {
        if self.session_dir.exists() {
            std::fs::remove_dir_all(&self.session_dir)
                .map_err(|e| CoreError::file(&self.session_dir, e))?;
            info!("Removed session dir file://{}", self.session_dir.display());
        } else {
            debug!("Session dir already gone");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().to_path_buf())).unwrap();
        assert!(session.session_dir().is_dir());
        assert_eq!(session.config_path(), dir.path().join("config.json"));
        assert!(session.owns(&session.log_path()));
        assert!(session.owns(&session.find_all_path()));
        assert!(!session.owns(&session.config_path()));
    }

    #[test]
    fn test_startup_file_prefers_existing_request() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().join("data")))
            .unwrap()
            .with_workdir(dir.path());
        let file = dir.path().join("hello.txt");
        std::fs::write(&file, "hi").unwrap();
        assert_eq!(session.startup_file(Some(&file)), (file, false));
    }

    #[test]
    fn test_startup_file_resolves_against_workdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("notes")).unwrap();
        let session = Session::new(Some(dir.path().join("data")))
            .unwrap()
            .with_workdir(dir.path());
        let file = dir.path().join("notes").join("todo.txt");
        std::fs::write(&file, "").unwrap();
        assert_eq!(
            session.startup_file(Some(Path::new("notes/../notes/todo.txt"))),
            (file, false)
        );
    }

    #[test]
    fn test_new_file_path_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().join("data")))
            .unwrap()
            .with_workdir(dir.path());
        assert_eq!(session.new_file_path(), dir.path().join("new_file.txt"));
        std::fs::write(dir.path().join("new_file.txt"), "").unwrap();
        assert_eq!(session.new_file_path(), dir.path().join("new_file0.txt"));
        std::fs::write(dir.path().join("new_file0.txt"), "").unwrap();
        assert_eq!(session.new_file_path(), dir.path().join("new_file1.txt"));
    }

    #[test]
    fn test_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().to_path_buf())).unwrap();
        std::fs::write(session.log_path(), "log").unwrap();
        session.cleanup().unwrap();
        assert!(!session.session_dir().exists());
        session.cleanup().unwrap();
    }
}
