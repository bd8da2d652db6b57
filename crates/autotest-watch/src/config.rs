use std::path::{Path, PathBuf};
use std::time::Duration;

/// Test-discovery command used when none is given.
pub const DEFAULT_COMMAND: &[&str] = &["python", "-m", "unittest", "discover", "--buffer"];

/// Extension of files whose changes trigger a run.
pub const DEFAULT_EXTENSION: &str = "py";

/// Pause before rebuilding a watch that failed.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Everything the watch loop needs. Built once by the CLI.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub root: PathBuf,
    pub project_name: String,
    /// Lowercase, without the leading dot.
    pub extension: String,
    pub command: Vec<String>,
    pub notifications: bool,
    pub restart_delay: Duration,
}

impl WatchConfig {
    /// Defaults for watching `root`. The project name is the last path component.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let project_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        Self {
            root,
            project_name,
            extension: DEFAULT_EXTENSION.to_string(),
            command: DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect(),
            notifications: true,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }

    /// Accepts `py`, `.py` or `PY`.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self
    }

    /// Ignored when `command` is empty.
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        if !command.is_empty() {
            self.command = command;
        }
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Case-insensitive match of the path's extension.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_root() {
        let cfg = WatchConfig::for_root("/home/dev/pyautotest");
        assert_eq!(cfg.project_name, "pyautotest");
        assert_eq!(cfg.extension, "py");
        assert_eq!(
            cfg.command,
            vec!["python", "-m", "unittest", "discover", "--buffer"]
        );
        assert!(cfg.notifications);
    }

    #[test]
    fn extension_normalized() {
        let cfg = WatchConfig::for_root("/p").with_extension(".PYX");
        assert_eq!(cfg.extension, "pyx");
        assert!(cfg.matches_extension(Path::new("a/b.pyx")));
        assert!(cfg.matches_extension(Path::new("a/b.PyX")));
        assert!(!cfg.matches_extension(Path::new("a/b.py")));
        assert!(!cfg.matches_extension(Path::new("a/pyx")));
    }

    #[test]
    fn empty_command_keeps_default() {
        let cfg = WatchConfig::for_root("/p").with_command(Vec::new());
        assert_eq!(cfg.command[0], "python");
        let cfg = cfg.with_command(vec!["pytest".into(), "-q".into()]);
        assert_eq!(cfg.command, vec!["pytest", "-q"]);
    }
}
