use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

// ── Request ──

/// One desktop notification. Built per test run and dropped once the
/// backend command has been spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub group: Option<String>,
}

impl NotificationRequest {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            body: body.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

// ── Backends ──

/// Where terminal-notifier lives when installed as an app bundle rather than on PATH.
const TERMINAL_NOTIFIER_APP_DIR: &str = "/Applications/terminal-notifier.app/Contents/MacOS";

/// Bundle brought forward when a macOS notification is clicked.
const ACTIVATE_BUNDLE: &str = "com.apple.Terminal";

/// Platform notification command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// macOS `terminal-notifier`.
    TerminalNotifier { program: PathBuf },
    /// freedesktop `notify-send`.
    NotifySend { program: PathBuf },
    /// No notifier available; every notification is dropped.
    Disabled,
}

impl Backend {
    /// Probe the host for a notifier executable.
    pub fn detect() -> Self {
        let path = std::env::var_os("PATH").unwrap_or_default();
        if cfg!(target_os = "macos") {
            let mut dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
            dirs.push(PathBuf::from(TERMINAL_NOTIFIER_APP_DIR));
            let search = std::env::join_paths(dirs).unwrap_or(path);
            match find_program("terminal-notifier", &search) {
                Some(program) => Backend::TerminalNotifier { program },
                None => Backend::Disabled,
            }
        } else if cfg!(target_os = "linux") {
            match find_program("notify-send", &path) {
                Some(program) => Backend::NotifySend { program },
                None => Backend::Disabled,
            }
        } else {
            Backend::Disabled
        }
    }

    pub fn program(&self) -> Option<&Path> {
        match self {
            Backend::TerminalNotifier { program } | Backend::NotifySend { program } => {
                Some(program)
            }
            Backend::Disabled => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::TerminalNotifier { .. } => "terminal-notifier",
            Backend::NotifySend { .. } => "notify-send",
            Backend::Disabled => "disabled",
        }
    }

    /// Command-line arguments for `request`. Pure; nothing is spawned.
    pub fn args(&self, request: &NotificationRequest) -> Vec<String> {
        match self {
            Backend::TerminalNotifier { .. } => terminal_notifier_args(request),
            Backend::NotifySend { .. } => notify_send_args(request),
            Backend::Disabled => Vec::new(),
        }
    }
}

fn terminal_notifier_args(request: &NotificationRequest) -> Vec<String> {
    let mut args = Vec::new();
    for (flag, value) in [
        ("-title", &request.title),
        ("-subtitle", &request.subtitle),
        ("-message", &request.body),
    ] {
        if !value.is_empty() {
            args.push(flag.to_string());
            args.push(value.clone());
        }
    }
    if let Some(group) = request.group.as_deref().filter(|g| !g.is_empty()) {
        args.push("-group".to_string());
        args.push(group.to_string());
    }
    args.push("-activate".to_string());
    args.push(ACTIVATE_BUNDLE.to_string());
    args
}

fn notify_send_args(request: &NotificationRequest) -> Vec<String> {
    let icon = if request.subtitle.starts_with("OK") {
        "dialog-ok"
    } else {
        "dialog-error"
    };
    let mut args = vec![
        "-a".to_string(),
        "autotest".to_string(),
        "-i".to_string(),
        icon.to_string(),
    ];
    // Replaces the previous bubble of the same group on servers that honour it.
    if let Some(group) = request.group.as_deref().filter(|g| !g.is_empty()) {
        args.push("-h".to_string());
        args.push(format!("string:x-canonical-private-synchronous:{group}"));
    }
    args.push(request.title.clone());
    let body: Vec<&str> = [request.subtitle.as_str(), request.body.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    args.push(body.join("\n"));
    args
}

/// Locate an executable named `name` in a PATH-style list of directories.
pub fn find_program(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ── Dispatch ──

/// Something that can show a notification. Implementations must never fail
/// loudly: a lost notification is acceptable.
pub trait Notifier {
    fn notify(&self, request: &NotificationRequest);
}

/// Sends notifications through the platform backend chosen at construction.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    backend: Backend,
}

impl DesktopNotifier {
    /// Detect the platform backend. Logs once when none is available.
    pub fn detect() -> Self {
        Self::with_backend(Backend::detect())
    }

    pub fn with_backend(backend: Backend) -> Self {
        match &backend {
            Backend::Disabled => tracing::warn!("Notifications disabled"),
            other => tracing::debug!(
                backend = other.display_name(),
                program = %other.program().map(|p| p.display().to_string()).unwrap_or_default(),
                "notifier ready"
            ),
        }
        Self { backend }
    }

    pub fn disabled() -> Self {
        Self::with_backend(Backend::Disabled)
    }

    /// The full command line `request` would run, or `None` when disabled.
    pub fn command_line(&self, request: &NotificationRequest) -> Option<Vec<OsString>> {
        let program = self.backend.program()?;
        let mut argv = vec![program.as_os_str().to_os_string()];
        argv.extend(self.backend.args(request).into_iter().map(OsString::from));
        Some(argv)
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, request: &NotificationRequest) {
        let Some(argv) = self.command_line(request) else {
            return;
        };
        tracing::debug!(
            "Notify command: {}",
            argv.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let spawned = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                // Reap off-thread so the caller never waits and no zombie is left.
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => {
                tracing::warn!("failed to run {}: {e}", self.backend.display_name());
            }
        }
    }
}

/// Collects requests in memory (for testing).
#[derive(Debug, Default)]
pub struct CollectNotifier {
    requests: Mutex<Vec<NotificationRequest>>,
}

impl CollectNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<NotificationRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for CollectNotifier {
    fn notify(&self, request: &NotificationRequest) {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
    }
}

/// Lets several short-lived owners share one resolved notifier.
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, request: &NotificationRequest) {
        (**self).notify(request)
    }
}

// ── Tests ──
