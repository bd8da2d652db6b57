use std::path::{Component, Path};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use autotest_notify::{DesktopNotifier, NotificationRequest, Notifier};
use autotest_report::{Status, TestRunSummary};
use serde::Serialize;

use crate::config::WatchConfig;
use crate::event::ChangeEvent;
use crate::runner::{CommandRunner, RunnerError, TestRunner};

/// Reason used for runs not caused by a file change.
pub const DEFAULT_REASON: &str = "Unit test run";

/// Outcome of one notified test run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub ran_at: String,
    pub reason: String,
    pub summary: TestRunSummary,
}

/// Turns change events into test runs and notifications.
pub struct ChangeReactor<N = DesktopNotifier, R = CommandRunner> {
    notifier: N,
    runner: R,
    config: WatchConfig,
    interrupted: Arc<AtomicBool>,
}

impl<N: Notifier, R: TestRunner> ChangeReactor<N, R> {
    pub fn new(config: &WatchConfig, notifier: N, runner: R) -> Self {
        Self {
            notifier,
            runner,
            config: config.clone(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share the flag raised by the interrupt handler. Once it is set, a run
    /// whose report cannot be read is not notified: the suite was most likely
    /// killed by the same Ctrl-C.
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Notification title, also used as the grouping key.
    pub fn title(&self) -> String {
        format!("{} unit tests", self.config.project_name)
    }

    /// Whether `event` should trigger a run.
    pub fn qualifies(&self, event: &ChangeEvent) -> bool {
        !event.is_directory && self.config.matches_extension(&event.path)
    }

    /// `"<path relative to root> <kind>"`, e.g. `project/file.py modified`.
    pub fn reason_for(&self, event: &ChangeEvent) -> String {
        format!(
            "{} {}",
            relative_display(&self.config.root, &event.path),
            event.kind
        )
    }

    /// Run the tests if `event` touches a test-source file.
    pub fn react(&self, event: &ChangeEvent) -> Result<Option<RunReport>, RunnerError> {
        if !self.qualifies(event) {
            tracing::trace!(path = %event.path.display(), kind = %event.kind, "ignored change");
            return Ok(None);
        }
        let reason = self.reason_for(event);
        self.run(Some(&reason))
    }

    /// Run the suite, parse its report and notify. Returns `None` when the
    /// command printed nothing, in which case nothing is notified.
    pub fn run(&self, reason: Option<&str>) -> Result<Option<RunReport>, RunnerError> {
        let reason = reason.unwrap_or(DEFAULT_REASON);
        let ran_at = now_rfc3339();
        tracing::info!("Running unit tests at {ran_at}");
        tracing::info!("  {reason}");

        let output = self.runner.run()?;
        if !output.stdout.is_empty() {
            tracing::debug!("{}", output.stdout.trim_end());
        }
        if !output.stderr.is_empty() {
            tracing::info!("{}", output.stderr.trim_end());
        }
        let report = output.report();
        if report.trim().is_empty() {
            tracing::warn!("test command printed no report; skipping notification");
            return Ok(None);
        }

        let summary = TestRunSummary::parse(report);
        if summary.status() == Status::Unknown && self.interrupted.load(Ordering::SeqCst) {
            tracing::info!("run interrupted; skipping notification");
            return Ok(None);
        }
        let subtitle = summary.subtitle();
        tracing::info!("{subtitle}");

        let title = self.title();
        let request = NotificationRequest::new(title.clone(), subtitle, reason).with_group(title);
        self.notifier.notify(&request);

        Ok(Some(RunReport {
            ran_at,
            reason: reason.to_string(),
            summary,
        }))
    }
}

/// `path` relative to `root` with `.` components dropped.
fn relative_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    if rel.has_root() {
        return rel.display().to_string();
    }
    let parts: Vec<String> = rel
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeKind;
    use crate::runner::RunOutput;
    use autotest_notify::CollectNotifier;
    use std::cell::Cell;

    /// Returns canned stderr and counts invocations.
    struct CannedRunner {
        stdout: String,
        stderr: String,
        calls: Cell<usize>,
    }

    impl CannedRunner {
        fn new(stderr: &str) -> Self {
            Self {
                stdout: String::new(),
                stderr: stderr.to_string(),
                calls: Cell::new(0),
            }
        }

        fn with_stdout(mut self, stdout: &str) -> Self {
            self.stdout = stdout.to_string();
            self
        }
    }

    impl TestRunner for CannedRunner {
        fn run(&self) -> Result<RunOutput, RunnerError> {
            self.calls.set(self.calls.get() + 1);
            Ok(RunOutput {
                stdout: self.stdout.clone(),
                stderr: self.stderr.clone(),
                exit_code: Some(0),
            })
        }
    }

    struct FailingRunner;

    impl TestRunner for FailingRunner {
        fn run(&self) -> Result<RunOutput, RunnerError> {
            Err(RunnerError::Launch {
                program: "python".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    const OK: &str = "\n....\n----------------------------------------------------------------------\nRan 4 tests in 0.234s\n\nOK\n";
    const FAILED: &str = "\n.EsF\n----------------------------------------------------------------------\nRan 4 tests in 0.012s\n\nFAILED (failures=1, errors=1, skipped=1)\n";

    fn reactor(stderr: &str) -> ChangeReactor<CollectNotifier, CannedRunner> {
        let config = WatchConfig::for_root("/work/pyautotest");
        ChangeReactor::new(&config, CollectNotifier::new(), CannedRunner::new(stderr))
    }

    #[test]
    fn title_from_project_name() {
        assert_eq!(reactor(OK).title(), "pyautotest unit tests");
    }

    #[test]
    fn run_notifies_summary() {
        let r = reactor(FAILED);
        let report = r.run(Some("tests.test_x")).unwrap().unwrap();
        assert_eq!(report.summary.status(), Status::Failed);
        assert_eq!(report.reason, "tests.test_x");

        let sent = r.notifier().requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "pyautotest unit tests");
        assert_eq!(
            sent[0].subtitle,
            "FAILED 4 tests, 1 failure, 1 error, 1 skipped, 33.3%"
        );
        assert_eq!(sent[0].body, "tests.test_x");
        assert_eq!(sent[0].group.as_deref(), Some("pyautotest unit tests"));
    }

    #[test]
    fn run_default_reason() {
        let r = reactor(OK);
        r.run(None).unwrap();
        let sent = r.notifier().requests();
        assert_eq!(sent[0].body, DEFAULT_REASON);
        assert_eq!(sent[0].subtitle, "OK 4 tests, 100.0%");
    }

    #[test]
    fn empty_output_skips_notification() {
        for stderr in ["", "\n  \n"] {
            let r = reactor(stderr);
            assert!(r.run(None).unwrap().is_none());
            assert_eq!(r.runner().calls.get(), 1);
            assert!(r.notifier().requests().is_empty());
        }
    }

    #[test]
    fn stdout_report_used_when_stderr_blank() {
        let config = WatchConfig::for_root("/work/pyautotest");
        let runner = CannedRunner::new("").with_stdout(
            "..\n----------------------------------------------------------------------\nRan 2 tests in 0.001s\n\nOK\n",
        );
        let r = ChangeReactor::new(&config, CollectNotifier::new(), runner);
        let report = r.run(None).unwrap().unwrap();
        assert_eq!(report.summary.subtitle(), "OK 2 tests, 100.0%");
        assert_eq!(r.notifier().requests().len(), 1);
    }

    #[test]
    fn stderr_report_preferred_over_stdout() {
        let config = WatchConfig::for_root("/work/pyautotest");
        let runner = CannedRunner::new(FAILED).with_stdout("debug chatter\nOK\n");
        let r = ChangeReactor::new(&config, CollectNotifier::new(), runner);
        let report = r.run(None).unwrap().unwrap();
        assert_eq!(report.summary.status(), Status::Failed);
    }

    #[test]
    fn interrupted_garbage_is_not_notified() {
        let flag = Arc::new(AtomicBool::new(false));
        let traceback = "Traceback (most recent call last):\n  ...\nKeyboardInterrupt\n";
        let r = reactor(traceback).with_interrupt_flag(Arc::clone(&flag));

        // Without a pending interrupt an unreadable report is still notified.
        assert!(r.run(None).unwrap().is_some());
        assert_eq!(r.notifier().requests().len(), 1);

        flag.store(true, Ordering::SeqCst);
        assert!(r.run(None).unwrap().is_none());
        assert_eq!(r.notifier().requests().len(), 1);
    }

    #[test]
    fn interrupted_readable_report_still_notified() {
        let flag = Arc::new(AtomicBool::new(true));
        let r = reactor(OK).with_interrupt_flag(flag);
        assert!(r.run(None).unwrap().is_some());
        assert_eq!(r.notifier().requests()[0].subtitle, "OK 4 tests, 100.0%");
    }

    #[test]
    fn launch_failure_propagates() {
        let config = WatchConfig::for_root("/work/pyautotest");
        let r = ChangeReactor::new(&config, CollectNotifier::new(), FailingRunner);
        assert!(matches!(r.run(None), Err(RunnerError::Launch { .. })));
        assert!(r.notifier().requests().is_empty());
    }

    #[test]
    fn react_reason_for_every_kind() {
        for kind in [
            ChangeKind::Created,
            ChangeKind::Modified,
            ChangeKind::Deleted,
            ChangeKind::Moved,
        ] {
            let r = reactor(OK);
            let event = ChangeEvent::new("/work/pyautotest/project/file.py", kind, false);
            let report = r.react(&event).unwrap().unwrap();
            assert_eq!(report.reason, format!("project/file.py {kind}"));
            assert_eq!(r.notifier().requests()[0].body, format!("project/file.py {kind}"));
        }
    }

    #[test]
    fn react_relative_event_path() {
        let r = reactor(OK);
        let event = ChangeEvent::new("./project/file.py", ChangeKind::Modified, false);
        assert_eq!(r.reason_for(&event), "project/file.py modified");
    }

    #[test]
    fn react_ignores_directories_and_other_extensions() {
        for kind in [
            ChangeKind::Created,
            ChangeKind::Modified,
            ChangeKind::Deleted,
            ChangeKind::Moved,
        ] {
            let r = reactor(OK);
            let dir = ChangeEvent::new("/work/pyautotest/pkg.py", kind, true);
            let txt = ChangeEvent::new("/work/pyautotest/README.txt", kind, false);
            let pyc = ChangeEvent::new("/work/pyautotest/__pycache__/a.pyc", kind, false);
            let bare = ChangeEvent::new("/work/pyautotest/Makefile", kind, false);
            for event in [dir, txt, pyc, bare] {
                assert!(r.react(&event).unwrap().is_none());
            }
            assert_eq!(r.runner().calls.get(), 0);
            assert!(r.notifier().requests().is_empty());
        }
    }

    #[test]
    fn react_extension_case_insensitive() {
        let r = reactor(OK);
        let event = ChangeEvent::new("/work/pyautotest/Setup.PY", ChangeKind::Modified, false);
        assert!(r.react(&event).unwrap().is_some());
        assert_eq!(r.runner().calls.get(), 1);
    }

    #[test]
    fn report_serializes() {
        let r = reactor(OK);
        let report = r.run(None).unwrap().unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["reason"], DEFAULT_REASON);
        assert_eq!(json["summary"]["status"], "OK");
        assert_eq!(json["summary"]["total"], 4);
        assert!(json["ran_at"].as_str().unwrap().contains('T'));
    }
}
