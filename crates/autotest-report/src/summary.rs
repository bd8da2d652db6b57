use std::fmt;

use serde::Serialize;

// ── Status ──

/// Overall verdict printed on the final line of a unittest report.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Failed,
    #[default]
    Unknown,
}

impl Status {
    /// Read the leading `OK` / `FAILED` token of a status line.
    pub fn parse(line: &str) -> Self {
        match line.split(|c: char| c.is_whitespace() || c == '(').next() {
            Some("OK") => Status::Ok,
            Some("FAILED") => Status::Failed,
            _ => Status::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Failed => "FAILED",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Summary ──

/// Counts extracted from one test run. `passed` and `percentage` are derived
/// at construction and never change afterwards.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TestRunSummary {
    status: Status,
    total: u32,
    failed: u32,
    errored: u32,
    skipped: u32,
    passed: u32,
    percentage: f64,
}

impl TestRunSummary {
    pub fn new(status: Status, total: u32, failed: u32, errored: u32, skipped: u32) -> Self {
        // Malformed reports can claim more problems than tests; clamp instead of wrapping.
        let passed = total
            .saturating_sub(failed)
            .saturating_sub(errored)
            .saturating_sub(skipped);
        let runnable = total.saturating_sub(skipped);
        let percentage = if total == 0 || runnable == 0 {
            0.0
        } else {
            f64::from(passed) / f64::from(runnable) * 100.0
        };
        Self {
            status,
            total,
            failed,
            errored,
            skipped,
            passed,
            percentage,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    pub fn errored(&self) -> u32 {
        self.errored
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn passed(&self) -> u32 {
        self.passed
    }

    /// Unrounded pass rate over the tests that actually ran.
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Pass rate rounded to one decimal place, e.g. `33.3`.
    pub fn percentage_display(&self) -> String {
        format!("{:.1}", self.percentage)
    }

    /// One-line notification subtitle, e.g. `FAILED 4 tests, 2 failures, 50.0%`.
    pub fn subtitle(&self) -> String {
        let mut out = String::from(self.status.as_str());
        if self.total > 0 {
            let noun = if self.total == 1 { "test" } else { "tests" };
            out.push_str(&format!(" {} {noun},", self.total));
        }
        if self.failed > 0 {
            let noun = if self.failed == 1 { "failure" } else { "failures" };
            out.push_str(&format!(" {} {noun},", self.failed));
        }
        if self.errored > 0 {
            let noun = if self.errored == 1 { "error" } else { "errors" };
            out.push_str(&format!(" {} {noun},", self.errored));
        }
        if self.skipped > 0 {
            out.push_str(&format!(" {} skipped,", self.skipped));
        }
        out.push_str(&format!(" {}%", self.percentage_display()));
        out
    }
}
