use std::sync::LazyLock;

use regex::Regex;

use crate::summary::{Status, TestRunSummary};

/// How many trailing lines of the report are inspected. The unittest footer is
/// `Ran N tests in T s`, a blank line, then the status line.
const TAIL_LINES: usize = 8;

static RAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Ran (\d+)\b").unwrap());

/// Matches `failures=F`, `errors=E` and `skipped=S` inside the status
/// parentheses. Anchoring on `(` or `,` keeps `expected failures=N` out.
static COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(,]\s*(failures|errors|skipped)=(\d+)").unwrap());

/// Parse the report printed by a `python -m unittest` run into a summary.
///
/// Never fails: missing or garbled footers degrade to zero counts and
/// [`Status::Unknown`]. Empty output yields [`TestRunSummary::default`].
pub fn parse_output(output: &str) -> TestRunSummary {
    let lines: Vec<&str> = output.lines().map(str::trim_end).collect();
    let last = match lines.iter().rposition(|l| !l.trim().is_empty()) {
        Some(i) => i,
        None => return TestRunSummary::default(),
    };
    let start = (last + 1).saturating_sub(TAIL_LINES);
    let tail = &lines[start..=last];
    let status_line = tail[tail.len() - 1].trim();

    let total = tail
        .iter()
        .rev()
        .find_map(|line| {
            RAN.captures(line.trim_start())
                .and_then(|c| c[1].parse::<u32>().ok())
        })
        .unwrap_or(0);

    let mut failed = 0;
    let mut errored = 0;
    let mut skipped = 0;
    for caps in COUNTER.captures_iter(status_line) {
        let value = caps[2].parse::<u32>().unwrap_or(0);
        match &caps[1] {
            "failures" => failed = value,
            "errors" => errored = value,
            "skipped" => skipped = value,
            _ => {}
        }
    }

    TestRunSummary::new(Status::parse(status_line), total, failed, errored, skipped)
}

impl TestRunSummary {
    /// Shorthand for [`parse_output`].
    pub fn parse(output: &str) -> Self {
        parse_output(output)
    }
}
