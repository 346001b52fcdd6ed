use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::testgen::runner::RunResult;
use crate::testgen::summarizer::TestSummary;

const RULE: &str = "=============================";

pub struct LogEntry<'a> {
    pub timestamp: DateTime<Local>,
    pub test_file: &'a Path,
    pub prompt_hash: &'a str,
    pub run: &'a RunResult,
    pub summary: Option<TestSummary>,
}

/// Append-only run log. Never truncates.
pub struct ResultLogger {
    path: PathBuf,
}

impl ResultLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &LogEntry) -> io::Result<()> {
        self.write_block(&render_run(entry))
    }

    pub fn append_suggestion(&self, timestamp: DateTime<Local>, text: &str) -> io::Result<()> {
        self.write_block(&render_suggestion(timestamp, text))
    }

    fn write_block(&self, block: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(block.as_bytes())
    }
}

pub fn render_run(entry: &LogEntry) -> String {
    let run = entry.run;
    let mut s = String::new();

    s.push_str(&format!(
        "=== Test Run: {} ===\n",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S")
    ));
    s.push_str(&format!("file: {}\n", entry.test_file.display()));
    s.push_str(&format!("prompt: {}\n", entry.prompt_hash));

    let outcome = match (run.timed_out, run.success()) {
        (true, _) => "timed out",
        (false, true) => "passed",
        (false, false) => "failed",
    };
    s.push_str(&format!(
        "outcome: {} (exit code {}, {} ms)\n",
        outcome, run.exit_code, run.duration_ms
    ));

    match entry.summary {
        Some(sum) => s.push_str(&format!("results: {sum}\n")),
        None => s.push_str("results: unparsed\n"),
    }

    push_section(&mut s, &run.stdout);

    if !run.stderr.is_empty() {
        s.push_str("--- STDERR ---\n");
        push_section(&mut s, &run.stderr);
    }

    s.push_str(RULE);
    s.push('\n');
    s
}

pub fn render_suggestion(timestamp: DateTime<Local>, text: &str) -> String {
    let mut s = format!(
        "--- Suggestion: {} ---\n",
        timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    push_section(&mut s, text);
    s.push_str(RULE);
    s.push('\n');
    s
}

fn push_section(s: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    s.push_str(text);
    if !text.ends_with('\n') {
        s.push('\n');
    }
}

/// Saves a suggestion to `<dir>/api_analysis_<stamp>.log`.
pub fn save_analysis(dir: &Path, timestamp: DateTime<Local>, text: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "api_analysis_{}.log",
        timestamp.format("%Y-%m-%d_%H-%M-%S")
    ));

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(text.as_bytes())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn run() -> RunResult {
        RunResult {
            exit_code: 1,
            stdout: ".F\n1 failed, 1 passed in 0.01s".into(),
            stderr: "warning: deprecated\n".into(),
            duration_ms: 12,
            timed_out: false,
        }
    }

    #[test]
    fn run_block_layout() {
        let ts = Local.with_ymd_and_hms(2025, 8, 6, 14, 28, 57).unwrap();
        let r = run();
        let block = render_run(&LogEntry {
            timestamp: ts,
            test_file: Path::new("tests/test_x.py"),
            prompt_hash: "abc123",
            run: &r,
            summary: Some(TestSummary { passed: 1, failed: 1, errors: 0 }),
        });

        assert!(block.starts_with("=== Test Run: 2025-08-06 14:28:57 ===\n"));
        assert!(block.contains("outcome: failed (exit code 1, 12 ms)\n"));
        assert!(block.contains("results: 1 passed, 1 failed\n"));
        assert!(block.contains("1 failed, 1 passed in 0.01s\n--- STDERR ---\nwarning: deprecated\n"));
        assert!(block.ends_with(&format!("{RULE}\n")));
    }

    #[test]
    fn suggestion_block_ends_with_rule() {
        let ts = Local.with_ymd_and_hms(2025, 8, 6, 14, 28, 57).unwrap();
        let block = render_suggestion(ts, "- check 404 handling");
        assert_eq!(
            block,
            format!("--- Suggestion: 2025-08-06 14:28:57 ---\n- check 404 handling\n{RULE}\n")
        );
    }

    #[test]
    fn analysis_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let ts = Local.with_ymd_and_hms(2025, 8, 6, 14, 28, 57).unwrap();
        let path = save_analysis(&dir.path().join("analysis"), ts, "advice").unwrap();
        assert!(path.ends_with("api_analysis_2025-08-06_14-28-57.log"));
        assert_eq!(fs::read_to_string(path).unwrap(), "advice");
    }
}
