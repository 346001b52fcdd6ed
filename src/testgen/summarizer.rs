//! summarizer.rs
//!
//! Reads pytest's closing summary line (`1 failed, 2 passed in 0.12s`)
//! into counts. Output that never reached the summary yields `None`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

impl fmt::Display for TestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} passed, {} failed", self.passed, self.failed)?;
        if self.errors > 0 {
            write!(f, ", {} error(s)", self.errors)?;
        }
        Ok(())
    }
}

fn count_re(word: &str) -> Regex {
    Regex::new(&format!(r"(\d+)\s+{word}\b")).expect("summary regex")
}

fn last_count(re: &Regex, output: &str) -> Option<usize> {
    re.captures_iter(output)
        .last()
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
}

fn summary_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^=*\s*\d+\s+\w+.*\bin\s+\d+(?:\.\d+)?s\b").expect("summary line regex")
    })
}

/// Last line shaped like `1 failed, 2 passed in 0.10s`, with or without
/// the `===` banner.
fn summary_line(output: &str) -> Option<&str> {
    output
        .lines()
        .rev()
        .find(|l| summary_line_re().is_match(l.trim_end()))
}

pub fn parse_pytest_summary(output: &str) -> Option<TestSummary> {
    let line = summary_line(output)?;

    static RES: OnceLock<[Regex; 3]> = OnceLock::new();
    let [pass, fail, err] = RES.get_or_init(|| {
        [count_re("passed"), count_re("failed"), count_re("errors?")]
    });

    let passed = last_count(pass, line);
    let failed = last_count(fail, line);
    let errors = last_count(err, line);

    if passed.is_none() && failed.is_none() && errors.is_none() {
        return None;
    }

    Some(TestSummary {
        passed: passed.unwrap_or(0),
        failed: failed.unwrap_or(0),
        errors: errors.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_and_passed() {
        let s = parse_pytest_summary("..F\n1 failed, 2 passed in 0.10s\n").unwrap();
        assert_eq!(s, TestSummary { passed: 2, failed: 1, errors: 0 });
        assert_eq!(s.to_string(), "2 passed, 1 failed");
    }

    #[test]
    fn only_passed() {
        let s = parse_pytest_summary("....\n4 passed in 0.02s\n").unwrap();
        assert_eq!(s.passed, 4);
        assert_eq!(s.failed, 0);
    }

    #[test]
    fn collection_errors() {
        let s = parse_pytest_summary("ERROR test_x.py\n1 error in 0.05s\n").unwrap();
        assert_eq!(s.errors, 1);
        assert_eq!(s.to_string(), "0 passed, 0 failed, 1 error(s)");
    }

    #[test]
    fn banner_summary_line() {
        let s = parse_pytest_summary("===== 3 passed, 1 warning in 1.25s =====\n").unwrap();
        assert_eq!(s, TestSummary { passed: 3, failed: 0, errors: 0 });
    }

    #[test]
    fn counts_in_failure_messages_are_ignored() {
        let out = "F.\n\
                   E   AssertionError: assert 'server returned 2 errors' == 'ok'\n\
                   FAILED test_api.py::test_status - 3 passed checks before\n\
                   1 failed, 1 passed in 0.1s\n";
        let s = parse_pytest_summary(out).unwrap();
        assert_eq!(s, TestSummary { passed: 1, failed: 1, errors: 0 });
    }

    #[test]
    fn counts_without_summary_line_are_unparsed() {
        assert_eq!(parse_pytest_summary("2 errors reported by server"), None);
    }

    #[test]
    fn unparseable_output() {
        assert_eq!(parse_pytest_summary("No module named pytest"), None);
    }
}
