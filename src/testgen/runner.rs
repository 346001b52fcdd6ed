// Executes one test file and returns raw output + timing.
// A failing suite is a normal result; only spawn failures are errors.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
// Background processes spawned by the suite can hold the pipes open
// after the child exits; reads stop this long past the run deadline.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u128,
    pub timed_out: bool,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, newline-separated.
    pub fn combined_output(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

#[derive(Debug, Clone)]
pub struct TestRunner {
    program: String,
    args: Vec<String>,
    trailing: Vec<String>,
    timeout: Duration,
}

impl TestRunner {
    /// `<python> -m pytest <file> --tb=short -q`
    pub fn pytest(python: impl Into<String>) -> Self {
        Self {
            program: python.into(),
            args: vec!["-m".into(), "pytest".into()],
            trailing: vec!["--tb=short".into(), "-q".into()],
            timeout: Duration::from_secs(300),
        }
    }

    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            trailing: Vec::new(),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn run(&self, test_path: &Path) -> Result<RunResult> {
        log::info!("Running tests in {}", test_path.display());

        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(test_path)
            .args(&self.trailing)
            .env(
                "PYTHONPATH",
                std::env::current_dir().unwrap_or_else(|_| ".".into()),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::RunnerInvocation {
                program: self.program.clone(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = started + self.timeout;
        let (code, timed_out) = wait_with_deadline(&mut child, deadline)?;
        if timed_out {
            log::warn!(
                "Test run exceeded {}s and was killed",
                self.timeout.as_secs()
            );
        }

        let drain_deadline = deadline.max(Instant::now()) + DRAIN_GRACE;

        Ok(RunResult {
            exit_code: code,
            stdout: collect(stdout, drain_deadline),
            stderr: collect(stderr, drain_deadline),
            duration_ms: started.elapsed().as_millis(),
            timed_out,
        })
    }
}

struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Drain> {
    pipe.map(|mut p| {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&buf);

        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match p.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut b) => b.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
            let _ = tx.send(());
        });

        Drain { buf, done }
    })
}

/// Whatever was read by `deadline`; a pipe still held open is abandoned.
fn collect(drain: Option<Drain>, deadline: Instant) -> String {
    let Some(drain) = drain else {
        return String::new();
    };

    let budget = deadline.saturating_duration_since(Instant::now());
    if drain.done.recv_timeout(budget).is_err() {
        log::warn!("Test output pipe still open after the run; keeping partial output");
    }

    drain
        .buf
        .lock()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

fn wait_with_deadline(child: &mut Child, deadline: Instant) -> Result<(i32, bool)> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status.code().unwrap_or(-1), false));
        }

        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok((-1, true));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_output_joins_streams() {
        let r = RunResult {
            exit_code: 1,
            stdout: "out".into(),
            stderr: "err\n".into(),
            duration_ms: 0,
            timed_out: false,
        };
        assert_eq!(r.combined_output(), "out\nerr\n");
        assert!(!r.success());
    }

    #[test]
    fn missing_program_is_invocation_error() {
        let runner = TestRunner::new("definitely-not-a-real-binary-7f3a", &[]);
        let err = runner.run(Path::new("test_x.py")).unwrap_err();
        assert!(matches!(err, Error::RunnerInvocation { .. }));
    }
}
