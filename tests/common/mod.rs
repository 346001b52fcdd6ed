#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

use fastapi_testgen::config::Config;
use fastapi_testgen::llm::{LlmPrompt, TextGenerator};
use fastapi_testgen::testgen::runner::TestRunner;
use fastapi_testgen::{Error, Result};

/// Replays canned replies in order and records every prompt it saw.
pub struct StubGenerator {
    replies: RefCell<VecDeque<Result<String>>>,
    pub prompts: RefCell<Vec<LlmPrompt>>,
}

impl StubGenerator {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl TextGenerator for StubGenerator {
    fn generate(&self, prompt: &LlmPrompt) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Network("no canned reply left".into())))
    }
}

pub fn ok(text: &str) -> Result<String> {
    Ok(text.to_string())
}

/// `sh -c <script>`; the test file path arrives as `$1`.
pub fn sh_runner(script: &str) -> TestRunner {
    TestRunner::new("sh", &["-c", script, "sh"])
}

pub fn config_in(root: &Path) -> Config {
    Config {
        tests_dir: root.join("tests"),
        log_file: root.join("logs/test_results.log"),
        analysis_dir: root.join("analysis"),
        ..Config::default()
    }
}

pub const PASSING_SCRIPT: &str = "echo '..'; echo '2 passed in 0.01s'; exit 0";

pub const FAILING_SCRIPT: &str =
    "echo '.F'; echo 'FAILED test_api.py::test_delete - assert 500 == 200'; echo '1 failed, 1 passed in 0.02s'; echo 'DeprecationWarning: utcnow' >&2; exit 1";

pub const FENCED_REPLY: &str =
    "Sure, here are the tests:\n```python\nfrom fastapi.testclient import TestClient\n\ndef test_list():\n    assert True\n\ndef test_delete():\n    assert False\n```\nLet me know!";

pub const APP_SOURCE: &str = "from fastapi import FastAPI\n\napp = FastAPI()\n\n@app.get(\"/tasks\")\ndef list_tasks():\n    return []\n\n@app.delete(\"/tasks/{task_id}\")\ndef delete_task(task_id: str):\n    return {}\n";
