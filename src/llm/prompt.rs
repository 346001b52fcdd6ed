use sha2::{Digest, Sha256};

use crate::introspect::AppDescription;
use crate::testgen::runner::RunResult;

const PROMPT_ABI_VERSION: &str = "v1-fastapi-pytest";

/// Per-stream cap for pytest output in the analysis prompt (chars, tail kept).
const OUTPUT_LIMIT: usize = 10_000;
/// Cap for the app source in the analysis prompt (chars, head kept).
const SOURCE_LIMIT: usize = 20_000;

#[derive(Debug, Clone)]
pub struct LlmPrompt {
    pub system: String,
    pub user: String,
}

impl LlmPrompt {
    pub fn hash(&self) -> String {
        let mut h = Sha256::new();
        h.update(PROMPT_ABI_VERSION.as_bytes());
        h.update(self.system.as_bytes());
        h.update(self.user.as_bytes());
        hex::encode(h.finalize())
    }
}

/* ============================================================
   Test generation
   ============================================================ */

pub fn build_generation_prompt(app: &AppDescription) -> LlmPrompt {
    LlmPrompt {
        system: "You generate Python pytest test functions.".to_string(),
        user: generation_user_prompt(app),
    }
}

fn generation_user_prompt(app: &AppDescription) -> String {
    let mut out = String::new();

    out.push_str("You are an expert Python test engineer.\n\n");

    if app.is_empty() {
        out.push_str(
            "Generate Pytest functions for testing all endpoints of a FastAPI app.\n\
             No application source is available; write a generic suite that exercises \
             common CRUD endpoints and error handling.\n\n",
        );
        out.push_str(&instructions());
        return out;
    }

    out.push_str("Generate Pytest functions for testing all endpoints of a FastAPI app:\n\n");

    /* ---------- SOURCE ---------- */
    if !app.source.trim().is_empty() {
        out.push_str("APPLICATION SOURCE\n```python\n");
        out.push_str(app.source.trim_end());
        out.push_str("\n```\n\n");
    }

    /* ---------- ROUTES ---------- */
    if !app.routes.is_empty() {
        out.push_str("ROUTES\n");
        for r in &app.routes {
            match &r.handler {
                Some(h) => out.push_str(&format!("- {} {} ({})\n", r.method, r.path, h)),
                None => out.push_str(&format!("- {} {}\n", r.method, r.path)),
            }
        }
        out.push('\n');
    }

    /* ---------- SCHEMA ---------- */
    if let Some(schema) = &app.schema {
        let pretty = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
        out.push_str("OPENAPI SCHEMA\n```json\n");
        out.push_str(&pretty);
        out.push_str("\n```\n\n");
    }

    let module = app.module_path();
    if !module.is_empty() {
        out.push_str(&format!(
            "My app is in package {module} (import it with `from {module} import app`).\n\n"
        ));
    }

    out.push_str(&instructions());
    out
}

fn instructions() -> String {
    "Rules:\n\
     - Use realistic test data and assert status codes\n\
     - Use `TestClient` from `fastapi.testclient`\n\
     - Also cover performance, filtering and edge test cases\n\
     - Make sure to clear the database after each test run\n\
     - Put all code in one Python file\n\
     - Return the code in a single ```python fenced block\n"
        .to_string()
}

/* ============================================================
   Failure analysis
   ============================================================ */

pub fn build_analysis_prompt(app_source: &str, run: &RunResult) -> LlmPrompt {
    let mut user = String::new();

    user.push_str(
        "Analyze the following pytest output and suggest what issues may exist in the API \
         implementation. Structure your answer as bullet points.\n\n",
    );

    if !app_source.trim().is_empty() {
        user.push_str("API SOURCE\n```python\n");
        user.push_str(&truncate_head(app_source.trim_end(), SOURCE_LIMIT));
        user.push_str("\n```\n\n");
    }

    user.push_str(&format!("EXIT CODE: {}\n\n", run.exit_code));

    user.push_str("PYTEST STDOUT\n```\n");
    user.push_str(&truncate_tail(run.stdout.trim_end(), OUTPUT_LIMIT));
    user.push_str("\n```\n");

    if !run.stderr.trim().is_empty() {
        user.push_str("\nPYTEST STDERR\n```\n");
        user.push_str(&truncate_tail(run.stderr.trim_end(), OUTPUT_LIMIT));
        user.push_str("\n```\n");
    }

    LlmPrompt {
        system: "You are a Python test engineer.".to_string(),
        user,
    }
}

/* ============================================================
   Helpers
   ============================================================ */

// pytest prints the failure details and summary last.
fn truncate_tail(s: &str, limit: usize) -> String {
    let total = s.chars().count();
    if total <= limit {
        return s.to_string();
    }

    let tail: String = s.chars().skip(total - limit).collect();
    format!("...truncated...\n{tail}")
}

fn truncate_head(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }

    let head: String = s.chars().take(limit).collect();
    format!("{head}\n...truncated...")
}
