use crate::llm::backend::TextGenerator;
use crate::llm::prompt::build_analysis_prompt;
use crate::testgen::runner::RunResult;

/// Best-effort remediation advice for a failed run.
pub struct FailureAnalyzer<'a, G: TextGenerator> {
    generator: &'a G,
    app_source: &'a str,
}

impl<'a, G: TextGenerator> FailureAnalyzer<'a, G> {
    pub fn new(generator: &'a G, app_source: &'a str) -> Self {
        Self {
            generator,
            app_source,
        }
    }

    /// `None` when the run passed, when the model call fails, or when
    /// the model has nothing to say. Never an error.
    pub fn analyze(&self, run: &RunResult) -> Option<String> {
        if run.success() {
            return None;
        }

        log::info!("Analyzing test failures with AI");
        let prompt = build_analysis_prompt(self.app_source, run);

        match self.generator.generate(&prompt) {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                log::warn!("Analysis returned an empty response");
                None
            }
            Err(e) => {
                log::warn!("Error while analyzing test results: {e}");
                None
            }
        }
    }
}
