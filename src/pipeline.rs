use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::config::Config;
use crate::error::Result;
use crate::introspect::AppDescription;
use crate::llm::backend::TextGenerator;
use crate::llm::prompt::build_generation_prompt;
use crate::logger::{save_analysis, LogEntry, ResultLogger};
use crate::testgen::analyze::FailureAnalyzer;
use crate::testgen::extract::extract_code;
use crate::testgen::materialize::{materialize_test, GeneratedTestFile, SaveMode};
use crate::testgen::runner::{RunResult, TestRunner};
use crate::testgen::summarizer::{parse_pytest_summary, TestSummary};

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub test_file: GeneratedTestFile,
    pub prompt_hash: String,
    pub run: RunResult,
    pub summary: Option<TestSummary>,
    pub suggestion: Option<String>,
    pub analysis_file: Option<PathBuf>,
}

impl PipelineReport {
    /// The test run's exit code, not the pipeline's.
    pub fn exit_code(&self) -> i32 {
        self.run.exit_code
    }
}

pub struct Pipeline<G: TextGenerator> {
    generator: G,
    runner: TestRunner,
    logger: ResultLogger,
    tests_dir: PathBuf,
    analysis_dir: PathBuf,
    save_mode: SaveMode,
}

impl<G: TextGenerator> Pipeline<G> {
    pub fn new(generator: G, runner: TestRunner, cfg: &Config) -> Self {
        Self {
            generator,
            runner,
            logger: ResultLogger::new(&cfg.log_file),
            tests_dir: cfg.tests_dir.clone(),
            analysis_dir: cfg.analysis_dir.clone(),
            save_mode: cfg.save_mode,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn run(&self, app: &AppDescription) -> Result<PipelineReport> {
        self.run_at(app, Local::now())
    }

    /// Same as [`run`](Self::run) with a fixed clock for file names.
    pub fn run_at(&self, app: &AppDescription, stamp: DateTime<Local>) -> Result<PipelineReport> {
        /* ================= GENERATE ================= */

        let prompt = build_generation_prompt(app);
        let prompt_hash = prompt.hash();

        log::info!("Generating tests");
        let response = self.generator.generate(&prompt)?;

        /* ================= MATERIALIZE ================= */

        let code = extract_code(&response)?;
        let test_file = materialize_test(&self.tests_dir, self.save_mode, &code, stamp)?;

        /* ================= RUN ================= */

        let run = self.runner.run(&test_file.path);
        if let Err(e) = test_file.cleanup() {
            log::warn!("Could not remove temporary test file: {e}");
        }
        let run = run?;

        let summary = parse_pytest_summary(&run.stdout);
        match summary {
            Some(s) => log::info!("Results: {s}"),
            None => log::info!("Could not parse test result summary"),
        }

        /* ================= LOG ================= */

        let entry = LogEntry {
            timestamp: Local::now(),
            test_file: &test_file.path,
            prompt_hash: &prompt_hash,
            run: &run,
            summary,
        };
        match self.logger.append(&entry) {
            Ok(()) => log::info!("Test results saved to {}", self.logger.path().display()),
            Err(e) => log::warn!(
                "Could not write test log {}: {e}",
                self.logger.path().display()
            ),
        }

        /* ================= ANALYZE ================= */

        let suggestion = FailureAnalyzer::new(&self.generator, &app.source).analyze(&run);
        let mut analysis_file = None;

        if let Some(text) = &suggestion {
            let now = Local::now();

            if let Err(e) = self.logger.append_suggestion(now, text) {
                log::warn!("Could not append suggestion to test log: {e}");
            }

            match save_analysis(&self.analysis_dir, now, text) {
                Ok(path) => {
                    log::info!("AI analysis saved to {}", path.display());
                    analysis_file = Some(path);
                }
                Err(e) => log::warn!("Could not save AI analysis: {e}"),
            }
        }

        Ok(PipelineReport {
            test_file,
            prompt_hash,
            run,
            summary,
            suggestion,
            analysis_file,
        })
    }
}
