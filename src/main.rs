use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use fastapi_testgen::{
    config::Config,
    introspect::load_app,
    llm::LlmClient,
    pipeline::{Pipeline, PipelineReport},
    testgen::{materialize::SaveMode, runner::TestRunner},
    Result,
};

/// Exit code when the pipeline aborts before tests could run.
const PIPELINE_FAILURE: i32 = 2;

#[derive(Parser)]
#[command(
    name = "fastapi-testgen",
    version,
    about = "Draft pytest suites for a FastAPI app with an LLM, run them, and analyze failures."
)]
struct Cli {
    /// FastAPI application source file
    #[arg(long)]
    app: Option<PathBuf>,

    /// Exported OpenAPI schema (JSON) to include in the prompt
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Config file (defaults to the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model override
    #[arg(long)]
    model: Option<String>,

    /// Write the test file to the temp dir and delete it afterwards
    #[arg(long)]
    temporary: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(report) => {
            print_report(&report);
            process::exit(report.exit_code());
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(PIPELINE_FAILURE);
        }
    }
}

fn run(cli: Cli) -> Result<PipelineReport> {
    let mut cfg = Config::load(cli.config.as_deref())?;

    if let Some(app) = cli.app {
        cfg.app_path = app;
    }
    if let Some(schema) = cli.schema {
        cfg.schema_path = Some(schema);
    }
    if let Some(model) = cli.model {
        cfg.llm.model = model;
    }
    if cli.temporary {
        cfg.save_mode = SaveMode::Temporary;
    }

    let app = load_app(&cfg.app_path, cfg.schema_path.as_deref())?;
    let client = LlmClient::new(cfg.llm.clone())?;
    let runner =
        TestRunner::pytest(cfg.python.clone()).with_timeout(Duration::from_secs(cfg.run_timeout_secs));

    Pipeline::new(client, runner, &cfg).run(&app)
}

fn print_report(report: &PipelineReport) {
    println!(
        "Generated {} test(s): {}",
        report.test_file.test_count,
        report.test_file.path.display()
    );

    match report.summary {
        Some(s) => println!("Results: {s}"),
        None => println!("Results: could not parse test result summary"),
    }

    if report.run.timed_out {
        println!("Test run timed out");
    }

    if let Some(text) = &report.suggestion {
        println!("\nAI Analysis:\n{text}");
    }
}
