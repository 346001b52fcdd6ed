pub mod analyze;
pub mod extract;
pub mod materialize;
pub mod runner;
pub mod summarizer;
