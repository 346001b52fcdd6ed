pub mod backend;
pub mod client;
pub mod prompt;

pub use backend::TextGenerator;
pub use client::LlmClient;
pub use prompt::LlmPrompt;
