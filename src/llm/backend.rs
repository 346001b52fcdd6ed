use crate::error::Result;
use crate::llm::prompt::LlmPrompt;

/// Anything that can turn a prompt into text. The pipeline only ever
/// talks to the model through this.
pub trait TextGenerator {
    fn generate(&self, prompt: &LlmPrompt) -> Result<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, prompt: &LlmPrompt) -> Result<String> {
        (**self).generate(prompt)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn generate(&self, prompt: &LlmPrompt) -> Result<String> {
        (**self).generate(prompt)
    }
}
