//! LLM collaborator used to turn invoice text into JSON.

mod openai;
mod retry;

pub use openai::OpenAiClient;
pub use retry::RetryPolicy;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::extraction::Prompt;

/// A chat model that answers a prompt with raw text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        (**self).complete(prompt).await
    }
}
