//! LLM-assisted field extraction under a schema.

mod normalizer;
mod pipeline;
mod prompt;
mod validator;

pub use normalizer::normalize;
pub use pipeline::{ExtractionOutcome, ExtractionPipeline};
pub use prompt::Prompt;
pub use validator::ResponseValidator;
