pub mod generator;
pub mod openai;
pub mod provider;
pub mod types;

pub use generator::ResponseGenerator;
pub use openai::OpenAiClient;
pub use provider::{EmbeddingProvider, GenerationProvider};
