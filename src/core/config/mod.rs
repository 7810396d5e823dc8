pub mod defaults;
pub mod service;
pub mod validation;

pub use service::ConfigService;
pub use validation::{validate, AppConfig, CouchbaseSettings, OpenAiSettings, RagSettings, ServerSettings};
