//! RAG (Retrieval-Augmented Generation) building blocks.
//!
//! This module provides:
//! - `VectorStore` / `CouchbaseVectorStore`: the similarity-search boundary
//! - `VectorRetriever`: ranked, filtered, `top_k`-bounded retrieval
//! - `ContextAssembler`: budget-bounded, deduplicated context from records
//! - `PromptBuilder`: instruction template + context + query
//! - `attribution`: mapping generated text back to record ids

pub mod answer;
pub mod attribution;
mod context_builder;
pub mod couchbase;
mod prompt;
mod retriever;
mod store;

pub use answer::{Answer, NO_GROUNDED_MATCH};
pub use context_builder::{Context, ContextAssembler, ContextFragment};
pub use couchbase::CouchbaseVectorStore;
pub use prompt::{Prompt, PromptBuilder, HOTEL_INSTRUCTIONS, NO_RECORDS_NOTICE};
pub use retriever::{rank_order, RecordFilter, VectorRetriever};
pub use store::{Record, Scalar, VectorStore};
