//! # Summa
//!
//! Summarize a web page or a piece of text with an LLM.
//!
//! ## Features
//!
//! - **Content extraction**: fetches a page and reduces it to title and clean body text
//! - **Bounded tool use**: the model may call the fetch tool a limited number of times
//! - **Uniform results**: every outcome maps to `{ text?, error?, success }`
//! - **Two front ends**: a CLI and a small HTTP endpoint over the same pipeline

pub mod agent;
pub mod config;
pub mod gemini;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod response;
pub mod router;
pub mod scraper;
pub mod server;
pub mod summary;
pub mod tools;

pub use config::Config;
pub use pipeline::Pipeline;
pub use response::SummaryResponse;
pub use router::Mode;
pub use summary::{ExtractionResult, SummarizationRequest, SummaryResult, ToolInvocationBudget};
