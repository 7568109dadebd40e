//! # pagebrief
//!
//! Webpage summarization over HTTP, with follow-up chat grounded in the summary.
//!
//! ## Features
//!
//! - **Main-content extraction**: landmark selectors with a text-density fallback
//! - **Structured summaries**: a `{topic, summary}` schema with a tolerant parser
//! - **Provider agnostic**: OpenAI, Azure OpenAI, Anthropic and Gemini behind one trait
//! - **Sessions**: in-memory conversations keyed by an opaque identifier

pub mod agent;
pub mod client;
pub mod config;
pub mod parser;
pub mod providers;
pub mod scraper;
pub mod server;
pub mod session;
pub mod summary;

pub use config::Config;
pub use session::SessionStore;
pub use summary::StructuredSummary;
