//! Paper Screening
//!
//! Retrieves academic papers from arXiv, Semantic Scholar and Scholar result
//! pages, normalizes them into one record shape, analyzes each with an AI
//! provider (falling back to deterministic rules) and keeps a bounded
//! history of results.
//!
//! # Features
//!
//! - **Source adapters**: Atom, Graph API JSON and HTML scraping behind one trait
//! - **Partial success**: a failing source never aborts the others
//! - **Five AI providers**: OpenAI, OpenRouter, Doubao, Claude, Gemini
//! - **Always an answer**: JSON, embedded JSON, labeled text, then rules
//! - **Bounded state**: content, analysis and history caps with oldest-first eviction
//!
//! # Example
//!
//! ```no_run
//! use paper_screening::{Config, Pipeline, models::{SearchQuery, SourceId}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let pipeline = Pipeline::new(&config)?;
//!
//!     let outcome = pipeline
//!         .aggregate_search(&SearchQuery::new("agent benchmark", 10), &[SourceId::Arxiv])
//!         .await;
//!     println!("{} papers", outcome.papers.len());
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod analysis;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod reader;
pub mod sources;
pub mod store;
pub mod text;

pub use aggregator::{AggregateOutcome, SearchAggregator, SearchStatus};
pub use analysis::AnalysisEngine;
pub use client::HttpClient;
pub use config::Config;
pub use error::{ClientError, ErrorKind, Failure, PipelineError};
pub use pipeline::{AnalyzeOptions, Pipeline, ScreeningReport, ScreeningRequest};
pub use reader::ContentReader;
