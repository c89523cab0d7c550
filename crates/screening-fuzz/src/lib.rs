//! Fuzzing library for paper-screening.
//!
//! Targets cover the parsers that see untrusted upstream text: provider
//! completions, arXiv Atom feeds and Semantic Scholar JSON.
//!
//! # Usage
//!
//! ```bash
//! cd crates/screening-fuzz
//! cargo +nightly fuzz run fuzz_provider_response -- -max_total_time=60
//! ```

pub use paper_screening::analysis;
pub use paper_screening::models;
pub use paper_screening::sources;
