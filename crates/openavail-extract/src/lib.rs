//! Hybrid availability-statement extraction.
//!
//! Candidate paragraphs are ranked per target (data/code) with keyword and
//! heading heuristics, a single structured model call is made over the top
//! candidates, and the answer is accepted only when every claim in it can
//! be re-found in the source text. Any failure degrades to a deterministic
//! heuristic result, so extraction itself never errors.

pub mod config;
pub mod engine;
pub mod prompt;
pub mod rank;
pub mod segment;
pub mod urls;
pub mod validate;

pub use config::EngineConfig;
pub use engine::{AvailabilityEngine, AvailabilityExtraction, ChatFn, Diagnostics, StatementResult};
pub use rank::{ContextSource, RankedContext};
pub use segment::{HeadingLabel, Paragraph};
