//! Causal relationship extraction with a local causal decoder.
//!
//! Prompts a fine-tuned Qwen2.5 model (via Candle) with a paragraph and parses
//! its continuation into `(from, polarity, to)` triples.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     RELATIONSHIP EXTRACTOR                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Prompt Builder → TextGenerator → Sanitizer → Relationship Parser │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **LLM Module**: `CausalLm` (Candle Qwen2), decoding strategies, presets
//! - **Extract Module**: sanitizer, parser and the `RelationshipExtractor`
//! - **Config Module**: layered TOML/environment configuration
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use causal_decoder::{CausalLm, GenerationRequest, Preset, RelationshipExtractor};
//!
//! let lm = CausalLm::with_model_dir("models/qwen2.5-1.5b_causal");
//! lm.load()?;
//! let extractor = RelationshipExtractor::new(Arc::new(lm));
//! let request = GenerationRequest::new("Heavy rain floods the valley.", Preset::Default.params());
//! for rel in extractor.extract(&request)?.relationships {
//!     println!("{rel}");
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod types;

// Re-exports
pub use config::{DecoderConfig, GenerationConfig, LoggingConfig, ModelConfig};
pub use error::{DecoderError, DecoderResult};
pub use extract::{parse_relationships, sanitize, GenerationRequest, RelationshipExtractor};
pub use llm::{
    CausalLm, CausalPromptBuilder, DecodingStrategy, GenerationParams, InferencePrecision,
    LlmConfig, LogitsSource, Preset, TextGenerator,
};
pub use types::{Extraction, Polarity, Relationship};
