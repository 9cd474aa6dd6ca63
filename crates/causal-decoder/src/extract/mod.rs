//! Paragraph to relationship pipeline.
//!
//! ```text
//! paragraph -> prompt -> TextGenerator -> sanitize (optional) -> parse
//! ```

mod parser;
mod sanitizer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DecoderResult;
use crate::llm::{CausalPromptBuilder, GenerationParams, TextGenerator};
use crate::types::Extraction;

pub use parser::parse_relationships;
pub use sanitizer::sanitize;

/// One extraction job: a paragraph and the knobs to decode it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub paragraph: String,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(paragraph: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            paragraph: paragraph.into(),
            params,
        }
    }
}

/// Runs the extraction pipeline against an injected generator.
pub struct RelationshipExtractor {
    generator: Arc<dyn TextGenerator>,
    prompt_builder: CausalPromptBuilder,
}

impl RelationshipExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            prompt_builder: CausalPromptBuilder::new(),
        }
    }

    pub fn with_prompt_builder(mut self, prompt_builder: CausalPromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    /// Extract relationships from one paragraph.
    ///
    /// Parameters are validated before the generator runs. Unparseable model
    /// output yields an empty relationship list, not an error.
    pub fn extract(&self, request: &GenerationRequest) -> DecoderResult<Extraction> {
        request.params.validate()?;

        let prompt = self.prompt_builder.build_extraction_prompt(&request.paragraph);

        info!(
            generator = self.generator.name(),
            strategy = %request.params.strategy,
            max_new_tokens = request.params.max_new_tokens,
            paragraph_len = request.paragraph.len(),
            "Extracting causal relationships"
        );

        let raw = self.generator.generate(&prompt, &request.params)?;
        let raw = raw.trim().to_string();

        let cleaned = if request.params.clean_output {
            sanitize(&raw)
        } else {
            raw.clone()
        };

        let relationships = parse_relationships(&cleaned);

        debug!(
            raw_len = raw.len(),
            cleaned_len = cleaned.len(),
            relationships = relationships.len(),
            "Extraction complete"
        );

        Ok(Extraction {
            raw,
            cleaned,
            relationships,
        })
    }
}

impl std::fmt::Debug for RelationshipExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipExtractor")
            .field("generator", &self.generator.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Polarity, Relationship};
    use parking_lot::Mutex;

    struct FixedGenerator {
        output: String,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedGenerator {
        fn new(output: &str) -> Arc<Self> {
            Arc::new(Self {
                output: output.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl TextGenerator for FixedGenerator {
        fn generate(&self, prompt: &str, _params: &GenerationParams) -> DecoderResult<String> {
            self.prompts.lock().push(prompt.to_string());
            Ok(self.output.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_extract_end_to_end() {
        let generator = FixedGenerator::new(" Rain -> +Flood, Flood-> -Crops \n");
        let extractor = RelationshipExtractor::new(generator.clone());

        let request = GenerationRequest::new("It rained.", GenerationParams::default());
        let extraction = extractor.extract(&request).unwrap();

        assert_eq!(extraction.raw, "Rain -> +Flood, Flood-> -Crops");
        assert_eq!(
            extraction.relationships,
            vec![
                Relationship::new("Rain", Polarity::Positive, "Flood"),
                Relationship::new("Flood", Polarity::Negative, "Crops"),
            ]
        );
        assert_eq!(
            generator.prompts.lock().as_slice(),
            ["### Paragraph:\nIt rained.\n\n### Targets:\n"]
        );
    }

    #[test]
    fn test_clean_output_disabled_keeps_raw() {
        let generator = FixedGenerator::new("noise A -> +B");
        let extractor = RelationshipExtractor::new(generator);

        let params = GenerationParams::default().with_clean_output(false);
        let extraction = extractor
            .extract(&GenerationRequest::new("p", params))
            .unwrap();

        assert_eq!(extraction.raw, extraction.cleaned);
        assert_eq!(extraction.relationships[0].from, "noise A");
    }

    #[test]
    fn test_invalid_params_skip_generator() {
        let generator = FixedGenerator::new("A -> +B");
        let extractor = RelationshipExtractor::new(generator.clone());

        let params = GenerationParams::default().with_max_new_tokens(0);
        let err = extractor
            .extract(&GenerationRequest::new("p", params))
            .unwrap_err();

        assert!(err.is_config_error());
        assert!(generator.prompts.lock().is_empty());
    }
}
