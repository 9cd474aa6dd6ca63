//! Prompt template for the fine-tuned causal decoder.
//!
//! The model was trained on a plain two-section layout rather than a chat
//! template: the paragraph, then an empty `Targets` section it completes.

/// Header opening the paragraph section.
pub const PARAGRAPH_HEADER: &str = "### Paragraph:\n";

/// Header opening the completion section.
pub const TARGETS_HEADER: &str = "\n\n### Targets:\n";

/// Builder for extraction prompts.
#[derive(Debug, Clone)]
pub struct CausalPromptBuilder {
    paragraph_header: String,
    targets_header: String,
}

impl Default for CausalPromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CausalPromptBuilder {
    /// Create a builder with the training-time headers.
    pub fn new() -> Self {
        Self {
            paragraph_header: PARAGRAPH_HEADER.to_string(),
            targets_header: TARGETS_HEADER.to_string(),
        }
    }

    /// Override both headers (for models trained on a different layout).
    pub fn with_headers(
        mut self,
        paragraph_header: impl Into<String>,
        targets_header: impl Into<String>,
    ) -> Self {
        self.paragraph_header = paragraph_header.into();
        self.targets_header = targets_header.into();
        self
    }

    /// Wrap a paragraph. The paragraph is inserted verbatim.
    pub fn build_extraction_prompt(&self, paragraph: &str) -> String {
        let mut prompt = String::with_capacity(
            self.paragraph_header.len() + paragraph.len() + self.targets_header.len(),
        );
        prompt.push_str(&self.paragraph_header);
        prompt.push_str(paragraph);
        prompt.push_str(&self.targets_header);
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_extraction_prompt() {
        let builder = CausalPromptBuilder::new();
        let prompt = builder.build_extraction_prompt("Rain causes floods.");

        assert_eq!(
            prompt,
            "### Paragraph:\nRain causes floods.\n\n### Targets:\n"
        );
    }

    #[test]
    fn test_paragraph_kept_verbatim() {
        let builder = CausalPromptBuilder::new();
        let paragraph = "  leading space\nand ### Targets: inside  ";
        let prompt = builder.build_extraction_prompt(paragraph);

        let inner = &prompt[PARAGRAPH_HEADER.len()..prompt.len() - TARGETS_HEADER.len()];
        assert_eq!(inner, paragraph);
    }

    #[test]
    fn test_distinct_paragraphs_give_distinct_prompts() {
        let builder = CausalPromptBuilder::new();
        assert_ne!(
            builder.build_extraction_prompt("a"),
            builder.build_extraction_prompt("a ")
        );
    }

    #[test]
    fn test_custom_headers() {
        let builder = CausalPromptBuilder::new().with_headers("P: ", " T:");
        assert_eq!(builder.build_extraction_prompt("x"), "P: x T:");
    }
}
