//! `extract` command
//!
//! Prints exactly one JSON object on stdout:
//!
//! ```text
//! {"success":true,"model":{"relationships":[{"from":"Rain","to":"Flood","polarity":"+"}]}}
//! {"success":false,"error":"No prompt given"}
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use causal_decoder::{
    CausalLm, DecoderConfig, DecoderResult, Extraction, GenerationParams, GenerationRequest,
    LlmConfig, Relationship, RelationshipExtractor,
};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::{error, info};

/// Message for a missing or blank paragraph.
pub const NO_PROMPT: &str = "No prompt given";

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Greedy,
    Beam,
    Sample,
}

impl StrategyArg {
    fn as_str(&self) -> &'static str {
        match self {
            StrategyArg::Greedy => "greedy",
            StrategyArg::Beam => "beam",
            StrategyArg::Sample => "sample",
        }
    }
}

/// Arguments for the extract command.
#[derive(Args, Debug, Default)]
pub struct ExtractArgs {
    /// Paragraph to analyze
    pub paragraph: Option<String>,

    /// Parameter preset (default, long-beam)
    #[arg(long)]
    pub preset: Option<String>,

    /// Decoding strategy, overrides the preset
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    #[arg(long)]
    pub max_new_tokens: Option<usize>,

    /// Beam width (beam only)
    #[arg(long)]
    pub num_beams: Option<usize>,

    /// Nucleus threshold (sample only)
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Sampling temperature (sample only)
    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub repetition_penalty: Option<f32>,

    /// RNG seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Parse raw model output without sanitizing it
    #[arg(long)]
    pub no_clean: bool,

    /// Local model directory
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Force CPU inference
    #[arg(long)]
    pub cpu: bool,

    /// Weight precision (auto, f32, f16, bf16)
    #[arg(long)]
    pub precision: Option<String>,

    /// Include raw and sanitized model output in the response
    #[arg(long)]
    pub show_raw: bool,
}

#[derive(Debug, Serialize)]
struct ModelOutput<'a> {
    relationships: &'a [Relationship],
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cleaned: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ExtractResponse<'a> {
    Success { success: bool, model: ModelOutput<'a> },
    Failure { success: bool, error: String },
}

impl<'a> ExtractResponse<'a> {
    fn success(extraction: &'a Extraction, show_raw: bool) -> Self {
        Self::Success {
            success: true,
            model: ModelOutput {
                relationships: &extraction.relationships,
                raw: show_raw.then_some(extraction.raw.as_str()),
                cleaned: show_raw.then_some(extraction.cleaned.as_str()),
            },
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }

    fn print(&self) {
        match serde_json::to_string(self) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: failed to serialize response: {}", e),
        }
    }
}

/// The paragraph exactly as given, or `None` when missing or blank.
pub fn paragraph_arg(args: &ExtractArgs) -> Option<&str> {
    args.paragraph.as_deref().filter(|p| !p.trim().is_empty())
}

/// Handle the extract command.
pub fn handle_extract_command(args: ExtractArgs, config: DecoderResult<DecoderConfig>) -> i32 {
    let Some(paragraph) = paragraph_arg(&args) else {
        ExtractResponse::failure(NO_PROMPT).print();
        return 0;
    };

    match run_extract(&args, paragraph, config) {
        Ok(extraction) => {
            ExtractResponse::success(&extraction, args.show_raw).print();
            info!(
                relationships = extraction.relationships.len(),
                "Extraction finished"
            );
            0
        }
        Err(e) => {
            error!("Extraction failed: {:#}", e);
            ExtractResponse::failure(format!("{:#}", e)).print();
            1
        }
    }
}

fn run_extract(
    args: &ExtractArgs,
    paragraph: &str,
    config: DecoderResult<DecoderConfig>,
) -> Result<Extraction> {
    let config = config.context("Failed to load configuration")?;

    // Parameters are checked before the model is touched.
    let params = resolve_params(args, &config).context("Invalid generation parameters")?;
    let llm_config = resolve_llm_config(args, &config).context("Invalid model configuration")?;

    let lm = CausalLm::new(llm_config);
    lm.load().context("Failed to load model")?;

    let extractor = RelationshipExtractor::new(Arc::new(lm));
    let extraction = extractor.extract(&GenerationRequest::new(paragraph, params))?;
    Ok(extraction)
}

/// Layer command-line flags over the configured generation settings.
pub fn resolve_params(
    args: &ExtractArgs,
    config: &DecoderConfig,
) -> DecoderResult<GenerationParams> {
    let mut generation = config.generation.clone();

    if let Some(preset) = &args.preset {
        generation.preset = preset.clone();
    }
    if let Some(strategy) = args.strategy {
        generation.strategy = Some(strategy.as_str().to_string());
    }
    if args.max_new_tokens.is_some() {
        generation.max_new_tokens = args.max_new_tokens;
    }
    if args.num_beams.is_some() {
        generation.num_beams = args.num_beams;
    }
    if args.top_p.is_some() {
        generation.top_p = args.top_p;
    }
    if args.temperature.is_some() {
        generation.temperature = args.temperature;
    }
    if args.repetition_penalty.is_some() {
        generation.repetition_penalty = args.repetition_penalty;
    }
    if args.seed.is_some() {
        generation.seed = args.seed;
    }
    if args.no_clean {
        generation.clean_output = Some(false);
    }

    generation.to_params()
}

fn resolve_llm_config(args: &ExtractArgs, config: &DecoderConfig) -> DecoderResult<LlmConfig> {
    let mut model = config.model.clone();

    if let Some(dir) = &args.model_dir {
        model.model_dir = dir.clone();
    }
    if args.cpu {
        model.use_cuda = false;
    }
    if let Some(precision) = &args.precision {
        model.precision = precision.clone();
    }

    model.llm_config()
}
