//! Local causal decoder for relationship extraction.
//!
//! Runs a fine-tuned Qwen2.5 checkpoint through Candle. The model reads a
//! paragraph in the `### Paragraph:` / `### Targets:` layout and continues
//! it with relationship lines such as `Rain -> +Flooding`.
//!
//! # Model directory
//!
//! ```text
//! config.json
//! tokenizer.json
//! model.safetensors            (or sharded files + model.safetensors.index.json)
//! ```
//!
//! Generation is synchronous and serialized: one extraction holds the model
//! lock for its whole decode.

pub mod decoding;
pub mod params;
mod prompt;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::qwen2::{Config as Qwen2Config, ModelForCausalLM};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::error::{DecoderError, DecoderResult};

pub use decoding::{apply_repetition_penalty, decode, LogitsSource};
pub use params::{DecodingStrategy, GenerationParams, Preset};
pub use prompt::{CausalPromptBuilder, PARAGRAPH_HEADER, TARGETS_HEADER};

/// Qwen2.5 end-of-text ids, used when none of the configured EOS strings
/// resolve in the tokenizer vocabulary.
const FALLBACK_EOS_IDS: [u32; 2] = [
    151643, // <|endoftext|>
    151645, // <|im_end|>
];

/// Anything that turns a prompt into a decoded continuation.
///
/// The extractor only depends on this trait so that tests can run the full
/// pipeline without model weights.
pub trait TextGenerator: Send + Sync {
    /// Generate a continuation of `prompt`. The prompt itself is not part of
    /// the returned text.
    fn generate(&self, prompt: &str, params: &GenerationParams) -> DecoderResult<String>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

/// Weight precision used when loading the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferencePrecision {
    /// BF16 on CUDA, F32 on CPU.
    #[default]
    Auto,
    F32,
    F16,
    BF16,
}

impl InferencePrecision {
    /// Candle dtype for this precision on `device`.
    pub fn to_dtype(&self, device: &Device) -> DType {
        match self {
            InferencePrecision::Auto if device.is_cuda() => DType::BF16,
            InferencePrecision::Auto => DType::F32,
            InferencePrecision::F32 => DType::F32,
            InferencePrecision::F16 => DType::F16,
            InferencePrecision::BF16 => DType::BF16,
        }
    }
}

impl FromStr for InferencePrecision {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "f32" | "fp32" => Ok(Self::F32),
            "f16" | "fp16" => Ok(Self::F16),
            "bf16" => Ok(Self::BF16),
            other => Err(DecoderError::invalid(
                "precision",
                format!("unknown precision '{other}', expected auto, f32, f16 or bf16"),
            )),
        }
    }
}

/// Configuration for loading the causal decoder.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// HuggingFace model ID, informational.
    pub model_id: String,

    /// Local model directory.
    pub model_dir: PathBuf,

    pub precision: InferencePrecision,

    /// Use CUDA device 0 when available.
    pub use_cuda: bool,

    /// Tokens that end generation, looked up in the tokenizer vocabulary.
    pub eos_tokens: Vec<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_id: "dorito96/qwen2.5-1.5b_causal".to_string(),
            model_dir: PathBuf::from("models/qwen2.5-1.5b_causal"),
            precision: InferencePrecision::Auto,
            use_cuda: true,
            eos_tokens: vec!["<|endoftext|>".to_string(), "<|im_end|>".to_string()],
        }
    }
}

enum LlmState {
    Unloaded,
    Loaded {
        model: ModelForCausalLM,
        tokenizer: Tokenizer,
        device: Device,
        eos_ids: Vec<u32>,
    },
}

/// The fine-tuned causal decoder.
pub struct CausalLm {
    config: LlmConfig,
    state: Mutex<LlmState>,
}

impl CausalLm {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LlmState::Unloaded),
        }
    }

    /// Create with a specific model directory and default settings.
    pub fn with_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        Self::new(LlmConfig {
            model_dir: model_dir.into(),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.lock(), LlmState::Loaded { .. })
    }

    /// Load tokenizer and weights. A second call is a no-op.
    pub fn load(&self) -> DecoderResult<()> {
        let mut state = self.state.lock();
        if matches!(*state, LlmState::Loaded { .. }) {
            warn!("Causal decoder already loaded, skipping");
            return Ok(());
        }

        info!(
            model_id = %self.config.model_id,
            model_dir = %self.config.model_dir.display(),
            precision = ?self.config.precision,
            use_cuda = self.config.use_cuda,
            "Loading causal decoder"
        );

        let device = select_device(self.config.use_cuda);
        let dtype = self.config.precision.to_dtype(&device);

        let config_path = self.config.model_dir.join("config.json");
        let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
            DecoderError::ModelNotFound {
                path: format!("{}: {}", config_path.display(), e),
            }
        })?;
        let model_config: Qwen2Config =
            serde_json::from_str(&config_str).map_err(|e| DecoderError::ModelLoadError {
                message: format!("Failed to parse config.json: {}", e),
            })?;

        debug!(
            hidden_size = model_config.hidden_size,
            num_layers = model_config.num_hidden_layers,
            vocab_size = model_config.vocab_size,
            "Loaded model configuration"
        );

        let tokenizer_path = self.config.model_dir.join("tokenizer.json");
        if !tokenizer_path.exists() {
            return Err(DecoderError::ModelNotFound {
                path: tokenizer_path.display().to_string(),
            });
        }
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| DecoderError::ModelLoadError {
                message: format!("Failed to load tokenizer: {}", e),
            })?;

        let eos_ids = resolve_eos_ids(&tokenizer, &self.config.eos_tokens);

        let safetensor_files = find_safetensor_files(&self.config.model_dir)?;
        info!(
            file_count = safetensor_files.len(),
            dtype = ?dtype,
            "Loading model weights from safetensors"
        );

        // SAFETY: the weight files are memory-mapped read-only and must not be
        // modified while the model is alive.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&safetensor_files, dtype, &device).map_err(
                |e| DecoderError::ModelLoadError {
                    message: format!("Failed to load safetensors: {}", e),
                },
            )?
        };

        let model =
            ModelForCausalLM::new(&model_config, vb).map_err(|e| DecoderError::ModelLoadError {
                message: format!("Failed to create model: {}", e),
            })?;

        *state = LlmState::Loaded {
            model,
            tokenizer,
            device: device.clone(),
            eos_ids,
        };

        info!(device = ?device, "Causal decoder loaded");
        Ok(())
    }

    /// Drop the model and free its memory.
    pub fn unload(&self) {
        let mut state = self.state.lock();
        if matches!(*state, LlmState::Loaded { .. }) {
            info!("Unloading causal decoder");
            *state = LlmState::Unloaded;
        }
    }
}

impl TextGenerator for CausalLm {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> DecoderResult<String> {
        let mut state = self.state.lock();

        let LlmState::Loaded {
            ref mut model,
            ref tokenizer,
            ref device,
            ref eos_ids,
        } = *state
        else {
            return Err(DecoderError::ModelNotLoaded);
        };

        let encoding = tokenizer
            .encode(prompt, true)
            .map_err(|e| DecoderError::inference(format!("Tokenization failed: {}", e)))?;
        let prompt_ids = encoding.get_ids().to_vec();

        let mut session = QwenSession::new(model, device);
        let generated = decode(&mut session, &prompt_ids, eos_ids, params)?;
        // Leave no stale cache behind for the next request.
        session.reset();

        let output = tokenizer
            .decode(&generated, true)
            .map_err(|e| DecoderError::inference(format!("Decoding failed: {}", e)))?;

        debug!(
            prompt_tokens = prompt_ids.len(),
            generated_tokens = generated.len(),
            output_len = output.len(),
            "Generation complete"
        );

        Ok(output.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.config.model_id
    }
}

impl fmt::Debug for CausalLm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CausalLm")
            .field("model_id", &self.config.model_id)
            .field("model_dir", &self.config.model_dir)
            .field("loaded", &self.is_loaded())
            .field("precision", &self.config.precision)
            .finish()
    }
}

/// KV-cached forward passes over one model.
///
/// When the requested context extends the cached one only the new suffix is
/// fed; any other context (a different beam) resets the cache and replays
/// the whole sequence.
struct QwenSession<'a> {
    model: &'a mut ModelForCausalLM,
    device: &'a Device,
    cached: Vec<u32>,
}

impl<'a> QwenSession<'a> {
    fn new(model: &'a mut ModelForCausalLM, device: &'a Device) -> Self {
        model.clear_kv_cache();
        Self {
            model,
            device,
            cached: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.model.clear_kv_cache();
        self.cached.clear();
    }
}

impl LogitsSource for QwenSession<'_> {
    fn next_logits(&mut self, context: &[u32]) -> DecoderResult<Vec<f32>> {
        let extends_cache = !self.cached.is_empty()
            && context.len() > self.cached.len()
            && context.starts_with(&self.cached);

        let (fresh, offset) = if extends_cache {
            (&context[self.cached.len()..], self.cached.len())
        } else {
            self.reset();
            (context, 0)
        };

        if fresh.is_empty() {
            return Err(DecoderError::inference("Empty context for forward pass"));
        }

        let input = Tensor::new(fresh, self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| DecoderError::inference(format!("Failed to create input tensor: {}", e)))?;

        let logits = self
            .model
            .forward(&input, offset)
            .map_err(|e| DecoderError::inference(format!("Forward pass failed: {}", e)))?;

        self.cached.clear();
        self.cached.extend_from_slice(context);

        last_position_logits(&logits)
    }
}

/// Flatten model output to the logits of the final position.
///
/// The model may return `[batch, seq, vocab]` or `[batch, vocab]` depending
/// on whether it already sliced to the last position.
fn last_position_logits(logits: &Tensor) -> DecoderResult<Vec<f32>> {
    let to_inference = |e: candle_core::Error| {
        DecoderError::inference(format!("Failed to read logits: {}", e))
    };

    let logits = logits.squeeze(0).map_err(to_inference)?;
    let logits = match logits.dims().len() {
        1 => logits,
        2 => {
            let seq_len = logits.dim(0).map_err(to_inference)?;
            logits.get(seq_len - 1).map_err(to_inference)?
        }
        _ => {
            return Err(DecoderError::inference(format!(
                "Unexpected logits shape: {:?}",
                logits.dims()
            )))
        }
    };

    logits
        .to_dtype(DType::F32)
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(to_inference)
}

fn select_device(use_cuda: bool) -> Device {
    if !use_cuda {
        return Device::Cpu;
    }
    match Device::cuda_if_available(0) {
        Ok(dev) if dev.is_cuda() => {
            info!("CUDA device detected, using GPU acceleration");
            dev
        }
        Ok(_) => {
            warn!("CUDA requested but not available, using CPU");
            Device::Cpu
        }
        Err(e) => {
            warn!(error = %e, "Failed to initialize CUDA, using CPU");
            Device::Cpu
        }
    }
}

fn resolve_eos_ids(tokenizer: &Tokenizer, eos_tokens: &[String]) -> Vec<u32> {
    let ids: Vec<u32> = eos_tokens
        .iter()
        .filter_map(|t| tokenizer.token_to_id(t))
        .collect();
    if ids.is_empty() {
        warn!(
            configured = ?eos_tokens,
            "No EOS token found in vocabulary, using Qwen2.5 defaults"
        );
        FALLBACK_EOS_IDS.to_vec()
    } else {
        ids
    }
}

/// Weight files for a model directory: every shard named in
/// `model.safetensors.index.json`, or the single `model.safetensors`.
fn find_safetensor_files(model_dir: &Path) -> DecoderResult<Vec<PathBuf>> {
    let index_path = model_dir.join("model.safetensors.index.json");

    if index_path.exists() {
        let index_str = std::fs::read_to_string(&index_path).map_err(|e| {
            DecoderError::ModelNotFound {
                path: format!("{}: {}", index_path.display(), e),
            }
        })?;
        let index: serde_json::Value =
            serde_json::from_str(&index_str).map_err(|e| DecoderError::ModelLoadError {
                message: format!("Failed to parse index: {}", e),
            })?;

        let mut paths: Vec<PathBuf> = index
            .get("weight_map")
            .and_then(|v| v.as_object())
            .map(|weight_map| {
                weight_map
                    .values()
                    .filter_map(|f| f.as_str())
                    .map(|f| model_dir.join(f))
                    .collect()
            })
            .unwrap_or_default();
        paths.sort();
        paths.dedup();

        if paths.is_empty() {
            return Err(DecoderError::ModelNotFound {
                path: format!("No safetensor files listed in {}", index_path.display()),
            });
        }
        return Ok(paths);
    }

    let single_path = model_dir.join("model.safetensors");
    if single_path.exists() {
        Ok(vec![single_path])
    } else {
        Err(DecoderError::ModelNotFound {
            path: format!("No safetensor files found in {}", model_dir.display()),
        })
    }
}
