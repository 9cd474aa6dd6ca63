//! Configuration for the causal decoder.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DecoderError, DecoderResult};
use crate::llm::{DecodingStrategy, GenerationParams, InferencePrecision, LlmConfig, Preset};

/// Environment variable prefix. Nested keys use `__`, e.g.
/// `CAUSAL_DECODER__GENERATION__STRATEGY=beam`.
pub const ENV_PREFIX: &str = "CAUSAL_DECODER";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub model: ModelConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

impl DecoderConfig {
    /// Load configuration from files and environment.
    ///
    /// Sources, later ones winning:
    /// 1. `config/default.toml` if present
    /// 2. `path`, which must exist when given
    /// 3. Environment variables with the `CAUSAL_DECODER` prefix
    pub fn load(path: Option<&Path>) -> DecoderResult<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let builder =
            builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: DecoderConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing sections take their defaults.
    pub fn from_toml(content: &str) -> DecoderResult<Self> {
        let config: DecoderConfig = toml::from_str(content)
            .map_err(|e| DecoderError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> DecoderResult<()> {
        self.model.llm_config()?;
        self.generation.to_params()?;
        if self.logging.level.trim().is_empty() {
            return Err(DecoderError::ConfigError(
                "logging.level must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_id: String,
    pub model_dir: PathBuf,
    pub use_cuda: bool,
    /// One of `auto`, `f32`, `f16`, `bf16`.
    pub precision: String,
    pub eos_tokens: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let llm = LlmConfig::default();
        Self {
            model_id: llm.model_id,
            model_dir: llm.model_dir,
            use_cuda: llm.use_cuda,
            precision: "auto".to_string(),
            eos_tokens: llm.eos_tokens,
        }
    }
}

impl ModelConfig {
    pub fn llm_config(&self) -> DecoderResult<LlmConfig> {
        let precision: InferencePrecision = self.precision.parse()?;
        if self.eos_tokens.iter().any(|t| t.is_empty()) {
            return Err(DecoderError::invalid(
                "model.eos_tokens",
                "EOS tokens must not be empty strings",
            ));
        }
        Ok(LlmConfig {
            model_id: self.model_id.clone(),
            model_dir: self.model_dir.clone(),
            precision,
            use_cuda: self.use_cuda,
            eos_tokens: self.eos_tokens.clone(),
        })
    }
}

/// A preset plus optional per-field overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// `default` or `long-beam`.
    pub preset: String,
    pub strategy: Option<String>,
    pub max_new_tokens: Option<usize>,
    pub num_beams: Option<usize>,
    pub top_p: Option<f32>,
    pub temperature: Option<f32>,
    pub repetition_penalty: Option<f32>,
    pub clean_output: Option<bool>,
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            preset: Preset::Default.as_str().to_string(),
            strategy: None,
            max_new_tokens: None,
            num_beams: None,
            top_p: None,
            temperature: None,
            repetition_penalty: None,
            clean_output: None,
            seed: None,
        }
    }
}

impl GenerationConfig {
    /// Resolve the preset, apply overrides and validate the result.
    pub fn to_params(&self) -> DecoderResult<GenerationParams> {
        let preset: Preset = self.preset.parse()?;
        let mut params = preset.params();

        if let Some(strategy) = &self.strategy {
            params.strategy = strategy.parse::<DecodingStrategy>()?;
        }
        if let Some(v) = self.max_new_tokens {
            params.max_new_tokens = v;
        }
        if let Some(v) = self.num_beams {
            params.num_beams = v;
        }
        if let Some(v) = self.top_p {
            params.top_p = v;
        }
        if let Some(v) = self.temperature {
            params.temperature = v;
        }
        if let Some(v) = self.repetition_penalty {
            params.repetition_penalty = v;
        }
        if let Some(v) = self.clean_output {
            params.clean_output = v;
        }
        if self.seed.is_some() {
            params.seed = self.seed;
        }

        params.validate()?;
        Ok(params)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `CAUSAL_DECODER_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DecoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generation.to_params().unwrap(), GenerationParams::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_overrides_layer_on_preset() {
        let config = DecoderConfig::from_toml(
            r#"
            [generation]
            preset = "long-beam"
            num_beams = 5
            clean_output = false
            "#,
        )
        .unwrap();

        let params = config.generation.to_params().unwrap();
        assert_eq!(params.strategy, DecodingStrategy::Beam);
        assert_eq!(params.max_new_tokens, 1024);
        assert_eq!(params.num_beams, 5);
        assert!(!params.clean_output);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = DecoderConfig::from_toml("[generation]\nstrategy = \"topk\"\n").unwrap_err();
        assert!(matches!(err, DecoderError::InvalidStrategy { ref value } if value == "topk"));
    }

    #[test]
    fn test_bad_precision_rejected() {
        let err = DecoderConfig::from_toml("[model]\nprecision = \"int4\"\n").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_malformed_toml() {
        let err = DecoderConfig::from_toml("[generation\n").unwrap_err();
        assert!(matches!(err, DecoderError::ConfigError(_)));
    }
}
