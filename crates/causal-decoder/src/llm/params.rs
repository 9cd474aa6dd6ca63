//! Decoding parameters and named presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DecoderError, DecoderResult};

/// Token-selection algorithm used during generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodingStrategy {
    /// Deterministic argmax at every step.
    #[default]
    Greedy,
    /// Deterministic beam search with `num_beams` live hypotheses.
    Beam,
    /// Nucleus sampling with temperature scaling.
    Sample,
}

impl DecodingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Beam => "beam",
            Self::Sample => "sample",
        }
    }
}

impl fmt::Display for DecodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecodingStrategy {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy" => Ok(Self::Greedy),
            "beam" => Ok(Self::Beam),
            "sample" => Ok(Self::Sample),
            other => Err(DecoderError::InvalidStrategy {
                value: other.to_string(),
            }),
        }
    }
}

/// Full set of generation knobs for one extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub strategy: DecodingStrategy,

    /// Upper bound on newly generated tokens.
    pub max_new_tokens: usize,

    /// Beam width. Only read by `Beam`.
    pub num_beams: usize,

    /// Nucleus threshold in (0, 1]. Only read by `Sample`.
    pub top_p: f32,

    /// Softmax temperature, > 0. Only read by `Sample`.
    pub temperature: f32,

    /// Repetition penalty, > 0. 1.0 disables it.
    pub repetition_penalty: f32,

    /// Run the output sanitizer before parsing.
    pub clean_output: bool,

    /// RNG seed for `Sample`. `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Preset::Default.params()
    }
}

impl GenerationParams {
    /// Check every value the selected strategy will read.
    pub fn validate(&self) -> DecoderResult<()> {
        if self.max_new_tokens == 0 {
            return Err(DecoderError::invalid(
                "max_new_tokens",
                "must be greater than 0",
            ));
        }
        if !(self.repetition_penalty > 0.0) || !self.repetition_penalty.is_finite() {
            return Err(DecoderError::invalid(
                "repetition_penalty",
                format!("must be a positive number, got {}", self.repetition_penalty),
            ));
        }
        match self.strategy {
            DecodingStrategy::Greedy => {}
            DecodingStrategy::Beam => {
                if self.num_beams == 0 {
                    return Err(DecoderError::invalid("num_beams", "must be at least 1"));
                }
            }
            DecodingStrategy::Sample => {
                if !(self.top_p > 0.0 && self.top_p <= 1.0) {
                    return Err(DecoderError::invalid(
                        "top_p",
                        format!("must be in (0, 1], got {}", self.top_p),
                    ));
                }
                if !(self.temperature > 0.0) || !self.temperature.is_finite() {
                    return Err(DecoderError::invalid(
                        "temperature",
                        format!("must be a positive number, got {}", self.temperature),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn with_strategy(mut self, strategy: DecodingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_clean_output(mut self, clean_output: bool) -> Self {
        self.clean_output = clean_output;
        self
    }
}

/// Named parameter bundles.
///
/// `Default` is the library default; `LongBeam` matches the settings the
/// command-line extractor has always shipped with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preset {
    #[default]
    Default,
    LongBeam,
}

impl Preset {
    pub fn params(&self) -> GenerationParams {
        match self {
            Preset::Default => GenerationParams {
                strategy: DecodingStrategy::Greedy,
                max_new_tokens: 128,
                num_beams: 4,
                top_p: 0.9,
                temperature: 0.7,
                repetition_penalty: 1.05,
                clean_output: true,
                seed: None,
            },
            Preset::LongBeam => GenerationParams {
                strategy: DecodingStrategy::Beam,
                max_new_tokens: 1024,
                num_beams: 3,
                top_p: 0.9,
                temperature: 1.0,
                repetition_penalty: 1.05,
                clean_output: true,
                seed: None,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::LongBeam => "long-beam",
        }
    }
}

impl FromStr for Preset {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Preset::Default),
            "long-beam" => Ok(Preset::LongBeam),
            other => Err(DecoderError::invalid(
                "preset",
                format!("unknown preset '{other}', expected default or long-beam"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = GenerationParams::default();
        assert_eq!(params.strategy, DecodingStrategy::Greedy);
        assert_eq!(params.max_new_tokens, 128);
        assert_eq!(params.num_beams, 4);
        assert!((params.top_p - 0.9).abs() < f32::EPSILON);
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
        assert!((params.repetition_penalty - 1.05).abs() < f32::EPSILON);
        assert!(params.clean_output);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_long_beam_preset() {
        let params = Preset::LongBeam.params();
        assert_eq!(params.strategy, DecodingStrategy::Beam);
        assert_eq!(params.max_new_tokens, 1024);
        assert_eq!(params.num_beams, 3);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("greedy".parse::<DecodingStrategy>().unwrap(), DecodingStrategy::Greedy);
        assert_eq!("beam".parse::<DecodingStrategy>().unwrap(), DecodingStrategy::Beam);
        assert_eq!("sample".parse::<DecodingStrategy>().unwrap(), DecodingStrategy::Sample);

        match "topk".parse::<DecodingStrategy>() {
            Err(DecoderError::InvalidStrategy { value }) => assert_eq!(value, "topk"),
            other => panic!("expected InvalidStrategy, got {:?}", other),
        }
        // Case matters: no silent normalization.
        assert!("Greedy".parse::<DecodingStrategy>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_tokens = GenerationParams::default().with_max_new_tokens(0);
        assert!(zero_tokens.validate().is_err());

        let mut no_beams = Preset::LongBeam.params();
        no_beams.num_beams = 0;
        assert!(no_beams.validate().is_err());

        let mut bad_top_p = GenerationParams::default().with_strategy(DecodingStrategy::Sample);
        bad_top_p.top_p = 1.5;
        assert!(bad_top_p.validate().is_err());

        let mut cold = GenerationParams::default().with_strategy(DecodingStrategy::Sample);
        cold.temperature = 0.0;
        assert!(cold.validate().is_err());

        let mut nan_penalty = GenerationParams::default();
        nan_penalty.repetition_penalty = f32::NAN;
        assert!(nan_penalty.validate().is_err());
    }

    #[test]
    fn test_sampling_knobs_ignored_by_greedy() {
        let mut params = GenerationParams::default();
        params.temperature = 0.0;
        params.top_p = 0.0;
        params.num_beams = 0;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("default".parse::<Preset>().unwrap(), Preset::Default);
        assert_eq!("long-beam".parse::<Preset>().unwrap(), Preset::LongBeam);
        assert!("fast".parse::<Preset>().is_err());
    }
}
