//! Token selection: greedy, beam search and nucleus sampling.
//!
//! The strategies only need "logits for the next position given this
//! context", so they run against [`LogitsSource`] rather than the model.
//! The Candle session implements it; tests use scripted sources.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::error::DecoderResult;
use crate::llm::params::{DecodingStrategy, GenerationParams};

/// Anything that can score the next token for a full token context.
pub trait LogitsSource {
    /// Raw logits over the vocabulary for the position after `context`.
    ///
    /// `context` is always the prompt followed by the tokens generated so far
    /// on the hypothesis being extended.
    fn next_logits(&mut self, context: &[u32]) -> DecoderResult<Vec<f32>>;
}

/// Run the configured strategy and return the generated token ids.
///
/// The returned ids never include an end-of-sequence token and never exceed
/// `params.max_new_tokens`.
pub fn decode<S: LogitsSource + ?Sized>(
    source: &mut S,
    prompt_ids: &[u32],
    eos_ids: &[u32],
    params: &GenerationParams,
) -> DecoderResult<Vec<u32>> {
    let generated = match params.strategy {
        DecodingStrategy::Greedy => greedy(source, prompt_ids, eos_ids, params)?,
        DecodingStrategy::Sample => sample(source, prompt_ids, eos_ids, params)?,
        DecodingStrategy::Beam => beam(source, prompt_ids, eos_ids, params)?,
    };

    debug!(
        strategy = %params.strategy,
        prompt_tokens = prompt_ids.len(),
        generated_tokens = generated.len(),
        "Decoding complete"
    );
    Ok(generated)
}

/// Penalize every token already present in `context`.
///
/// Positive logits are divided by `penalty`, negative ones multiplied, so
/// a penalty above 1.0 always makes a seen token less likely. Each distinct
/// token is penalized once regardless of how often it occurs.
///
/// Greedy and sampling apply it to raw logits; beam search applies it to
/// log-probabilities, where every seen score is multiplied.
pub fn apply_repetition_penalty(logits: &mut [f32], context: &[u32], penalty: f32) {
    if (penalty - 1.0).abs() < f32::EPSILON {
        return;
    }
    let mut seen = vec![false; logits.len()];
    for &token_id in context {
        let idx = token_id as usize;
        if idx >= logits.len() || seen[idx] {
            continue;
        }
        seen[idx] = true;
        let score = logits[idx];
        logits[idx] = if score > 0.0 {
            score / penalty
        } else {
            score * penalty
        };
    }
}

fn greedy<S: LogitsSource + ?Sized>(
    source: &mut S,
    prompt_ids: &[u32],
    eos_ids: &[u32],
    params: &GenerationParams,
) -> DecoderResult<Vec<u32>> {
    let mut context = prompt_ids.to_vec();
    let mut generated = Vec::new();

    while generated.len() < params.max_new_tokens {
        let mut logits = source.next_logits(&context)?;
        apply_repetition_penalty(&mut logits, &context, params.repetition_penalty);

        let next_token = argmax(&logits);
        if eos_ids.contains(&next_token) {
            trace!(step = generated.len(), "EOS reached");
            break;
        }
        generated.push(next_token);
        context.push(next_token);
    }

    Ok(generated)
}

fn sample<S: LogitsSource + ?Sized>(
    source: &mut S,
    prompt_ids: &[u32],
    eos_ids: &[u32],
    params: &GenerationParams,
) -> DecoderResult<Vec<u32>> {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut context = prompt_ids.to_vec();
    let mut generated = Vec::new();

    while generated.len() < params.max_new_tokens {
        let mut logits = source.next_logits(&context)?;
        apply_repetition_penalty(&mut logits, &context, params.repetition_penalty);

        let next_token = sample_nucleus(&logits, params.temperature, params.top_p, &mut rng);
        if eos_ids.contains(&next_token) {
            trace!(step = generated.len(), "EOS reached");
            break;
        }
        generated.push(next_token);
        context.push(next_token);
    }

    Ok(generated)
}

/// Draw one token from the top-p nucleus of the tempered distribution.
///
/// The nucleus is the shortest prefix of the probability-sorted vocabulary
/// whose mass reaches `top_p`, and always holds at least one token.
fn sample_nucleus<R: Rng>(logits: &[f32], temperature: f32, top_p: f32, rng: &mut R) -> u32 {
    let tempered: Vec<f32> = logits.iter().map(|&l| l / temperature).collect();
    let probs = softmax(&tempered);

    let mut indexed_probs: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
    indexed_probs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut cumulative = 0.0;
    let mut nucleus: Vec<(usize, f32)> = Vec::new();
    for (idx, prob) in indexed_probs {
        cumulative += prob;
        nucleus.push((idx, prob));
        if cumulative >= top_p {
            break;
        }
    }

    let nucleus_mass: f32 = nucleus.iter().map(|(_, p)| p).sum();
    let draw: f32 = rng.gen::<f32>() * nucleus_mass;

    let mut cumulative = 0.0;
    for &(idx, prob) in &nucleus {
        cumulative += prob;
        if draw < cumulative {
            return idx as u32;
        }
    }

    // Rounding left the draw past the last bucket.
    nucleus.first().map(|(idx, _)| *idx as u32).unwrap_or(0)
}

#[derive(Debug, Clone)]
struct Beam {
    tokens: Vec<u32>,
    score: f32,
}

/// Finished hypotheses, capped at `capacity`, scored by mean log-probability.
struct Hypotheses {
    capacity: usize,
    finished: Vec<(Vec<u32>, f32)>,
}

impl Hypotheses {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            finished: Vec::with_capacity(capacity + 1),
        }
    }

    fn add(&mut self, tokens: Vec<u32>, normalized_score: f32) {
        self.finished.push((tokens, normalized_score));
        if self.finished.len() > self.capacity {
            if let Some(worst) = self.worst_index() {
                self.finished.swap_remove(worst);
            }
        }
    }

    fn is_full(&self) -> bool {
        self.finished.len() >= self.capacity
    }

    fn worst_index(&self) -> Option<usize> {
        self.finished
            .iter()
            .enumerate()
            .min_by(|a, b| a.1 .1.partial_cmp(&b.1 .1).unwrap_or(Ordering::Equal))
            .map(|(i, _)| i)
    }

    fn worst_score(&self) -> f32 {
        self.worst_index()
            .map(|i| self.finished[i].1)
            .unwrap_or(f32::NEG_INFINITY)
    }

    fn into_best(self) -> Option<Vec<u32>> {
        self.finished
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .map(|(tokens, _)| tokens)
    }
}

fn beam<S: LogitsSource + ?Sized>(
    source: &mut S,
    prompt_ids: &[u32],
    eos_ids: &[u32],
    params: &GenerationParams,
) -> DecoderResult<Vec<u32>> {
    let num_beams = params.num_beams.max(1);
    let mut beams = vec![Beam {
        tokens: Vec::new(),
        score: 0.0,
    }];
    let mut hypotheses = Hypotheses::new(num_beams);
    let mut context = Vec::with_capacity(prompt_ids.len() + params.max_new_tokens);

    for step in 0..params.max_new_tokens {
        let mut candidates: Vec<(usize, u32, f32)> = Vec::new();

        for (beam_idx, b) in beams.iter().enumerate() {
            context.clear();
            context.extend_from_slice(prompt_ids);
            context.extend_from_slice(&b.tokens);

            // Beam search penalizes log-probabilities, not raw logits.
            let logits = source.next_logits(&context)?;
            let mut log_probs = log_softmax(&logits);
            apply_repetition_penalty(&mut log_probs, &context, params.repetition_penalty);

            for (token, log_prob) in top_k(&log_probs, 2 * num_beams) {
                candidates.push((beam_idx, token, b.score + log_prob));
            }
        }

        candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));

        let mut next_beams: Vec<Beam> = Vec::with_capacity(num_beams);
        for (rank, &(beam_idx, token, score)) in candidates.iter().enumerate() {
            if eos_ids.contains(&token) {
                // Only top-ranked EOS candidates may close a hypothesis.
                if rank < num_beams {
                    let tokens = beams[beam_idx].tokens.clone();
                    let length = (tokens.len() + 1) as f32;
                    hypotheses.add(tokens, score / length);
                }
                continue;
            }
            let mut tokens = beams[beam_idx].tokens.clone();
            tokens.push(token);
            next_beams.push(Beam { tokens, score });
            if next_beams.len() == num_beams {
                break;
            }
        }

        if next_beams.is_empty() {
            trace!(step, "All beams finished");
            beams = next_beams;
            break;
        }
        beams = next_beams;

        if hypotheses.is_full() {
            let best_live = beams[0].score / beams[0].tokens.len() as f32;
            if best_live <= hypotheses.worst_score() {
                trace!(step, "No live beam can beat finished hypotheses");
                beams.clear();
                break;
            }
        }
    }

    // Budget exhausted: surviving beams compete with finished ones.
    for b in beams {
        let length = b.tokens.len().max(1) as f32;
        hypotheses.add(b.tokens, b.score / length);
    }

    Ok(hypotheses.into_best().unwrap_or_default())
}

fn argmax(values: &[f32]) -> u32 {
    let mut best_idx = 0usize;
    let mut best = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    best_idx as u32
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_logits: Vec<f32> = logits.iter().map(|x| (x - max_logit).exp()).collect();
    let sum_exp: f32 = exp_logits.iter().sum();
    exp_logits.iter().map(|x| x / sum_exp).collect()
}

fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let sum_exp: f32 = logits.iter().map(|x| (x - max_logit).exp()).sum();
    let log_norm = max_logit + sum_exp.ln();
    logits.iter().map(|x| x - log_norm).collect()
}

fn top_k(values: &[f32], k: usize) -> Vec<(u32, f32)> {
    let mut indexed: Vec<(u32, f32)> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as u32, v))
        .collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    indexed.truncate(k);
    indexed
}
