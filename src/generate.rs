/* ------------------------------------------------------------------ */
/* Next-token prediction and the generation session loop             */
/* ------------------------------------------------------------------ */
//
// predict():
//   1. index outside [0, V) → uniformly random valid index
//   2. p = softmax(row[current])
//   3. co-occurrence reward from the frequency table (RewardPolicy)
//   4. repetition penalty: p /= penalty once per occurrence in history
//   5. renormalize when the sum is positive
//   6. greedy argmax, lowest index on ties
//
// generate() drives predict() from a seed token until END_TOKEN comes
// out or the token budget runs out. Both exits are always reachable, so
// the loop terminates for any model.

use tracing::debug;

use crate::config::{GenerateConfig, RewardPolicy};
use crate::ops::{argmax, softmax};
use crate::rng::Rng;
use crate::tokenizer::Tokenizer;
use crate::model::TransitionModel;

/// Result of one generation session.
#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
    pub tokens: Vec<usize>,
    pub text: String,
    pub hit_end: bool,
}

pub struct Generator<'a> {
    model: &'a TransitionModel,
    tokenizer: &'a Tokenizer,
    cfg: &'a GenerateConfig,
}

impl<'a> Generator<'a> {
    pub fn new(model: &'a TransitionModel, tokenizer: &'a Tokenizer, cfg: &'a GenerateConfig) -> Self {
        Self { model, tokenizer, cfg }
    }

    /// Adjusted distribution over successors of `current` (steps 2–5).
    /// Caller guarantees `current < V`.
    pub fn distribution(&self, current: usize, history: &[usize]) -> Vec<f32> {
        let v = self.model.vocab_size;
        let mut probs = softmax(self.model.row(current));

        if let Some(row) = self.tokenizer.transitions().row(current) {
            let total = self.tokenizer.transitions().row_total(current);
            if total > 0 {
                for (&next, &freq) in row {
                    if next >= v || freq == 0 { continue; }
                    let share = freq as f32 / total as f32;
                    match self.cfg.reward {
                        RewardPolicy::LinearBoost { k } => probs[next] *= 1.0 + k * share,
                        RewardPolicy::InverseCount      => probs[next] *= 1.0 / share,
                        RewardPolicy::Disabled          => {}
                    }
                }
            }
        }

        for &idx in history {
            if idx < v {
                probs[idx] /= self.cfg.repetition_penalty;
            }
        }

        let sum: f32 = probs.iter().sum();
        if sum > 0.0 {
            for p in probs.iter_mut() { *p /= sum; }
        }
        probs
    }

    pub fn predict(&self, current: usize, history: &[usize], rng: &mut Rng) -> usize {
        if !self.model.contains(current) {
            let fallback = rng.choice(self.model.vocab_size);
            debug!("predict: index {} out of range, falling back to {}", current, fallback);
            return fallback;
        }
        argmax(&self.distribution(current, history))
    }

    /// Emit `seed`, then predict until END_TOKEN or `max_new_tokens`
    /// more tokens. END_TOKEN itself is never part of the output.
    pub fn generate(&self, seed: usize, rng: &mut Rng) -> Generation {
        let eos = self.tokenizer.eos_id();
        let mut tokens = vec![seed];
        let mut current = seed;
        let mut hit_end = false;

        for _ in 0..self.cfg.max_new_tokens {
            let next = self.predict(current, &tokens, rng);
            if Some(next) == eos {
                hit_end = true;
                break;
            }
            tokens.push(next);
            current = next;
        }

        let text = self.tokenizer.decode(&tokens);
        Generation { tokens, text, hit_end }
    }
}

/// Index of `keyword` if the vocabulary knows it, else a uniformly
/// random token. Returns (index, keyword_used). `None` on an empty
/// vocabulary.
pub fn pick_seed(tokenizer: &Tokenizer, keyword: Option<&str>, rng: &mut Rng) -> Option<(usize, bool)> {
    if tokenizer.vocab().is_empty() { return None; }
    if let Some(idx) = keyword.and_then(|k| tokenizer.get_token_index(k)) {
        return Some((idx, true));
    }
    // END_TOKEN makes a useless seed; skip it when anything else exists.
    let eos = tokenizer.eos_id();
    let candidates: Vec<usize> = (0..tokenizer.count()).filter(|&i| Some(i) != eos).collect();
    if candidates.is_empty() {
        return Some((rng.choice(tokenizer.count()), false));
    }
    Some((candidates[rng.choice(candidates.len())], false))
}
