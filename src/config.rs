/* ------------------------------------------------------------------ */
/* Hyperparameters and run configuration                              */
/* ------------------------------------------------------------------ */
//
// Constants are the defaults. A run can override them with a JSON file
// (see configs/) and then with CLI flags, in that order:
//
//   bigramgpt train --corpus texts.txt --config configs/tiny.json --epochs 20
//
// Checkpoints carry their own vocabulary and weights, so a config file
// only matters when training or generating, never when loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BigramError, Result};

// ── Vocabulary ────────────────────────────────────────────────────────────

pub const END_TOKEN: &str = "[<EOT>]";

// ── Training ──────────────────────────────────────────────────────────────

pub const LEARNING_RATE:  f32   = 0.1;
pub const EPOCHS:         usize = 15;
pub const SEED:           u64   = 1337;
// Share of the corpus that supplies target labels; the rest only extends
// the vocabulary and the co-occurrence counts.
pub const TRAIN_FRACTION: f64   = 0.3;
pub const INIT_RANGE:     f32   = 0.5;   // weights start uniform in [-0.5, 0.5)

// ── Generation ────────────────────────────────────────────────────────────

pub const MAX_NEW_TOKENS:     usize = 50;
pub const REPETITION_PENALTY: f32   = 1.5;
pub const REWARD_BOOST:       f32   = 1.0;

// ── Keyword extraction ────────────────────────────────────────────────────

pub const MIN_KEYWORD_CHARS:  usize = 2;
pub const SPECIFICITY_WEIGHT: f32   = 5.0;

// ── Serving ───────────────────────────────────────────────────────────────

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// How the co-occurrence reward scales a successor's probability, given
/// `freq` = count of that successor and `total` = row total.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RewardPolicy {
    /// `p *= 1 + k * freq / total`; frequent successors gain the most.
    LinearBoost { k: f32 },
    /// `p *= total / freq`; rare successors gain the most.
    InverseCount,
    Disabled,
}

impl Default for RewardPolicy {
    fn default() -> Self { RewardPolicy::LinearBoost { k: REWARD_BOOST } }
}

/// Storage precision for weights in a checkpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    F32,
    F16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub learning_rate: f32,
    pub epochs: usize,
    /// `None` trains full-batch; `Some(n)` shuffles and steps every n pairs.
    pub batch_size: Option<usize>,
    pub seed: u64,
    pub reorder: bool,
    /// Keep the frequency table after the successor map is built. Costs
    /// memory, enables the co-occurrence reward and keyword specificity.
    pub retain_frequencies: bool,
    pub train_fraction: f64,
    pub precision: Precision,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate:      LEARNING_RATE,
            epochs:             EPOCHS,
            batch_size:         None,
            seed:               SEED,
            reorder:            true,
            retain_frequencies: true,
            train_fraction:     TRAIN_FRACTION,
            precision:          Precision::F32,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub max_new_tokens: usize,
    pub repetition_penalty: f32,
    pub reward: RewardPolicy,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            max_new_tokens:     MAX_NEW_TOKENS,
            repetition_penalty: REPETITION_PENALTY,
            reward:             RewardPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub train: TrainConfig,
    pub generate: GenerateConfig,
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let cfg: RunConfig = serde_json::from_str(&json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.train;
        if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
            return Err(BigramError::config(format!("learning_rate must be > 0, got {}", t.learning_rate)));
        }
        if t.batch_size == Some(0) {
            return Err(BigramError::config("batch_size must be at least 1"));
        }
        if !(t.train_fraction > 0.0 && t.train_fraction <= 1.0) {
            return Err(BigramError::config(format!("train_fraction must be in (0, 1], got {}", t.train_fraction)));
        }

        let g = &self.generate;
        if !(g.repetition_penalty.is_finite() && g.repetition_penalty > 1.0) {
            return Err(BigramError::config(format!("repetition_penalty must be > 1, got {}", g.repetition_penalty)));
        }
        if let RewardPolicy::LinearBoost { k } = g.reward {
            if !(k.is_finite() && k >= 0.0) {
                return Err(BigramError::config(format!("reward boost k must be >= 0, got {}", k)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{ "train": { "epochs": 3, "batch_size": 8 },
                 "generate": { "reward": { "policy": "inverse_count" } } }"#,
        ).unwrap();
        assert_eq!(cfg.train.epochs, 3);
        assert_eq!(cfg.train.batch_size, Some(8));
        assert_eq!(cfg.train.learning_rate, LEARNING_RATE);
        assert_eq!(cfg.generate.reward, RewardPolicy::InverseCount);
        assert_eq!(cfg.generate.max_new_tokens, MAX_NEW_TOKENS);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut cfg = RunConfig::default();
        cfg.generate.repetition_penalty = 1.0;
        assert!(matches!(cfg.validate(), Err(BigramError::InvalidConfig(_))));

        let mut cfg = RunConfig::default();
        cfg.train.batch_size = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.train.train_fraction = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.train.learning_rate = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{ "train": { "precision": "f16", "reorder": false } }"#).unwrap();
        let cfg = RunConfig::load(&path).unwrap();
        assert_eq!(cfg.train.precision, Precision::F16);
        assert!(!cfg.train.reorder);
    }

    #[test]
    fn test_bundled_presets_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs");
        for name in ["tiny.json", "small.json", "large.json"] {
            let cfg = RunConfig::load(dir.join(name)).unwrap();
            assert!(cfg.train.epochs > 0, "{}", name);
        }
        let small = RunConfig::load(dir.join("small.json")).unwrap();
        assert_eq!(small, RunConfig::default());
    }
}
