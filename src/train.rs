/* ------------------------------------------------------------------ */
/* Training loop, loss estimation, and the corpus → model pipeline   */
/* ------------------------------------------------------------------ */

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::TrainConfig;
use crate::corpus;
use crate::error::{BigramError, Result};
use crate::model::{GradientBuffer, TransitionModel};
use crate::ops::{cross_entropy_loss, softmax_fwd};
use crate::rng::Rng;
use crate::tokenizer::Tokenizer;
use crate::transitions::SuccessorMap;

// Pairs handed to rayon at once; bounds the scratch rows alive per step.
const PAR_CHUNK: usize = 256;

/* ------------------------------------------------------------------ */
/* Mean cross-entropy of the target labels                          */
/* ------------------------------------------------------------------ */
pub fn estimate_loss(model: &TransitionModel, successors: &SuccessorMap) -> f32 {
    let pairs: Vec<(usize, usize)> = successors.pairs().into_iter()
        .filter(|&(s, d)| model.contains(s) && model.contains(d))
        .collect();
    if pairs.is_empty() { return 0.0; }

    let total: f32 = pairs
        .par_iter()
        .map(|&(src, label)| {
            let mut probs = vec![0.0f32; model.vocab_size];
            softmax_fwd(model.row(src), &mut probs);
            cross_entropy_loss(&probs, label)
        })
        .sum();
    total / pairs.len() as f32
}

/* ------------------------------------------------------------------ */
/* Gradient descent on softmax / cross-entropy                       */
/* ------------------------------------------------------------------ */
//
// batch_size = None: one full-batch step per epoch, pairs in src order.
// batch_size = Some(n): pairs shuffled with `rng` each epoch, one step
// per n pairs.
//
// Per-pair gradients (softmax(row) − one_hot(label)) are computed in
// parallel; accumulation and the update run in pair order, so a run is
// bit-for-bit reproducible from the seed.
//
// Returns the mean loss of each epoch, measured before each step.
pub fn train(
    model: &mut TransitionModel,
    successors: &SuccessorMap,
    epochs: usize,
    batch_size: Option<usize>,
    rng: &mut Rng,
) -> Vec<f32> {
    let v = model.vocab_size;
    let mut pairs: Vec<(usize, usize)> = successors.pairs().into_iter()
        .filter(|&(s, d)| s < v && d < v)
        .collect();

    if v == 0 || pairs.is_empty() {
        debug!("train: nothing to do (vocab {}, pairs {})", v, pairs.len());
        return Vec::new();
    }

    let batch = batch_size.unwrap_or(pairs.len()).max(1);
    info!(
        "Training: {} epochs, {} pairs, batch {}, lr {}, {} params",
        epochs, pairs.len(), batch, model.learning_rate, model.param_count()
    );

    let mut grads = GradientBuffer::new(v);
    let mut epoch_losses = Vec::with_capacity(epochs);

    for epoch in 0..epochs {
        if batch_size.is_some() {
            rng.shuffle(&mut pairs);
        }

        let mut epoch_loss = 0.0f32;
        for (step, batch_pairs) in pairs.chunks(batch).enumerate() {
            grads.zero();
            let mut batch_loss = 0.0f32;

            for chunk in batch_pairs.chunks(PAR_CHUNK) {
                let model_ref = &*model;
                let results: Vec<(usize, Vec<f32>, f32)> = chunk
                    .par_iter()
                    .map(|&(src, label)| {
                        let mut d_row = vec![0.0f32; v];
                        softmax_fwd(model_ref.row(src), &mut d_row);
                        let loss = cross_entropy_loss(&d_row, label);
                        d_row[label] -= 1.0;
                        (src, d_row, loss)
                    })
                    .collect();

                for (src, d_row, loss) in results {
                    grads.accumulate(src, &d_row);
                    batch_loss += loss;
                }
            }

            model.apply_gradients(&grads);
            epoch_loss += batch_loss;
            debug!("epoch {} step {} | loss {:.4}", epoch, step, batch_loss / batch_pairs.len() as f32);
        }

        let mean = epoch_loss / pairs.len() as f32;
        info!("Epoch {:3} | Loss: {:.4}", epoch, mean);
        epoch_losses.push(mean);
    }

    epoch_losses
}

/* ------------------------------------------------------------------ */
/* Corpus → trained model                                             */
/* ------------------------------------------------------------------ */
//
// 1. ingest the training split
// 2. optionally reorder the vocabulary
// 3. build target labels
// 4. ingest the held-out split (vocabulary + reward counts only)
// 5. optionally drop the frequency table
// 6. create and train a model sized to the final vocabulary
pub fn build_and_train<S: AsRef<str>>(
    texts: &[S],
    cfg: &TrainConfig,
    rng: &mut Rng,
) -> Result<(Tokenizer, TransitionModel)> {
    let texts: Vec<&str> = texts.iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect();
    if texts.is_empty() {
        return Err(BigramError::EmptyCorpus);
    }

    let (train_texts, held_out) = corpus::split(&texts, cfg.train_fraction);
    info!("Using {} texts for labels and {} held out", train_texts.len(), held_out.len());

    let mut tokenizer = Tokenizer::new();
    tokenizer.ingest_all(train_texts.iter().copied());

    if cfg.reorder {
        info!("Reordering {} tokens by relation...", tokenizer.count());
        tokenizer.reorder_by_relation();
    }

    tokenizer.build_successors();
    info!("Built {} target labels from {} transitions", tokenizer.successors().len(), tokenizer.transitions().total());

    tokenizer.ingest_all(held_out.iter().copied());
    if !cfg.retain_frequencies {
        tokenizer.discard_frequencies();
        info!("Discarded frequency table; co-occurrence reward disabled");
    }

    info!("Vocabulary size: {}", tokenizer.count());
    debug!("Sample tokens: {:?}", tokenizer.sample_tokens(10));

    let mut model = TransitionModel::new(tokenizer.count(), cfg.learning_rate, rng);

    let initial_loss = estimate_loss(&model, tokenizer.successors());
    train(&mut model, tokenizer.successors(), cfg.epochs, cfg.batch_size, rng);
    let final_loss = estimate_loss(&model, tokenizer.successors());
    info!("Loss: {:.4} → {:.4}", initial_loss, final_loss);

    Ok((tokenizer, model))
}
