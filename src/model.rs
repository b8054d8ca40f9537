/* ------------------------------------------------------------------ */
/* Model structs: transition weights and gradient buffer             */
/* ------------------------------------------------------------------ */
//
// One dense row-major V×V matrix. Row i holds the unnormalized score of
// every possible successor of token i. V is fixed at construction; a
// vocabulary that grows afterwards needs a new model.

use crate::config::INIT_RANGE;
use crate::rng::Rng;

pub struct TransitionModel {
    pub weights:       Vec<f32>,  // [vocab_size × vocab_size]
    pub vocab_size:    usize,
    pub learning_rate: f32,
}

impl TransitionModel {
    pub fn new(vocab_size: usize, learning_rate: f32, rng: &mut Rng) -> Self {
        let weights = (0..vocab_size * vocab_size)
            .map(|_| rng.range(-INIT_RANGE, INIT_RANGE))
            .collect();
        Self { weights, vocab_size, learning_rate }
    }

    /// Wrap existing weights, e.g. from a checkpoint. `None` if the
    /// length is not vocab_size².
    pub fn from_weights(vocab_size: usize, weights: Vec<f32>, learning_rate: f32) -> Option<Self> {
        if weights.len() != vocab_size * vocab_size { return None; }
        Some(Self { weights, vocab_size, learning_rate })
    }

    #[inline(always)]
    pub fn row(&self, src: usize) -> &[f32] {
        &self.weights[src * self.vocab_size..(src + 1) * self.vocab_size]
    }

    #[inline(always)]
    pub fn row_mut(&mut self, src: usize) -> &mut [f32] {
        let v = self.vocab_size;
        &mut self.weights[src * v..(src + 1) * v]
    }

    pub fn contains(&self, idx: usize) -> bool { idx < self.vocab_size }

    pub fn param_count(&self) -> usize { self.weights.len() }

    /// Apply `row[src][j] -= lr * grad[src][j]` for every row the buffer
    /// touched since the last reset. Untouched rows have zero gradient.
    pub fn apply_gradients(&mut self, grads: &GradientBuffer) {
        let lr = self.learning_rate;
        for &src in grads.touched_rows() {
            let g = grads.row(src);
            let w = self.row_mut(src);
            for (wi, gi) in w.iter_mut().zip(g.iter()) {
                *wi -= lr * gi;
            }
        }
    }
}

/* Same-shaped accumulation buffer. Tracks touched rows so that resets
   and updates cost O(batch · V) instead of O(V²) per step. */
pub struct GradientBuffer {
    pub d_weights: Vec<f32>,
    vocab_size:    usize,
    touched:       Vec<usize>,
    is_touched:    Vec<bool>,
}

impl GradientBuffer {
    pub fn new(vocab_size: usize) -> Self {
        Self {
            d_weights:  vec![0.0; vocab_size * vocab_size],
            vocab_size,
            touched:    Vec::new(),
            is_touched: vec![false; vocab_size],
        }
    }

    pub fn accumulate(&mut self, src: usize, d_row: &[f32]) {
        if !self.is_touched[src] {
            self.is_touched[src] = true;
            self.touched.push(src);
        }
        let v = self.vocab_size;
        for (g, d) in self.d_weights[src * v..(src + 1) * v].iter_mut().zip(d_row.iter()) {
            *g += d;
        }
    }

    #[inline(always)]
    pub fn row(&self, src: usize) -> &[f32] {
        &self.d_weights[src * self.vocab_size..(src + 1) * self.vocab_size]
    }

    pub fn zero(&mut self) {
        let v = self.vocab_size;
        for &src in &self.touched {
            self.d_weights[src * v..(src + 1) * v].fill(0.0);
            self.is_touched[src] = false;
        }
        self.touched.clear();
    }

    pub fn touched_rows(&self) -> &[usize] { &self.touched }
}
