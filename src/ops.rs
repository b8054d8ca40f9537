/* ------------------------------------------------------------------ */
/* Math primitives: softmax, loss, greedy selection                  */
/* ------------------------------------------------------------------ */

// Softmax over one weight row. Subtracts the row max before exp; a row
// with non-finite entries or a sum that is not positive and finite falls
// back to the uniform distribution so callers always get weights that
// sum to 1.
pub fn softmax_fwd(logits: &[f32], probs: &mut [f32]) {
    let n = logits.len();
    if n == 0 { return; }

    if logits.iter().any(|v| !v.is_finite()) {
        probs[..n].fill(1.0 / n as f32);
        return;
    }

    let mx = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for i in 0..n {
        probs[i] = (logits[i] - mx).exp();
        sum += probs[i];
    }
    if !(sum.is_finite() && sum > 0.0) {
        probs[..n].fill(1.0 / n as f32);
        return;
    }
    let inv = 1.0 / sum;
    for p in probs[..n].iter_mut() { *p *= inv; }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let mut probs = vec![0.0f32; logits.len()];
    softmax_fwd(logits, &mut probs);
    probs
}

pub fn cross_entropy_loss(probs: &[f32], target: usize) -> f32 {
    -probs[target].max(1e-10).ln()
}

// First index of the maximum; strict comparison keeps the lowest index
// on ties. NaN entries never win.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = i;
        }
    }
    best
}
