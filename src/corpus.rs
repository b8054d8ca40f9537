/* ------------------------------------------------------------------ */
/* Corpus loading and train/held-out split                           */
/* ------------------------------------------------------------------ */

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{BigramError, Result};

/// One text per line; blank lines are skipped and surrounding
/// whitespace trimmed.
pub fn load_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut texts = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            texts.push(line.to_string());
        }
    }

    if texts.is_empty() {
        return Err(BigramError::EmptyCorpus);
    }
    Ok(texts)
}

/// First `ceil(len * fraction)` items train, the rest are held out.
pub fn split<T>(texts: &[T], fraction: f64) -> (&[T], &[T]) {
    let n = ((texts.len() as f64) * fraction).ceil() as usize;
    texts.split_at(n.min(texts.len()))
}
