/* ------------------------------------------------------------------ */
/* Checkpoint save / load                                            */
/* ------------------------------------------------------------------ */
//
// File format (little-endian):
//   [0..8]   magic       b"BGRM0001"
//   [8]      precision   u8   (0 = f32, 1 = f16)
//   [9]      retained    u8   (1 if the frequency table was kept)
//   [10..14] count       u32  tokens in the vocabulary
//            tokens      count × (u32 byte_len, UTF-8 bytes), index order
//            n_rows      u32
//            rows        n_rows × (u32 src, u32 n, n × (u32 dst, u64 count))
//            n_labels    u32
//            labels      n_labels × (u32 src, u32 dst)
//            lr          f32
//            vocab_size  u32  model width V (≤ count)
//            weights     V² values, f32 or f16 per `precision`
//
// f16 halves the file; weights come back within f16 rounding error.
// Everything else round-trips exactly.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use half::f16;
use tracing::info;

use crate::config::Precision;
use crate::error::{BigramError, Result};
use crate::model::TransitionModel;
use crate::tokenizer::Tokenizer;
use crate::transitions::{SuccessorMap, TransitionTable};

const MAGIC: &[u8; 8] = b"BGRM0001";

// ── In-memory helpers ──────────────────────────────────────────────

fn write_u32(buf: &mut Vec<u8>, v: usize) {
    buf.extend_from_slice(&(v as u32).to_le_bytes());
}

fn write_weights(buf: &mut Vec<u8>, s: &[f32], precision: Precision) {
    match precision {
        Precision::F32 => {
            buf.reserve(s.len() * 4);
            for &v in s { buf.extend_from_slice(&v.to_le_bytes()); }
        }
        Precision::F16 => {
            buf.reserve(s.len() * 2);
            for &v in s { buf.extend_from_slice(&f16::from_f32(v).to_le_bytes()); }
        }
    }
}

/* Bounds-checked cursor; running off the end is a corrupt file. */
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n)
            .filter(|&e| e <= self.buf.len())
            .ok_or_else(|| BigramError::corrupt(format!("truncated at byte {}", self.pos)))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> { Ok(self.take(1)?[0]) }

    fn u32(&mut self) -> Result<usize> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(u64::from_le_bytes(a))
    }

    fn f32(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f32_slice(&mut self, n: usize, precision: Precision) -> Result<Vec<f32>> {
        let width = match precision { Precision::F32 => 4, Precision::F16 => 2 };
        let bytes = n.checked_mul(width)
            .ok_or_else(|| BigramError::corrupt("weight count overflows"))?;
        let raw = self.take(bytes)?;
        Ok(match precision {
            Precision::F32 => raw.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            Precision::F16 => raw.chunks_exact(2)
                .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
                .collect(),
        })
    }

    fn finished(&self) -> bool { self.pos == self.buf.len() }
}

// ── Public API ─────────────────────────────────────────────────────

/// Serialize tokenizer + model to an in-memory byte buffer.
/// No disk I/O; call flush_checkpoint() to write to disk.
pub fn serialize_checkpoint(
    tokenizer: &Tokenizer,
    model: &TransitionModel,
    precision: Precision,
) -> Vec<u8> {
    let width = match precision { Precision::F32 => 4, Precision::F16 => 2 };
    let mut buf: Vec<u8> = Vec::with_capacity(64 + model.weights.len() * width);

    // Header
    buf.extend_from_slice(MAGIC);
    buf.push(match precision { Precision::F32 => 0, Precision::F16 => 1 });
    buf.push(tokenizer.retains_frequencies() as u8);

    // Vocabulary
    let tokens = tokenizer.vocab().tokens();
    write_u32(&mut buf, tokens.len());
    for tok in tokens {
        write_u32(&mut buf, tok.len());
        buf.extend_from_slice(tok.as_bytes());
    }

    // Frequency table
    let table = tokenizer.transitions();
    write_u32(&mut buf, table.n_rows());
    for (src, row) in table.rows() {
        write_u32(&mut buf, src);
        write_u32(&mut buf, row.len());
        for (&dst, &count) in row {
            write_u32(&mut buf, dst);
            buf.extend_from_slice(&count.to_le_bytes());
        }
    }

    // Target labels
    let labels = tokenizer.successors().pairs();
    write_u32(&mut buf, labels.len());
    for (src, dst) in labels {
        write_u32(&mut buf, src);
        write_u32(&mut buf, dst);
    }

    // Weights
    buf.extend_from_slice(&model.learning_rate.to_le_bytes());
    write_u32(&mut buf, model.vocab_size);
    write_weights(&mut buf, &model.weights, precision);

    buf
}

/// Atomically flush a checkpoint buffer to disk (write to .tmp then rename).
pub fn flush_checkpoint(path: impl AsRef<Path>, buf: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    {
        let mut f = File::create(&tmp)?;
        f.write_all(buf)?;
        f.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn save_checkpoint(
    path: impl AsRef<Path>,
    tokenizer: &Tokenizer,
    model: &TransitionModel,
    precision: Precision,
) -> Result<()> {
    let buf = serialize_checkpoint(tokenizer, model, precision);
    flush_checkpoint(&path, &buf)?;
    info!("Saved {} ({} tokens, {:?}, {} bytes)", path.as_ref().display(), tokenizer.count(), precision, buf.len());
    Ok(())
}

pub fn deserialize_checkpoint(bytes: &[u8], origin: &str) -> Result<(Tokenizer, TransitionModel)> {
    let mut r = Reader { buf: bytes, pos: 0 };

    if r.take(MAGIC.len()).ok() != Some(&MAGIC[..]) {
        return Err(BigramError::BadMagic { path: origin.to_string() });
    }
    let precision = match r.u8()? {
        0 => Precision::F32,
        1 => Precision::F16,
        other => return Err(BigramError::UnsupportedPrecision(other)),
    };
    let retained = r.u8()? != 0;

    let count = r.u32()?;
    let mut tokens = Vec::with_capacity(count.min(bytes.len()));
    for _ in 0..count {
        let len = r.u32()?;
        let raw = r.take(len)?;
        let tok = std::str::from_utf8(raw)
            .map_err(|e| BigramError::corrupt(format!("token is not UTF-8: {}", e)))?;
        tokens.push(tok.to_string());
    }

    let mut table = TransitionTable::new();
    let n_rows = r.u32()?;
    for _ in 0..n_rows {
        let src = r.u32()?;
        let n = r.u32()?;
        for _ in 0..n {
            let dst = r.u32()?;
            let c = r.u64()?;
            table.add(src, dst, c);
        }
    }

    let n_labels = r.u32()?;
    let mut labels = Vec::with_capacity(n_labels.min(bytes.len()));
    for _ in 0..n_labels {
        labels.push((r.u32()?, r.u32()?));
    }

    let learning_rate = r.f32()?;
    let vocab_size = r.u32()?;
    if vocab_size > count {
        return Err(BigramError::corrupt(format!("model width {} exceeds {} tokens", vocab_size, count)));
    }
    let n_weights = vocab_size.checked_mul(vocab_size)
        .ok_or_else(|| BigramError::corrupt("model width overflows"))?;
    let weights = r.read_f32_slice(n_weights, precision)?;
    if !r.finished() {
        return Err(BigramError::corrupt(format!("{} trailing bytes", bytes.len() - r.pos)));
    }

    let tokenizer = Tokenizer::from_parts(tokens, table, SuccessorMap::from_pairs(labels), retained)?;
    let model = TransitionModel::from_weights(vocab_size, weights, learning_rate)
        .ok_or_else(|| BigramError::corrupt("weight matrix has the wrong size"))?;
    Ok((tokenizer, model))
}

/// Load a checkpoint written by save_checkpoint().
pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<(Tokenizer, TransitionModel)> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let (tokenizer, model) = deserialize_checkpoint(&bytes, &path.display().to_string())?;
    info!("Loaded {} ({} tokens, width {})", path.display(), tokenizer.count(), model.vocab_size);
    Ok((tokenizer, model))
}
