/* ------------------------------------------------------------------ */
/* Minimal xorshift PRNG                                             */
/* ------------------------------------------------------------------ */
//
// Every random decision in the crate (weight init, batch shuffling,
// seed-token picks, out-of-vocabulary fallback) draws from an Rng that
// the caller constructs and passes in. Same seed, same run.

pub struct Rng {
    pub state: u64,
}

impl Rng {
    // xorshift never leaves the all-zero state, so remap seed 0.
    pub fn new(seed: u64) -> Self {
        Self { state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed } }
    }

    /// Seed from the wall clock. Only for entry points that want variety
    /// (the HTTP server); training always takes an explicit seed.
    pub fn from_clock() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42);
        Self::new(seed)
    }

    pub fn next(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    pub fn uniform(&mut self) -> f64 {
        (self.next() >> 11) as f64 * (1.0 / 9007199254740992.0)
    }

    /// Uniform in [lo, hi).
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.uniform() as f32
    }

    pub fn choice(&mut self, n: usize) -> usize {
        if n == 0 { return 0; }
        ((self.uniform() * n as f64) as usize).min(n - 1)
    }

    // Fisher-Yates
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.choice(i + 1);
            items.swap(i, j);
        }
    }
}
