/// Deterministic sampling for held-out splits and evaluation batches.
///
/// Evaluation results must be reproducible bit-for-bit from their inputs, so
/// sampling runs on a fixed-seed generator and never consults an entropy
/// source. SplitMix64 is statistically adequate for shuffling and has no
/// state beyond one u64.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform draw in `[0, bound)`; `bound` must be non-zero.
    fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

/// Draw `k` distinct items (partial Fisher–Yates). Requesting more than the
/// population returns the whole population, shuffled.
pub fn sample<T: Copy>(items: &[T], k: usize, rng: &mut SplitMix64) -> Vec<T> {
    let mut pool: Vec<T> = items.to_vec();
    let k = k.min(pool.len());
    for i in 0..k {
        let j = i + rng.below(pool.len() - i);
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}
