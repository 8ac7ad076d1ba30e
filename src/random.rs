// A single injectable source of randomness, used both for generating fresh
// buffers and for the mutator's choices. Seeding it explicitly is what makes
// a shrink run reproducible; the default constructor seeds from OS entropy.

use rand::{ChaChaRng, OsRng, Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: ChaChaRng,
}

impl RandomSource {
    pub fn from_entropy() -> RandomSource {
        let mut os = OsRng::new().expect("failed to acquire OS randomness");
        let seed: [u32; 8] = [
            os.next_u32(),
            os.next_u32(),
            os.next_u32(),
            os.next_u32(),
            os.next_u32(),
            os.next_u32(),
            os.next_u32(),
            os.next_u32(),
        ];
        RandomSource::from_seed(&seed)
    }

    pub fn from_seed(seed: &[u32]) -> RandomSource {
        RandomSource {
            rng: ChaChaRng::from_seed(seed),
        }
    }

    pub fn bytes(&mut self, n: usize) -> Vec<u8> {
        let mut result = vec![0u8; n];
        self.rng.fill_bytes(&mut result);
        result
    }

    pub fn byte(&mut self) -> u8 {
        self.rng.gen::<u8>()
    }

    /// Uniform integer in `[low, high]` inclusive.
    pub fn range_inclusive(&mut self, low: u64, high: u64) -> u64 {
        assert!(low <= high);
        if low == high {
            return low;
        }
        low + self.rng.gen_range(0, high - low + 1)
    }

    /// Uniform index in `[0, len)`.
    pub fn below(&mut self, len: usize) -> usize {
        assert!(len > 0);
        self.rng.gen_range(0, len)
    }

    pub fn coin_flip(&mut self) -> bool {
        self.rng.gen()
    }
}
