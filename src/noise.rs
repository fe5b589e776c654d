pub const DEFAULT_SEED: i32 = 22222;

const MULTIPLIER: i32 = 196314165;
const INCREMENT: i32 = 907633515;

/// Linear congruential white noise, the one from Chamberlin's "Musical Applications of Microprocessors".
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    state: i32,
}

impl NoiseGenerator {
    pub fn new(seed: i32) -> Self {
        NoiseGenerator { state: seed }
    }

    pub fn state(&self) -> i32 {
        self.state
    }

    pub fn reseed(&mut self, seed: i32) {
        self.state = seed;
    }

    /// Next sample in `[-1, 1)`.
    #[inline]
    pub fn process(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        // top 24 bits so the f32 conversion is exact and never rounds up to 1.0
        (self.state >> 7) as f32 / 16_777_216.0
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.process();
        }
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}
