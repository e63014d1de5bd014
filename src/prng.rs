//! PCG32 pseudorandom number generator (PCG-XSH-RR).
//!
//! One stream per run feeds both navmesh sampling and orientation
//! draws, so a fixed seed and scene reproduce the same viewpoints.

use std::f64::consts::TAU;

const MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// Stream selector for the viewpoint run.
pub const VIEWPOINT_STREAM: u64 = 54;

#[derive(Debug, Clone)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    pub fn new(seed: u64, seq: u64) -> Self {
        let inc = (seq << 1) | 1;
        let mut rng = Pcg32 { state: 0, inc };
        rng.advance();
        rng.state = rng.state.wrapping_add(seed);
        rng.advance();
        rng
    }

    /// Stream used for a generation run with the given seed.
    pub fn for_run(seed: u64) -> Self {
        Self::new(seed, VIEWPOINT_STREAM)
    }

    fn advance(&mut self) {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(self.inc);
    }

    pub fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.advance();
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        (xorshifted >> rot) | (xorshifted << (rot.wrapping_neg() & 31))
    }

    /// Uniform in [0, 1).
    pub fn next_float(&mut self) -> f64 {
        self.next_u32() as f64 / (u32::MAX as f64 + 1.0)
    }

    /// Uniform in [lo, hi).
    pub fn next_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_float() * (hi - lo)
    }

    /// Uniform angle in [0, 2π).
    pub fn next_angle(&mut self) -> f64 {
        self.next_float() * TAU
    }
}
