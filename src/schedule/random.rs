use rand::rngs::StdRng;
use rand::Rng;

const LCG_MULTIPLIER: u64 = 9301;
const LCG_INCREMENT: u64 = 49297;
const LCG_MODULUS: u64 = 233280;

/// Source of uniform draws in `[0, 1)` used by the planner's shuffle
pub trait UnitRandom {
    fn next_unit(&mut self) -> f64;
}

/// Linear congruential generator: `seed = (seed * 9301 + 49297) mod 233280`.
///
/// Not cryptographic. Same seed gives the same shuffle, which is all the
/// planner needs.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        // The recurrence is modular, so reducing the seed first yields the same sequence.
        Self {
            state: seed % LCG_MODULUS,
        }
    }
}

impl UnitRandom for Lcg {
    fn next_unit(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state as f64 / LCG_MODULUS as f64
    }
}

impl UnitRandom for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Milliseconds since the epoch, used when the caller does not pin a seed
pub fn time_seed() -> u64 {
    chrono::Utc::now().timestamp_millis().unsigned_abs()
}

/// Fisher-Yates shuffle walking from the last index down, one draw per position
pub fn shuffle<T, R: UnitRandom + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = ((rng.next_unit() * (i + 1) as f64).floor() as usize).min(i);
        items.swap(i, j);
    }
}
