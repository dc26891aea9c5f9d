//! Deterministic per-individual random number streams.
//!
//! Reproducibility requires that the draws consumed by one individual's
//! update do not depend on how many draws any other individual consumed, so
//! every individual gets its own generator, seeded from the simulation base
//! seed, a stream name, and the individual's index. Two runs with the same
//! base seed and configuration therefore produce bit-identical draw
//! sequences regardless of the order in which individuals are updated.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};
use xxhash_rust::xxh3::xxh3_64;

/// The stream name used for natural-history draws.
pub const NATURAL_HISTORY_STREAM: &str = "natural_history";

/// Computes the seed for an individual's stream.
fn stream_seed(base_seed: u64, stream: &str, individual_index: u64) -> u64 {
    base_seed
        .wrapping_add(xxh3_64(stream.as_bytes()))
        .wrapping_add(individual_index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// The underlying generator with a count of words consumed. Every draw,
/// including those made through `rand_distr` samplers, funnels through
/// `next_u64`, so the count fully determines the stream position and a
/// restored stream can be fast-forwarded to it.
#[derive(Debug, Clone)]
struct CountingRng {
    inner: StdRng,
    draws: u64,
}

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand::rand_core::impls::fill_bytes_via_next(self, dest);
    }
}

/// A random number generator owned by (conceptually) a single individual.
///
/// All stochastic decisions in the disease engine are resolved through the
/// helpers on this type.
#[derive(Debug, Clone)]
pub struct IndividualRng {
    rng: CountingRng,
}

// A placeholder stream; deserialized individuals hold one of these (plus
// the persisted position) until `Individual::reseed` rebuilds the real one.
impl Default for IndividualRng {
    fn default() -> Self {
        IndividualRng::new(0, NATURAL_HISTORY_STREAM, 0)
    }
}

// Only the stream position is persisted. The generator itself is rebuilt
// from the seed on restore and fast-forwarded to the recorded position.
impl serde::Serialize for IndividualRng {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.rng.draws)
    }
}

impl<'de> serde::Deserialize<'de> for IndividualRng {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let draws = <u64 as serde::Deserialize>::deserialize(deserializer)?;
        let mut rng = IndividualRng::default();
        rng.rng.draws = draws;
        Ok(rng)
    }
}

impl IndividualRng {
    /// Creates the generator for `individual_index` on the given stream.
    #[must_use]
    pub fn new(base_seed: u64, stream: &str, individual_index: u64) -> Self {
        IndividualRng {
            rng: CountingRng {
                inner: StdRng::seed_from_u64(stream_seed(base_seed, stream, individual_index)),
                draws: 0,
            },
        }
    }

    /// The number of words consumed so far; persisted in checkpoints.
    #[must_use]
    pub fn draws(&self) -> u64 {
        self.rng.draws
    }

    /// Advances a fresh stream to a previously recorded position.
    pub fn fast_forward(&mut self, draws: u64) {
        while self.rng.draws < draws {
            self.rng.next_u64();
        }
    }

    /// A uniform draw on (0, 1]. The open lower bound keeps `ln` finite in
    /// the inversion samplers.
    pub fn uniform(&mut self) -> f64 {
        1.0 - self.rng.random::<f64>()
    }

    /// One Bernoulli trial with success probability `p`.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.rng.random::<f64>() < p
    }

    /// Samples a waiting time from an exponential distribution with the
    /// given total rate. A non-positive rate means the event never fires.
    pub fn exponential_timer(&mut self, rate: f64) -> f64 {
        if rate <= 0.0 {
            return f64::INFINITY;
        }
        -self.uniform().ln() / rate
    }

    /// Samples a duration from a Gaussian with the given mean and standard
    /// deviation, truncated below at zero.
    pub fn gaussian_duration(&mut self, mean: f64, std_dev: f64) -> f64 {
        if std_dev <= 0.0 {
            return mean.max(0.0);
        }
        let normal = Normal::new(mean, std_dev).expect("invalid Gaussian parameters");
        normal.sample(&mut self.rng).max(0.0)
    }

    /// Inversion sampling of the waiting time under a piecewise-linear
    /// hazard: `hazards[i]` applies on `[i * time_step, (i+1) * time_step)`
    /// with linear interpolation toward `hazards[i+1]`, and `extra_rate` is a
    /// constant competing rate added throughout. Beyond the last entry the
    /// hazard is held constant at `hazards.last() + extra_rate`.
    ///
    /// # Panics
    ///
    /// Panics if `hazards` is empty; an empty forward schedule is a
    /// configuration bug.
    pub fn piecewise_hazard_timer(
        &mut self,
        hazards: &[f64],
        time_step: f64,
        extra_rate: f64,
    ) -> f64 {
        assert!(
            !hazards.is_empty(),
            "piecewise hazard timer requires a non-empty hazard schedule"
        );
        let target = -self.uniform().ln();
        let mut cumulative = 0.0;
        for (i, window) in hazards.windows(2).enumerate() {
            let step_mass =
                window[0] * time_step + 0.5 * (window[1] - window[0]) * time_step + extra_rate * time_step;
            cumulative += step_mass;
            if cumulative > target {
                let local_rate = window[0] + 0.5 * (window[1] - window[0]) + extra_rate;
                #[allow(clippy::cast_precision_loss)]
                return (i + 1) as f64 * time_step - (cumulative - target) / local_rate;
            }
        }
        let tail_rate = extra_rate + hazards[hazards.len() - 1];
        #[allow(clippy::cast_precision_loss)]
        let elapsed = (hazards.len() - 1) as f64 * time_step;
        elapsed + (target - cumulative) / tail_rate
    }
}
