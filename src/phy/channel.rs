use super::bpsk::{Signal, Symbol};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ChannelError {
    #[error("noise strength {0} must be finite and non-negative")]
    InvalidNoiseStrength(f64),
}

/// Phase noise followed by real-axis additive noise.
///
/// For each sample a phase `φ ~ N(0, σ)` rotates the sample by `e^{iφ}`, then
/// `η ~ N(0, σ)` is added to the real part. Both draws come from the model's
/// own generator, so a seeded model is reproducible.
#[derive(Debug)]
pub struct ChannelModel {
    rng: StdRng,
}

impl ChannelModel {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Return a new, impaired copy of `signal`. `noise_strength == 0` copies it unchanged.
    pub fn apply(&mut self, signal: &[Symbol], noise_strength: f64) -> Result<Signal, ChannelError> {
        if !noise_strength.is_finite() || noise_strength < 0.0 {
            return Err(ChannelError::InvalidNoiseStrength(noise_strength));
        }
        if noise_strength == 0.0 {
            return Ok(signal.to_vec());
        }

        let noise = Normal::new(0.0, noise_strength).map_err(|_| ChannelError::InvalidNoiseStrength(noise_strength))?;

        Ok(signal
            .iter()
            .map(|&sample| {
                let phase = noise.sample(&mut self.rng);
                let rotated = sample * Complex64::from_polar(1.0, phase);
                let additive = noise.sample(&mut self.rng);
                Complex64::new(rotated.re + additive, rotated.im)
            })
            .collect())
    }
}
