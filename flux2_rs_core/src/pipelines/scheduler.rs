use anyhow::Result;
use serde::{Deserialize, Serialize};

use flux2_rs_common::Schedule;

const BASE_IMAGE_SEQ_LEN: usize = 256;
const MAX_IMAGE_SEQ_LEN: usize = 4096;
const BASE_SHIFT: f64 = 0.5;
const MAX_SHIFT: f64 = 1.15;

/// Which noise schedule the denoising loop follows. Exactly one variant is
/// ever in effect for a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// The model's official schedule: a linear ramp time-shifted by an
    /// amount interpolated from the output image's token count.
    Official,
    /// A plain linear ramp from 1 to 0.
    Linear,
    /// The linear ramp raised to `alpha`, concentrating steps near the end
    /// (`alpha > 1`) or the start (`alpha < 1`) of the trajectory.
    Power { alpha: f32 },
}

impl Default for ScheduleKind {
    fn default() -> Self {
        Self::Official
    }
}

fn time_shift(mu: f64, sigma: f64, t: f64) -> f64 {
    let e = mu.exp();
    e / (e + (1. / t - 1.).powf(sigma))
}

/// Interpolate the time-shift exponent from the output token count.
fn calculate_shift(image_seq_len: usize) -> f64 {
    let m = (MAX_SHIFT - BASE_SHIFT) / (MAX_IMAGE_SEQ_LEN - BASE_IMAGE_SEQ_LEN) as f64;
    let b = BASE_SHIFT - m * BASE_IMAGE_SEQ_LEN as f64;
    image_seq_len as f64 * m + b
}

impl ScheduleKind {
    /// Build the schedule: `num_steps + 1` boundary values from 1 down to 0.
    ///
    /// `image_seq_len` (the output latent area) only affects the official
    /// variant. Pure function of its inputs.
    pub fn build(&self, num_steps: usize, image_seq_len: usize) -> Result<Schedule> {
        anyhow::ensure!(num_steps > 0, "schedule needs at least one step");

        let ramp = (0..=num_steps)
            .map(|v| v as f64 / num_steps as f64)
            .rev();
        let values: Vec<f64> = match self {
            Self::Linear => ramp.collect(),
            Self::Power { alpha } => {
                anyhow::ensure!(*alpha > 0.0, "power schedule alpha must be positive");
                ramp.map(|t| t.powf(*alpha as f64)).collect()
            }
            Self::Official => {
                let mu = calculate_shift(image_seq_len);
                ramp.map(|t| time_shift(mu, 1.0, t)).collect()
            }
        };

        Ok(Schedule::new(values.into_iter().map(|v| v as f32).collect()))
    }
}
