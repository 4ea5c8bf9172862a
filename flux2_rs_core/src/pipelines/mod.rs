mod dims;
mod img2img;
mod memory;
mod sampling;
mod scheduler;

use serde::{Deserialize, Serialize};

pub use memory::MAX_TEXT_SEQ_LEN;
pub use sampling::{image_to_tensor, init_noise};
pub use scheduler::ScheduleKind;

/// Generation parameters for a single request.
///
/// Every field has a "derive it for me" state, so `Default` describes a
/// request that follows the input image and the context's model defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Target width in pixels; `None` derives it from the input image.
    #[serde(default)]
    pub width: Option<u32>,
    /// Target height in pixels; `None` derives it from the input image.
    #[serde(default)]
    pub height: Option<u32>,
    /// The number of denoising steps. More steps usually lead to a higher
    /// quality image at the expense of slower inference; `None` uses the
    /// model's default.
    #[serde(default)]
    pub num_steps: Option<usize>,
    /// Noise seed; `None` derives one from the current time.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub schedule: ScheduleKind,
}

/// Why a generation call produced no image.
///
/// Every failure is terminal for the call: nothing is retried, buffers
/// allocated along the way are dropped, and the caller sees exactly one of
/// these or a finished image.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("model `{model}` is not guidance-distilled; the embeddings path has no CFG support")]
    GuidanceNotSupported { model: String },
    #[error("failed to load transformer weights: {0}")]
    TransformerLoad(anyhow::Error),
    #[error("failed to encode the reference image: {0}")]
    Encode(anyhow::Error),
    #[error("failed to build the noise schedule: {0}")]
    Schedule(anyhow::Error),
    #[error("failed to initialize the noise latent: {0}")]
    NoiseInit(anyhow::Error),
    #[error("denoising failed: {0}")]
    Sample(anyhow::Error),
    #[error("no VAE codec is configured; the sampled latent cannot be decoded")]
    NoCodec,
    #[error("failed to decode the sampled latent: {0}")]
    Decode(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_default_derives_everything() {
        let params = GenerationParams::default();
        assert!(params.width.is_none());
        assert!(params.height.is_none());
        assert!(params.num_steps.is_none());
        assert!(params.seed.is_none());
        assert_eq!(params.schedule, ScheduleKind::Official);
    }

    #[test]
    fn params_deserialize_from_partial_json() {
        let params: GenerationParams =
            serde_json::from_str(r#"{"width": 1024, "seed": 7, "schedule": {"power": {"alpha": 1.5}}}"#)
                .unwrap();
        assert_eq!(params.width, Some(1024));
        assert!(params.height.is_none());
        assert_eq!(params.seed, Some(7));
        assert_eq!(params.schedule, ScheduleKind::Power { alpha: 1.5 });
    }

    #[test]
    fn params_round_trip() {
        let params = GenerationParams {
            width: Some(768),
            height: Some(512),
            num_steps: Some(8),
            seed: Some(42),
            schedule: ScheduleKind::Linear,
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: GenerationParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.width, Some(768));
        assert_eq!(back.schedule, ScheduleKind::Linear);
    }
}
