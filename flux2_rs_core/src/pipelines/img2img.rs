//! The image-to-image generation driver.

use std::time::{SystemTime, UNIX_EPOCH};

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::warn;

use flux2_rs_common::{Latent, LATENT_CHANNELS};

use crate::models::{GenerationContext, SampleRequest, REFERENCE_TOKEN_OFFSET};

use super::dims::normalize_dims;
use super::memory::{fit_refs_for_attention, MAX_TEXT_SEQ_LEN};
use super::sampling::{image_to_tensor, init_noise};
use super::{GenerateError, GenerationParams};

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl GenerationContext {
    /// Generate an image conditioned on a reference image and a pre-computed
    /// text embedding.
    ///
    /// This mirrors the prompt-based image-to-image entry point but skips
    /// tokenization and text encoding, letting callers reuse embeddings
    /// across repeated generations. Only guidance-distilled models are
    /// supported; there is no CFG path here.
    ///
    /// The call is atomic: it returns a finished image or exactly one
    /// [`GenerateError`], with every intermediate buffer released on the way
    /// out.
    pub fn img2img_with_embeddings(
        &self,
        text_embedding: &[f32],
        text_seq_len: usize,
        input: &RgbImage,
        params: &GenerationParams,
    ) -> Result<RgbImage, GenerateError> {
        if text_embedding.is_empty() {
            return Err(GenerateError::InvalidArgument("text embedding is empty"));
        }
        if text_seq_len == 0 {
            return Err(GenerateError::InvalidArgument(
                "text sequence length must be positive",
            ));
        }
        if text_embedding.len() != text_seq_len * self.metadata.text_dim {
            return Err(GenerateError::InvalidArgument(
                "text embedding length does not match text_seq_len * text_dim",
            ));
        }
        if input.width() == 0 || input.height() == 0 {
            return Err(GenerateError::InvalidArgument("input image is empty"));
        }
        if !self.metadata.distilled {
            warn!(
                model = %self.metadata.model_name,
                "img2img_with_embeddings does not support CFG; use the prompt-based entry point for base models"
            );
            return Err(GenerateError::GuidanceNotSupported {
                model: self.metadata.model_name.clone(),
            });
        }

        let (out_w, out_h) = normalize_dims(
            params.width,
            params.height,
            input.dimensions(),
            self.metadata.max_dim,
        );

        // The reference starts at the output size and only shrinks if the
        // combined attention buffer would blow the GPU allocation limit.
        let (mut ref_h, mut ref_w) = (out_h, out_w);
        let mut ref_dims = [(out_h, out_w)];
        if fit_refs_for_attention(
            self.metadata.num_heads,
            (out_h, out_w),
            &mut ref_dims,
            MAX_TEXT_SEQ_LEN,
        ) {
            warn!(
                "reference image resized from {}x{} to {}x{} (GPU attention memory limit)",
                out_w, out_h, ref_dims[0].1, ref_dims[0].0
            );
            (ref_h, ref_w) = ref_dims[0];
        }

        let resized;
        let reference_image = if input.dimensions() != (ref_w, ref_h) {
            resized = imageops::resize(input, ref_w, ref_h, FilterType::CatmullRom);
            &resized
        } else {
            input
        };

        let num_steps = params
            .num_steps
            .filter(|steps| *steps > 0)
            .unwrap_or(self.metadata.default_steps);

        // The embedding is already in hand, so the text encoder is dead
        // weight from here on; free it before the transformer comes in.
        self.release_text_encoder();
        let transformer = self
            .ensure_transformer()
            .map_err(GenerateError::TransformerLoad)?;

        self.observer.phase("encoding reference image", false);
        let tensor = image_to_tensor(reference_image);
        let encoded = match &self.vae {
            Some(vae) => vae.encode(&tensor, 1, ref_h, ref_w),
            // No codec: condition on an all-zero latent of the expected
            // shape instead of failing.
            None => Ok(Latent::zeros(
                LATENT_CHANNELS,
                (ref_h / 16) as usize,
                (ref_w / 16) as usize,
            )),
        };
        drop(tensor);
        self.observer.phase("encoding reference image", true);
        let reference = encoded.map_err(GenerateError::Encode)?;

        let out_lat_h = (out_h / 16) as usize;
        let out_lat_w = (out_w / 16) as usize;
        let image_seq_len = out_lat_h * out_lat_w;

        let schedule = params
            .schedule
            .build(num_steps, image_seq_len)
            .map_err(GenerateError::Schedule)?;

        let seed = params.seed.unwrap_or_else(time_seed);
        let noise = init_noise(LATENT_CHANNELS, out_lat_h, out_lat_w, seed)
            .map_err(GenerateError::NoiseInit)?;

        let sampled = transformer.sample(
            self.text_encoder.as_deref(),
            SampleRequest {
                noise: &noise,
                batch: 1,
                reference: &reference,
                reference_offset: REFERENCE_TOKEN_OFFSET,
                text_embedding,
                text_seq_len,
                schedule: &schedule,
                progress: self.progress.as_deref(),
            },
        );
        drop(noise);
        drop(reference);
        drop(schedule);
        let latent = sampled.map_err(GenerateError::Sample)?;

        let vae = self.vae.as_ref().ok_or(GenerateError::NoCodec)?;
        self.observer.phase("decoding image", false);
        let decoded = vae.decode(&latent, 1);
        self.observer.phase("decoding image", true);
        decoded.map_err(GenerateError::Decode)
    }
}
