//! Trait seams for the external model services the pipeline drives.
//!
//! Weight formats, the transformer forward pass, the VAE internals and the
//! numerical integrator all live behind these traits; the pipeline treats
//! them as correct, opaque collaborators.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use flux2_rs_common::{Latent, Schedule};
use image::RgbImage;

mod context;

pub use context::{GenerationContext, GenerationContextBuilder, ModelMetadata};

/// Positional offset assigned to reference tokens.
///
/// Reference latent tokens enter the transformer's positional scheme at a
/// fixed temporal offset from the primary sequence so the model can tell
/// conditioning tokens from the tokens it is generating.
pub const REFERENCE_TOKEN_OFFSET: usize = 10;

/// How transformer weights are brought into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightLoadMode {
    /// Memory-map the weight files and page them in on demand.
    Mmap,
    /// Read the weight files fully into memory up front.
    Full,
}

/// Loads transformer weights from a model directory.
pub trait TransformerLoader: Send + Sync {
    fn load(&self, model_dir: &Path, mode: WeightLoadMode) -> Result<Arc<dyn DiffusionTransformer>>;
}

/// One denoising run handed to the transformer backend.
pub struct SampleRequest<'a> {
    /// Starting noise; its shape is the output latent shape.
    pub noise: &'a Latent,
    pub batch: usize,
    /// Encoded reference image used as conditioning.
    pub reference: &'a Latent,
    /// Positional offset of the reference tokens, see [`REFERENCE_TOKEN_OFFSET`].
    pub reference_offset: usize,
    /// Pre-computed text embedding, `text_seq_len * text_dim` values.
    pub text_embedding: &'a [f32],
    pub text_seq_len: usize,
    pub schedule: &'a Schedule,
    /// Invoked synchronously as `(step, total)` from inside the denoise loop.
    pub progress: Option<&'a (dyn Fn(usize, usize) + Send + Sync)>,
}

/// A loaded diffusion transformer.
pub trait DiffusionTransformer: Send + Sync {
    /// Run the scheduled denoising loop and return the sampled latent.
    fn sample(
        &self,
        text_encoder: Option<&dyn TextEncoder>,
        request: SampleRequest<'_>,
    ) -> Result<Latent>;
}

/// Handle to the text-encoder component.
///
/// Embeddings are computed by the caller before generation starts; during
/// generation the encoder is only carried as an opaque sampler argument.
pub trait TextEncoder: Send + Sync {
    /// Free cached encoder state. Idempotent; the handle itself stays valid.
    fn release(&self);
}

/// The variational codec translating between pixel and latent space.
pub trait VaeCodec: Send + Sync {
    /// Encode a CHW float tensor of the given pixel dimensions.
    fn encode(&self, tensor: &[f32], batch: usize, height: u32, width: u32) -> Result<Latent>;

    /// Decode a sampled latent back to pixels.
    fn decode(&self, latent: &Latent, batch: usize) -> Result<RgbImage>;
}
