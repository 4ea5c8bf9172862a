//! Image-to-image inference core for distilled FLUX.2 models.
//!
//! The entry point is [`GenerationContext::img2img_with_embeddings`]: given
//! a pre-computed text embedding and a reference image, it normalizes the
//! requested output size, fits the reference under the GPU attention memory
//! budget, and drives encode, noise initialization, scheduled denoising and
//! decoding through the backend trait seams ([`TransformerLoader`],
//! [`DiffusionTransformer`], [`VaeCodec`]).
//!
//! Model weights, the transformer forward pass and the VAE internals live
//! behind those traits; this crate owns the orchestration, the memory
//! fitting and the schedule/noise math.
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use flux2_rs_core::{GenerationContext, GenerationParams, ModelMetadata, ScheduleKind};
//!
//! let context = GenerationContext::builder(ModelMetadata::default(), backend.loader())
//!     .with_text_encoder(backend.text_encoder())
//!     .with_vae(backend.vae())
//!     .build();
//!
//! let image = context.img2img_with_embeddings(
//!     &embedding,
//!     embedding_len,
//!     &reference,
//!     &GenerationParams {
//!         seed: Some(42),
//!         schedule: ScheduleKind::Official,
//!         ..Default::default()
//!     },
//! )?;
//! image.save("out.png")?;
//! ```

mod models;
mod pipelines;

pub use flux2_rs_common::{
    Latent, NoopPhaseObserver, PhaseObserver, Schedule, TracingPhaseObserver, LATENT_CHANNELS,
};
pub use models::{
    DiffusionTransformer, GenerationContext, GenerationContextBuilder, ModelMetadata,
    SampleRequest, TextEncoder, TransformerLoader, VaeCodec, WeightLoadMode,
    REFERENCE_TOKEN_OFFSET,
};
pub use pipelines::{
    image_to_tensor, init_noise, GenerateError, GenerationParams, ScheduleKind, MAX_TEXT_SEQ_LEN,
};
