use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::OnceCell;

use flux2_rs_common::{NoopPhaseObserver, PhaseObserver};

use super::{DiffusionTransformer, TextEncoder, TransformerLoader, VaeCodec, WeightLoadMode};

/// Fixed metadata describing the loaded model.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    pub model_name: String,
    pub model_version: String,
    /// Directory the transformer weights are loaded from.
    pub model_dir: PathBuf,
    /// Maximum supported edge length of a generated image, in pixels.
    pub max_dim: u32,
    pub default_steps: usize,
    pub default_guidance: f32,
    /// Guidance-distilled models need one conditioning pass per step and are
    /// the only kind this pipeline drives.
    pub distilled: bool,
    /// Dimensionality of one text-embedding vector.
    pub text_dim: usize,
    pub num_heads: usize,
    pub load_mode: WeightLoadMode,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            model_name: "FLUX.2-dev".to_string(),
            model_version: "2.0".to_string(),
            model_dir: PathBuf::new(),
            max_dim: 2048,
            default_steps: 28,
            default_guidance: 4.0,
            distilled: true,
            text_dim: 4096,
            num_heads: 24,
            load_mode: WeightLoadMode::Mmap,
        }
    }
}

/// Owns the model components used across generation calls.
///
/// The transformer is loaded lazily on first use and cached for the lifetime
/// of the context; concurrent first calls synchronize on the slot, so exactly
/// one of them performs the load and the rest observe the cached handle.
pub struct GenerationContext {
    pub(crate) metadata: ModelMetadata,
    pub(crate) loader: Arc<dyn TransformerLoader>,
    pub(crate) text_encoder: Option<Arc<dyn TextEncoder>>,
    pub(crate) vae: Option<Arc<dyn VaeCodec>>,
    pub(crate) observer: Arc<dyn PhaseObserver>,
    pub(crate) progress: Option<Arc<dyn Fn(usize, usize) + Send + Sync>>,
    transformer: OnceCell<Arc<dyn DiffusionTransformer>>,
}

impl GenerationContext {
    pub fn builder(
        metadata: ModelMetadata,
        loader: Arc<dyn TransformerLoader>,
    ) -> GenerationContextBuilder {
        GenerationContextBuilder {
            metadata,
            loader,
            text_encoder: None,
            vae: None,
            observer: Arc::new(NoopPhaseObserver),
            progress: None,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Load the transformer if it has not been loaded yet.
    ///
    /// The first caller pays for the load (phase-notified, since it can take
    /// a while); everyone afterwards gets the cached handle.
    pub fn ensure_transformer(&self) -> Result<Arc<dyn DiffusionTransformer>> {
        let transformer = self.transformer.get_or_try_init(|| {
            self.observer.phase("Loading FLUX.2 transformer", false);
            let loaded = self
                .loader
                .load(&self.metadata.model_dir, self.metadata.load_mode);
            self.observer.phase("Loading FLUX.2 transformer", true);
            loaded
        })?;
        Ok(transformer.clone())
    }

    /// Drop cached text-encoder state.
    ///
    /// The embedding is supplied by the caller, so the encoder is not needed
    /// while the transformer is resident; releasing it first bounds peak
    /// memory. Idempotent.
    pub fn release_text_encoder(&self) {
        if let Some(encoder) = &self.text_encoder {
            encoder.release();
        }
    }
}

pub struct GenerationContextBuilder {
    metadata: ModelMetadata,
    loader: Arc<dyn TransformerLoader>,
    text_encoder: Option<Arc<dyn TextEncoder>>,
    vae: Option<Arc<dyn VaeCodec>>,
    observer: Arc<dyn PhaseObserver>,
    progress: Option<Arc<dyn Fn(usize, usize) + Send + Sync>>,
}

impl GenerationContextBuilder {
    pub fn with_text_encoder(mut self, encoder: Arc<dyn TextEncoder>) -> Self {
        self.text_encoder = Some(encoder);
        self
    }

    pub fn with_vae(mut self, vae: Arc<dyn VaeCodec>) -> Self {
        self.vae = Some(vae);
        self
    }

    pub fn with_phase_observer(mut self, observer: Arc<dyn PhaseObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Install a progress callback forwarded into the denoise loop.
    pub fn with_sample_progress(
        mut self,
        progress: Arc<dyn Fn(usize, usize) + Send + Sync>,
    ) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn build(self) -> GenerationContext {
        GenerationContext {
            metadata: self.metadata,
            loader: self.loader,
            text_encoder: self.text_encoder,
            vae: self.vae,
            observer: self.observer,
            progress: self.progress,
            transformer: OnceCell::new(),
        }
    }
}
