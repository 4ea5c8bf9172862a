use anyhow::Result;

/// Channel count of the packed latent space.
///
/// The VAE produces 16 channels at 1/8 spatial resolution; the transformer
/// consumes 2x2 patches of that, so one latent "pixel" covers a 16x16 pixel
/// region of the image and carries 16 * 2 * 2 = 64 channels.
pub const LATENT_CHANNELS: usize = 64;

/// A flattened latent tensor in the reduced (1/16) spatial resolution.
///
/// The buffer is self-describing: the channel count and spatial dimensions
/// travel with the data, so producers and consumers never exchange bare
/// float pointers plus side-channel shape arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Latent {
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl Latent {
    /// A zero-filled latent of the given shape.
    pub fn zeros(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
            data: vec![0f32; channels * height * width],
        }
    }

    /// Wrap an existing buffer, checking that its length matches the shape.
    pub fn from_vec(channels: usize, height: usize, width: usize, data: Vec<f32>) -> Result<Self> {
        anyhow::ensure!(
            data.len() == channels * height * width,
            "latent buffer holds {} values, shape {}x{}x{} needs {}",
            data.len(),
            channels,
            height,
            width,
            channels * height * width
        );
        Ok(Self {
            channels,
            height,
            width,
            data,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Height in latent pixels (image height / 16).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width in latent pixels (image width / 16).
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}
