use anyhow::Result;
use image::RgbImage;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

use flux2_rs_common::Latent;

/// Draw a standard-normal noise latent of the given shape.
///
/// The same seed always produces the same buffer; generation is a pure
/// function of the seed and the shape. The pipeline is strictly batch-1, so
/// the latent is unbatched.
pub fn init_noise(channels: usize, height: usize, width: usize, seed: u64) -> Result<Latent> {
    anyhow::ensure!(
        channels > 0 && height > 0 && width > 0,
        "noise latent shape {channels}x{height}x{width} has an empty dimension"
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..channels * height * width)
        .map(|_| rng.sample(StandardNormal))
        .collect();
    Latent::from_vec(channels, height, width, data)
}

/// Convert an image to a CHW float tensor with values in [-1, 1].
pub fn image_to_tensor(image: &RgbImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let plane = (width * height) as usize;
    let mut tensor = vec![0f32; 3 * plane];
    for (i, pixel) in image.pixels().enumerate() {
        for (c, value) in pixel.0.iter().enumerate() {
            tensor[c * plane + i] = *value as f32 / 127.5 - 1.0;
        }
    }
    tensor
}
