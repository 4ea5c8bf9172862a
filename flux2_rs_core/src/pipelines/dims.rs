/// Resolve the target output dimensions for a request.
///
/// Unset dimensions fall back to the input image. If either edge exceeds
/// `max_dim`, both are scaled down uniformly so the larger edge lands on
/// `max_dim`. Both results are then truncated to the next lower multiple
/// of 16, the latent patch size.
pub(crate) fn normalize_dims(
    width: Option<u32>,
    height: Option<u32>,
    input: (u32, u32),
    max_dim: u32,
) -> (u32, u32) {
    let mut width = width.filter(|w| *w > 0).unwrap_or(input.0);
    let mut height = height.filter(|h| *h > 0).unwrap_or(input.1);

    if width > max_dim || height > max_dim {
        let scale = max_dim as f32 / width.max(height) as f32;
        width = (width as f32 * scale) as u32;
        height = (height as f32 * scale) as u32;
    }

    (width / 16 * 16, height / 16 * 16)
}
