/// An ordered sequence of noise-level control values.
///
/// Holds `num_steps + 1` boundary values; the denoising loop consumes them
/// pairwise, one window per step.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    values: Vec<f32>,
}

impl Schedule {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn num_steps(&self) -> usize {
        self.values.len().saturating_sub(1)
    }
}
