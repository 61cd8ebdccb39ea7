// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_core::GpndError;

/// Maps flattened pixel buffers to latent codes.
///
/// Batches are packed contiguously: `pixels.len()` must be a multiple of
/// `input_size()`, and the output holds `latent_size()` values per sample
/// in the same order.
pub trait Encoder {
    fn input_size(&self) -> usize;
    fn latent_size(&self) -> usize;
    fn encode_batch(&self, pixels: &[f32]) -> Result<Vec<f32>, GpndError>;
}

/// Maps latent codes back to flattened pixel buffers.
///
/// The scoring hot path calls this once per latent dimension per batch,
/// so implementations should stay allocation-light per call.
pub trait Generator {
    fn latent_size(&self) -> usize;
    fn output_size(&self) -> usize;
    fn generate_batch(&self, latents: &[f32]) -> Result<Vec<f32>, GpndError>;
}

pub(crate) fn batch_count(
    buffer_len: usize,
    sample_width: usize,
    what: &str,
) -> Result<usize, GpndError> {
    if sample_width == 0 {
        return Err(GpndError::invalid_input(format!(
            "{what} has zero sample width"
        )));
    }
    if buffer_len % sample_width != 0 {
        return Err(GpndError::invalid_input(format!(
            "{what} buffer length {buffer_len} is not a multiple of sample width {sample_width}"
        )));
    }
    Ok(buffer_len / sample_width)
}
