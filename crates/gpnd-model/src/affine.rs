// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_core::GpndError;

use crate::model::{Encoder, Generator, batch_count};

/// Dense affine map `y = W x + b` with `W` stored row-major.
///
/// Checkpoints store `W` and `b` together as an `(output, input + 1)`
/// matrix whose last column is the bias.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineMap {
    weights: Vec<f32>,
    bias: Vec<f32>,
    input_size: usize,
    output_size: usize,
}

impl AffineMap {
    pub fn new(
        weights: Vec<f32>,
        bias: Vec<f32>,
        input_size: usize,
        output_size: usize,
    ) -> Result<Self, GpndError> {
        if input_size == 0 || output_size == 0 {
            return Err(GpndError::invalid_input(
                "affine map requires non-zero input and output sizes",
            ));
        }
        if weights.len() != input_size * output_size {
            return Err(GpndError::invalid_input(format!(
                "affine weight length {} does not match {}x{}",
                weights.len(),
                output_size,
                input_size
            )));
        }
        if bias.len() != output_size {
            return Err(GpndError::invalid_input(format!(
                "affine bias length {} does not match output size {}",
                bias.len(),
                output_size
            )));
        }
        for (idx, value) in weights.iter().chain(bias.iter()).enumerate() {
            if !value.is_finite() {
                return Err(GpndError::invalid_input(format!(
                    "affine parameters must be finite; parameter {idx} is {value}"
                )));
            }
        }
        Ok(Self {
            weights,
            bias,
            input_size,
            output_size,
        })
    }

    /// Splits an `(output, input + 1)` augmented matrix into weights and bias.
    pub fn from_augmented(
        augmented: &[f32],
        input_size: usize,
        output_size: usize,
    ) -> Result<Self, GpndError> {
        let stride = input_size + 1;
        if augmented.len() != output_size * stride {
            return Err(GpndError::invalid_input(format!(
                "augmented matrix length {} does not match {}x{}",
                augmented.len(),
                output_size,
                stride
            )));
        }
        let mut weights = Vec::with_capacity(input_size * output_size);
        let mut bias = Vec::with_capacity(output_size);
        for row in augmented.chunks_exact(stride) {
            weights.extend_from_slice(&row[..input_size]);
            bias.push(row[input_size]);
        }
        Self::new(weights, bias, input_size, output_size)
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    fn apply_batch(&self, inputs: &[f32], what: &str) -> Result<Vec<f32>, GpndError> {
        let count = batch_count(inputs.len(), self.input_size, what)?;
        let mut outputs = vec![0.0f32; count * self.output_size];
        for (sample_idx, sample) in inputs.chunks_exact(self.input_size).enumerate() {
            let out = &mut outputs
                [sample_idx * self.output_size..(sample_idx + 1) * self.output_size];
            for (row_idx, row) in self.weights.chunks_exact(self.input_size).enumerate() {
                let mut acc = self.bias[row_idx];
                for (w, x) in row.iter().zip(sample.iter()) {
                    acc += w * x;
                }
                out[row_idx] = acc;
            }
        }
        Ok(outputs)
    }
}

/// Affine encoder: pixels in, latent codes out.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineEncoder {
    map: AffineMap,
}

impl AffineEncoder {
    pub fn new(map: AffineMap) -> Self {
        Self { map }
    }
}

impl Encoder for AffineEncoder {
    fn input_size(&self) -> usize {
        self.map.input_size()
    }

    fn latent_size(&self) -> usize {
        self.map.output_size()
    }

    fn encode_batch(&self, pixels: &[f32]) -> Result<Vec<f32>, GpndError> {
        self.map.apply_batch(pixels, "encoder input")
    }
}

/// Affine generator: latent codes in, pixels out.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineGenerator {
    map: AffineMap,
}

impl AffineGenerator {
    pub fn new(map: AffineMap) -> Self {
        Self { map }
    }
}

impl Generator for AffineGenerator {
    fn latent_size(&self) -> usize {
        self.map.input_size()
    }

    fn output_size(&self) -> usize {
        self.map.output_size()
    }

    fn generate_batch(&self, latents: &[f32]) -> Result<Vec<f32>, GpndError> {
        self.map.apply_batch(latents, "generator input")
    }
}

#[cfg(test)]
mod tests {
    use super::{AffineEncoder, AffineGenerator, AffineMap};
    use crate::model::{Encoder, Generator};

    fn identity_map(size: usize) -> AffineMap {
        let mut weights = vec![0.0f32; size * size];
        for i in 0..size {
            weights[i * size + i] = 1.0;
        }
        AffineMap::new(weights, vec![0.0; size], size, size).expect("identity map is valid")
    }

    #[test]
    fn applies_weights_and_bias_per_sample() {
        // 2x3 map: y0 = x0 + 2*x1 + 3*x2 + 10, y1 = -x0 + 0.5*x2 - 1.
        let map = AffineMap::new(
            vec![1.0, 2.0, 3.0, -1.0, 0.0, 0.5],
            vec![10.0, -1.0],
            3,
            2,
        )
        .expect("map is valid");
        let encoder = AffineEncoder::new(map);

        let out = encoder
            .encode_batch(&[1.0, 1.0, 1.0, 0.0, 2.0, 4.0])
            .expect("encode should succeed");
        assert_eq!(out, vec![16.0, -1.5, 26.0, 1.0]);
    }

    #[test]
    fn identity_generator_round_trips_latents() {
        let generator = AffineGenerator::new(identity_map(4));
        let latents = vec![0.5f32, -1.0, 2.0, 0.0, 1.0, 1.0, -3.0, 4.0];
        let out = generator
            .generate_batch(&latents)
            .expect("generate should succeed");
        assert_eq!(out, latents);
        assert_eq!(generator.latent_size(), 4);
        assert_eq!(generator.output_size(), 4);
    }

    #[test]
    fn from_augmented_splits_trailing_bias_column() {
        // (2, 2+1): rows [w00 w01 b0], [w10 w11 b1].
        let map = AffineMap::from_augmented(&[1.0, 2.0, 5.0, 3.0, 4.0, 6.0], 2, 2)
            .expect("augmented split should succeed");
        let encoder = AffineEncoder::new(map);
        let out = encoder.encode_batch(&[1.0, 1.0]).expect("encode");
        assert_eq!(out, vec![8.0, 13.0]);
    }

    #[test]
    fn rejects_misaligned_batch_buffers() {
        let encoder = AffineEncoder::new(identity_map(3));
        assert!(encoder.encode_batch(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn rejects_shape_mismatches_and_non_finite_parameters() {
        assert!(AffineMap::new(vec![1.0; 5], vec![0.0; 2], 3, 2).is_err());
        assert!(AffineMap::new(vec![1.0; 6], vec![0.0; 3], 3, 2).is_err());
        assert!(AffineMap::new(vec![f32::NAN; 6], vec![0.0; 2], 3, 2).is_err());
        assert!(AffineMap::from_augmented(&[1.0; 5], 2, 2).is_err());
    }
}
