// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;

use gpnd_core::{GpndError, StableRng};

use crate::model::Generator;

/// Grid dimension for the qualitative sample sheet, 8x8 tiles.
pub const GRID_DIM: usize = 8;

/// Renders a grid of generator samples from standard-normal latent draws.
///
/// Returns the grayscale pixel buffer plus `(width, height)`. Generator
/// outputs are clamped to `[0, 1]` before quantization, so saturated
/// activations render as pure black or white rather than wrapping.
pub fn render_sample_grid(
    generator: &dyn Generator,
    rng: &mut StableRng,
    image_size: usize,
) -> Result<(Vec<u8>, usize, usize), GpndError> {
    if image_size == 0 {
        return Err(GpndError::invalid_input("sample grid requires image_size >= 1"));
    }
    let pixel_count = image_size * image_size;
    if generator.output_size() != pixel_count {
        return Err(GpndError::invalid_input(format!(
            "generator output size {} does not match {}x{} tiles",
            generator.output_size(),
            image_size,
            image_size
        )));
    }

    let tile_count = GRID_DIM * GRID_DIM;
    let latent_size = generator.latent_size();
    let mut latents = Vec::with_capacity(tile_count * latent_size);
    for _ in 0..tile_count * latent_size {
        latents.push(rng.next_standard_normal() as f32);
    }
    let tiles = generator.generate_batch(latents.as_slice())?;

    let side = GRID_DIM * image_size;
    let mut canvas = vec![0u8; side * side];
    for (tile_idx, tile) in tiles.chunks_exact(pixel_count).enumerate() {
        let tile_row = tile_idx / GRID_DIM;
        let tile_col = tile_idx % GRID_DIM;
        for y in 0..image_size {
            for x in 0..image_size {
                let value = tile[y * image_size + x].clamp(0.0, 1.0);
                let canvas_y = tile_row * image_size + y;
                let canvas_x = tile_col * image_size + x;
                canvas[canvas_y * side + canvas_x] = (value * 255.0).round() as u8;
            }
        }
    }

    Ok((canvas, side, side))
}

/// Writes the sample grid as a binary PGM (P5) image.
pub fn write_sample_grid_pgm(
    path: &Path,
    generator: &dyn Generator,
    rng: &mut StableRng,
    image_size: usize,
) -> Result<(), GpndError> {
    let (pixels, width, height) = render_sample_grid(generator, rng, image_size)?;

    let mut bytes = format!("P5\n{width} {height}\n255\n").into_bytes();
    bytes.extend_from_slice(pixels.as_slice());
    fs::write(path, bytes)
        .map_err(|source| GpndError::io(format!("failed to write '{}'", path.display()), source))
}
