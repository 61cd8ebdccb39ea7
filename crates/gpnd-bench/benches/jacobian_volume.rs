// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gpnd_model::{AffineGenerator, AffineMap, Generator};
use gpnd_score::batch_log_volumes;

const PIXELS: usize = 256;
const LATENT: usize = 16;
const BATCH: usize = 64;

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

fn lcg_unit(state: &mut u64) -> f32 {
    (lcg_next(state) >> 40) as f32 / (1u64 << 24) as f32
}

fn dense_generator(state: &mut u64) -> AffineGenerator {
    let weights: Vec<f32> = (0..PIXELS * LATENT)
        .map(|_| lcg_unit(state) * 0.2 - 0.1)
        .collect();
    let bias: Vec<f32> = (0..PIXELS).map(|_| lcg_unit(state) * 0.1).collect();
    AffineGenerator::new(
        AffineMap::new(weights, bias, LATENT, PIXELS).expect("benchmark map should be valid"),
    )
}

fn benchmark_jacobian(c: &mut Criterion) {
    let mut state = 0xfeed_f00d_dead_beef_u64;
    let generator = dense_generator(&mut state);

    let latents: Vec<f32> = (0..BATCH * LATENT)
        .map(|_| lcg_unit(&mut state) * 2.0 - 1.0)
        .collect();
    let baseline = generator
        .generate_batch(latents.as_slice())
        .expect("baseline pass should succeed");

    let mut group = c.benchmark_group("jacobian");
    group.bench_function("log_volume_b64_p256_l16", |b| {
        b.iter(|| {
            let volumes = batch_log_volumes(
                black_box(&generator),
                black_box(latents.as_slice()),
                black_box(baseline.as_slice()),
                black_box(1e-3),
            )
            .expect("log volumes should compute");
            black_box(volumes);
        })
    });
    group.finish();
}

criterion_group!(benches, benchmark_jacobian);
criterion_main!(benches);
